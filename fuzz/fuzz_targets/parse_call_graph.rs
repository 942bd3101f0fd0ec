#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 64 * 1024 {
        &data[..64 * 1024]
    } else {
        data
    };

    let Ok(graph) = nbridge_reach::parse_call_graph(data) else {
        return;
    };

    let bytes = serde_json::to_vec(&graph).expect("serialize parsed graph");
    let again = nbridge_reach::parse_call_graph(&bytes).expect("reparse serialized graph");
    assert_eq!(graph, again);
});
