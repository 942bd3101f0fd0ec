#![no_main]

use libfuzzer_sys::fuzz_target;
use nbridge_caps::{Capability, LinkConfig};

fuzz_target!(|data: &[u8]| {
    let Some((&flags, rest)) = data.split_first() else {
        return;
    };
    let rest = if rest.len() > 64 * 1024 {
        &rest[..64 * 1024]
    } else {
        rest
    };

    let Ok(graph) = nbridge_reach::parse_call_graph(rest) else {
        return;
    };
    let config = LinkConfig {
        multithreading: flags & 1 != 0,
        virtual_threads: flags & 2 != 0,
        continuations: flags & 4 != 0,
        check_features: flags & 8 == 0,
    };

    let Ok(outcome) = nbridge_reach::check_features(&graph, &config) else {
        return;
    };
    assert_eq!(outcome.is_open(), outcome.hits.is_empty());
    for hit in &outcome.hits {
        assert_eq!(hit.capability_enabled, config.supports(hit.capability));
        let last = hit.trail.last().expect("trail ends at the marker");
        assert_eq!(Capability::from_marker(last), Some(hit.capability));
    }
    assert_eq!(outcome.to_report().ok, outcome.is_open());
});
