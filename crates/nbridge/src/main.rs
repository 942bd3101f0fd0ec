use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nbridge_caps::{resolve_link_config, Capability, LinkConfig, LinkConfigOverrides};
use nbridge_contracts::{DIAG_GRAPH_INVALID, NBRIDGE_FEATURES_REPORT_SCHEMA_VERSION};
use nbridge_reach::diagnostics::{Diagnostic, Location, Report, Stage};
use nbridge_reach::{check_features, parse_call_graph, GateOutcome, GraphError};

const LOG_ENV: &str = "NBRIDGE_LOG";

#[derive(Parser)]
#[command(name = "nbridge")]
#[command(about = "Unsupported-feature gate and link configuration tool.", long_about = None)]
struct Cli {
    /// Log at debug level unless NBRIDGE_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List unsupported-feature markers and whether the build provides them.
    Features {
        #[command(flatten)]
        link: LinkArgs,
        #[arg(long, value_enum)]
        capability: Option<Capability>,
    },
    /// Check a call graph for reachable unsupported-feature markers.
    Check {
        #[arg(long, value_name = "PATH")]
        graph: PathBuf,
        #[command(flatten)]
        link: LinkArgs,
        #[arg(long)]
        report_json: bool,
    },
    /// Print the resolved link configuration.
    Config {
        #[command(flatten)]
        link: LinkArgs,
    },
}

#[derive(Args)]
struct LinkArgs {
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    multithreading: Option<bool>,
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    virtual_threads: Option<bool>,
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    continuations: Option<bool>,
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    check_features: Option<bool>,
}

impl LinkArgs {
    fn resolve(&self) -> Result<LinkConfig> {
        let cli = LinkConfigOverrides {
            multithreading: self.multithreading,
            virtual_threads: self.virtual_threads,
            continuations: self.continuations,
            check_features: self.check_features,
        };
        resolve_link_config(self.config.as_deref(), &cli).context("resolve link config")
    }
}

#[derive(Debug, Serialize)]
struct FeaturesReport {
    schema_version: &'static str,
    config: LinkConfig,
    enabled: Vec<Capability>,
    features: Vec<FeatureRow>,
}

#[derive(Debug, Serialize)]
struct FeatureRow {
    name: Capability,
    description: &'static str,
    symbol: &'static str,
    rust_path: &'static str,
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct CheckToolReport<'a> {
    command: &'static str,
    r#in: String,
    diagnostics_count: usize,
    exit_code: u8,
    #[serde(flatten)]
    report: &'a Report,
}

fn main() -> ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Features { link, capability } => {
            let config = link.resolve()?;
            let features = Capability::ALL
                .into_iter()
                .filter(|c| capability.map_or(true, |want| want == *c))
                .map(|c| FeatureRow {
                    name: c,
                    description: c.describe(),
                    symbol: c.marker_symbol(),
                    rust_path: c.marker_path(),
                    enabled: config.supports(c),
                })
                .collect();
            print_json(&FeaturesReport {
                schema_version: NBRIDGE_FEATURES_REPORT_SCHEMA_VERSION,
                config,
                enabled: config.enabled(),
                features,
            })?;
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Check {
            graph,
            link,
            report_json,
        } => cmd_check(&graph, &link, report_json),
        Cmd::Config { link } => {
            print_json(&link.resolve()?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn cmd_check(path: &Path, link: &LinkArgs, report_json: bool) -> Result<ExitCode> {
    let config = link.resolve()?;
    tracing::debug!(graph = %path.display(), check_features = config.check_features, "check");
    let bytes =
        std::fs::read(path).with_context(|| format!("read call graph: {}", path.display()))?;

    let outcome = match parse_call_graph(&bytes).and_then(|g| check_features(&g, &config)) {
        Ok(outcome) => outcome,
        Err(err) => {
            if report_json {
                let report = Report::ok().with_diagnostics(vec![graph_diagnostic(path, &err)]);
                print_check_report(path, &report, 2)?;
                return Ok(ExitCode::from(2));
            }
            return Err(err).with_context(|| format!("call graph: {}", path.display()));
        }
    };

    let exit_code = if outcome.is_open() { 0 } else { 1 };
    if report_json {
        print_check_report(path, &outcome.to_report(), exit_code)?;
    } else {
        print_outcome(&outcome);
    }
    Ok(ExitCode::from(exit_code))
}

fn graph_diagnostic(path: &Path, err: &GraphError) -> Diagnostic {
    let mut d = Diagnostic::error(DIAG_GRAPH_INVALID, Stage::Parse, err.to_string());
    d.loc = Some(Location::File {
        path: path.display().to_string(),
    });
    d
}

fn print_outcome(outcome: &GateOutcome) {
    for hit in &outcome.hits {
        eprintln!("error: {hit}");
    }
    if !outcome.checked {
        println!("gate open (feature checking disabled)");
    } else if outcome.is_open() {
        println!(
            "gate open ({} reachable functions)",
            outcome.reachable_functions
        );
    } else {
        println!(
            "gate closed ({} unsupported feature use(s))",
            outcome.hits.len()
        );
    }
}

fn print_check_report(path: &Path, report: &Report, exit_code: u8) -> Result<()> {
    print_json(&CheckToolReport {
        command: "check",
        r#in: path.display().to_string(),
        diagnostics_count: report.diagnostics.len(),
        exit_code,
        report,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .try_init();
}
