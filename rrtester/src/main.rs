//! # Round-Robin Tester
//!
//! Main entry point: runs the configured workload and prints each unit's
//! completion.

use rrtester::{
    format_completion, format_summary, run_scenario, ClockKind, TesterConfig, TesterError,
};
use sched_core::RunOutcome;
use std::env;
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let config = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(&args[0]);
        process::exit(1);
    });

    let report = run_scenario(&config).unwrap_or_else(|e| {
        eprintln!("Run failed: {}", e);
        process::exit(1);
    });

    for completion in &report.completions {
        println!("{}", format_completion(completion));
    }
    println!("{}", format_summary(&report));

    if report.outcome != RunOutcome::Completed {
        process::exit(2);
    }
}

fn parse_args(args: &[String]) -> Result<TesterConfig, TesterError> {
    let mut config = TesterConfig::default();
    let mut clock = None;
    let mut quantum = None;
    let mut max_dispatches = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                let path = value_for(args, i, "--config")?;
                config = TesterConfig::load(Path::new(path))?;
            }
            "--clock" => {
                i += 1;
                clock = Some(match value_for(args, i, "--clock")? {
                    "sim" => ClockKind::Sim,
                    "host" => ClockKind::Host,
                    other => {
                        return Err(TesterError::Usage(format!("Invalid clock: {}", other)))
                    }
                });
            }
            "--quantum" | "-q" => {
                i += 1;
                let value = value_for(args, i, "--quantum")?;
                quantum = Some(value.parse::<u64>().map_err(|_| {
                    TesterError::Usage(format!("Invalid quantum value: {}", value))
                })?);
            }
            "--max-dispatches" => {
                i += 1;
                let value = value_for(args, i, "--max-dispatches")?;
                max_dispatches = Some(value.parse::<u64>().map_err(|_| {
                    TesterError::Usage(format!("Invalid max-dispatches value: {}", value))
                })?);
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                return Err(TesterError::Usage(format!("Unknown option: {}", other)));
            }
        }
        i += 1;
    }

    // Flags win over the config file regardless of their order
    if let Some(clock) = clock {
        config.clock = clock;
    }
    if let Some(quantum) = quantum {
        config.scheduler.quantum_ticks = quantum;
    }
    if let Some(max_dispatches) = max_dispatches {
        config.scheduler.max_dispatches = (max_dispatches > 0).then_some(max_dispatches);
    }
    config.validate()?;
    Ok(config)
}

fn value_for<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, TesterError> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| TesterError::Usage(format!("Missing value for {}", flag)))
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>       Workload and scheduler settings (JSON)");
    eprintln!("  --clock <CLOCK>           Clock source: sim (default) or host");
    eprintln!("  -q, --quantum <TICKS>     Ticks per quantum");
    eprintln!("  --max-dispatches <N>      Stop after N dispatches (0 = unlimited)");
    eprintln!("  -h, --help                Show this help message");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for scheduling decisions.");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {}", program);
    eprintln!("  {} --clock host --quantum 100000", program);
    eprintln!("  {} --config workload.json --max-dispatches 500", program);
}
