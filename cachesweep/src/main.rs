use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::time::Instant;
use clap::{Parser, Subcommand};
use log::info;
use cachemodel::config::LayeredCacheConfig;
use cachemodel::hierarchy::Hierarchy;
use cachemodel::storage::StorageLevel;
use crate::experiments::SweepConfig;
use crate::io::get_reader;
use crate::report::{write_rows, Format};
use crate::trace_file::TraceReader;

mod experiments;
mod io;
mod report;
mod trace_file;

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Set associative cache design space exploration"))]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs the experiment sweeps, writing one row per cache configuration
    Sweep {
        /// JSON sweep configuration, the built in baseline is used when omitted
        #[arg(short, long)]
        config: Option<String>,

        #[arg(short, long, default_value = "results.csv")]
        output: String,

        #[arg(short, long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },
    /// Replays a trace of hexadecimal addresses through a cache hierarchy
    Replay {
        config: String,
        trace: String,

        #[arg(short, long)]
        performance: bool,

        #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
        debug: bool,
    },
}

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    match args.command {
        Command::Sweep { config, output, format } => sweep(config, &output, format),
        Command::Replay { config, trace, performance, debug } => replay(&config, &trace, performance, debug),
    }
}

fn sweep(config_path: Option<String>, output: &str, format: Format) -> Result<(), String> {
    let config = match config_path {
        Some(path) => {
            let config_file = File::open(&path).map_err(|e| format!("Couldn't open the config file at path {path}: {e}"))?;
            serde_json::from_reader(BufReader::new(config_file)).map_err(|e| format!("Couldn't parse the config file: {e}"))?
        }
        None => SweepConfig::default(),
    };
    let rows = experiments::run_all(&config).map_err(|e| format!("Couldn't build a cache for the sweep: {e}"))?;
    let output_file = File::create(output).map_err(|e| format!("Couldn't create the output file at path {output}: {e}"))?;
    write_rows(&rows, format, BufWriter::new(output_file)).map_err(|e| format!("Couldn't write the results: {e}"))?;
    println!("Wrote {} rows to {output}", rows.len());
    Ok(())
}

fn replay(config_path: &str, trace_path: &str, performance: bool, debug: bool) -> Result<(), String> {
    let start = Instant::now();
    let config_file = File::open(config_path).map_err(|e| format!("Couldn't open the config file at path {config_path}: {e}"))?;
    let config: LayeredCacheConfig = serde_json::from_reader(BufReader::new(config_file)).map_err(|e| format!("Couldn't parse the config file: {e}"))?;
    let mut hierarchy = Hierarchy::from_config(&config).map_err(|e| e.to_string())?;
    let trace_file = File::open(trace_path).map_err(|e| format!("Couldn't open the trace file at path {trace_path}: {e}"))?;
    let trace = TraceReader::new(get_reader(trace_file)?).map_err(|e| e.to_string())?;

    let simulation_start = Instant::now();
    for address in trace {
        let _ = hierarchy.access(address.map_err(|e| e.to_string())?);
    }
    let simulation_time = simulation_start.elapsed();
    info!("Replayed {} accesses, AMAT {:.3} cycles", hierarchy.accesses(), hierarchy.amat());

    println!("{}", serde_json::to_string_pretty(&hierarchy.result()).map_err(|e| format!("Couldn't serialise the output {e}"))?);
    if performance {
        let total_time = start.elapsed();
        println!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        println!("Total execution time (includes initial parsing, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9)
    }
    if debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. If benchmarking, do not use this binary, re-compile with the --release argument when using cargo run");
        println!("Parsed input configuration: {config:?}");
        println!("Average access time: {:.3} cycles over {} accesses", hierarchy.amat(), hierarchy.accesses());
        let invalid_lines = hierarchy.invalid_line_counts();
        let formatted = hierarchy
            .caches()
            .map(|(name, _)| name)
            .zip(invalid_lines.iter())
            .map(|(name, count)| format!("{name}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Uninitialised cache lines by layer: ({formatted})");
        println!("Total uninitialised cache lines: {}", invalid_lines.iter().sum::<u64>())
    }
    Ok(())
}
