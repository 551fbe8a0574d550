//! Command-line entry point of sp8export
//!
//! Usage: `sp8export [-c sp8.cfg] [-o exported.jsonl] <input.csv>...`

#![warn(missing_docs)]

use clap::Parser;
use eyre::WrapErr;
use log::{info, warn};

use sp8export::{
    analysis::Analysis,
    config::Configuration,
    input, output, scheduling,
    units::{from_internal, Unit},
    Result,
};

use std::time::Instant;

/// Export momentum-analysed SP8 coincidence events
#[derive(Parser)]
#[command(name = "sp8export")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Raw event files (CSV), analysed in order
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<String>,

    /// Spectrometer and analysis configuration
    #[arg(short, long, value_name = "FILE", default_value = "sp8.cfg")]
    config: String,

    /// File where the analysed events are exported (JSON lines)
    #[arg(short, long, value_name = "FILE", default_value = "exported.jsonl")]
    output: String,

    /// Verbosity level (-v for debug output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// This will act as our main function, with suitable error handling
fn main() -> Result<()> {
    // ### COMMAND LINE ###

    let cli = Cli::parse();
    let log_level = match cli.verbose {
        0 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    // ### CONFIGURATION READOUT ###

    let cfg = Configuration::load(&cli.config).wrap_err("Failed to load the configuration")?;
    cfg.print();
    let analysis = Analysis::new(&cfg).wrap_err("Failed to set up the spectrometer model")?;

    // Tell the user where particles at rest are expected to land, which helps
    // checking the calibration and windows against the data
    let (ion_at_rest, electron_at_rest) = analysis.flight_times_at_rest()?;
    match ion_at_rest {
        Some(t) => info!("Reference ion at rest lands after {t:.1} ns"),
        None => warn!("Reference ion at rest never reaches the detector"),
    }
    match electron_at_rest {
        Some(t) => info!("Electron at rest lands after {t:.3} ns"),
        None => warn!("Electron at rest never reaches the detector"),
    }
    if let Some(period) = analysis.electron_arm().cyclotron_period() {
        info!("Electron cyclotron period: {:.3} ns", from_internal(period, Unit::Nanosecond)?);
    }

    // ### EVENT READOUT ###

    let mut events = Vec::new();
    for input_file in &cli.inputs {
        let file_events =
            input::read_events_file(input_file).wrap_err_with(|| format!("Failed to read {input_file}"))?;
        info!("Read {} events from {input_file}", file_events.len());
        events.extend(file_events);
    }

    // ### ANALYSIS ###

    // Start the clock after I/O, to avoid IO-induced timing fluctuations
    let saved_time = Instant::now();

    // Each batch of events is analysed independently, then merged in order
    let results = scheduling::run_analysis(&events, |batch| analysis.analyse_batch(batch));

    // Measure how much time has elapsed
    let elapsed_time = saved_time.elapsed();

    // ### RESULTS DISPLAY AND STORAGE ###

    let counters = &results.counters;
    if counters.failed_reconstructions() > 0 {
        warn!(
            "{} electron hits could not be reconstructed ({} out of domain, {} on an ambiguous branch, {} with an \
             ambiguous longitudinal momentum)",
            counters.failed_reconstructions(),
            counters.out_of_domain,
            counters.branch_ambiguous,
            counters.longitudinal_ambiguous
        );
    }
    output::dump_results(&cli.output, &results, elapsed_time).wrap_err("Failed to output the results")?;
    info!("Wrote {} events to {}", results.events.len(), cli.output);

    // ...and we're done
    Ok(())
}
