//! This module is in charge of outputting the analysis results to disk and to
//! the standard output

use crate::{event::AnalyzedEvent, resfin::FinalResults, Result};

use eyre::WrapErr;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use std::{
    fs::File,
    io::{BufWriter, Write},
    time::Duration,
};

/// Write analysed events as JSON, one event per line
pub fn write_events(output: impl Write, events: &[AnalyzedEvent]) -> Result<()> {
    let mut output = BufWriter::new(output);
    for event in events {
        serde_json::to_writer(&mut output, event)?;
        output.write_all(b"\n")?;
    }
    output.flush()?;
    Ok(())
}

/// Output the analysis results to the console and to disk
///
/// Events go to `file_name`, and a run summary goes next to them in
/// `<file_name>.summary`.
///
pub fn dump_results(file_name: &str, results: &FinalResults, elapsed_time: Duration) -> Result<()> {
    let events_file = File::create(file_name).wrap_err_with(|| format!("Could not create {file_name}"))?;
    write_events(events_file, &results.events).wrap_err("Failed to write the analysed events")?;

    let summary_name = format!("{file_name}.summary");
    let summary_file = File::create(&summary_name).wrap_err_with(|| format!("Could not create {summary_name}"))?;
    let mut summary = BufWriter::new(summary_file);
    write_summary(&mut summary, results, elapsed_time)?;
    summary.flush()?;

    write_summary(&mut std::io::stdout().lock(), results, elapsed_time)?;
    Ok(())
}

/// Write a human-readable summary of the analysis run
pub fn write_summary(output: &mut impl Write, results: &FinalResults, elapsed_time: Duration) -> Result<()> {
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;
    writeln!(output, "Run ended {timestamp}")?;
    writeln!(output, "---------------------------------------------")?;
    for (label, value) in results.report() {
        writeln!(output, "{label:<36}: {value}")?;
    }
    let elapsed_secs = elapsed_time.as_secs_f64();
    writeln!(output, "{:<36}: {elapsed_secs:.3}", "Elapsed time (s)")?;
    if results.counters.events_read > 0 {
        let per_event = elapsed_secs / results.counters.events_read as f64;
        writeln!(output, "{:<36}: {per_event:.3e}", "Elapsed time per event (s)")?;
    }
    Ok(())
}
