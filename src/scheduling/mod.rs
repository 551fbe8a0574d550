//! This module takes care of scheduling the analysis work, encapsulating use
//! of multiple threads and anything else that will come in the future

#[cfg(feature = "multi-threading")]
mod multi_threading;
#[cfg(not(feature = "multi-threading"))]
mod sequential;

use crate::{event::RawEvent, resacc::ResultsAccumulator, resfin::FinalResults};

/// Size of the analysed event batches
///
/// Events are grouped in batches of a certain size, which are the unit of
/// parallel work. Batch results are merged in input order, so that the output
/// of sequential and parallel runs is identical.
///
pub const EVENT_BATCH_SIZE: usize = 10_000;

/// Run the analysis in the manner that was configured at build time.
///
/// Takes as parameters the raw events, and an analysis kernel that analyses a
/// batch of events and returns the accumulated intermediary results.
///
/// Returns the finalized analysis results
///
pub fn run_analysis(
    events: &[RawEvent],
    analyse_events: impl Send + Sync + Fn(&[RawEvent]) -> ResultsAccumulator,
) -> FinalResults {
    run_analysis_batched(events, EVENT_BATCH_SIZE, analyse_events)
}

/// Like `run_analysis`, with a custom batch size
pub fn run_analysis_batched(
    events: &[RawEvent],
    batch_size: usize,
    analyse_events: impl Send + Sync + Fn(&[RawEvent]) -> ResultsAccumulator,
) -> FinalResults {
    assert!(batch_size > 0, "Batches should not be empty");

    // Integrate analysis results...
    let accumulator = {
        // ...in sequential mode
        #[cfg(not(feature = "multi-threading"))]
        {
            sequential::run_analysis_impl(events, batch_size, analyse_events)
        }

        // ...in multi-threaded mode
        #[cfg(feature = "multi-threading")]
        {
            multi_threading::run_analysis_impl(events, batch_size, analyse_events)
        }
    };

    // Finalize the results
    accumulator.finalize()
}
