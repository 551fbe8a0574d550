//! Sequential back-end of the analysis

use crate::{event::RawEvent, resacc::ResultsAccumulator};

/// Analyse events in sequential mode
///
/// We use batched logic even in sequential mode, in order to exercise the same
/// result merging logic as multi-threaded runs.
///
pub fn run_analysis_impl(
    events: &[RawEvent],
    batch_size: usize,
    analyse_events: impl Fn(&[RawEvent]) -> ResultsAccumulator,
) -> ResultsAccumulator {
    events
        .chunks(batch_size)
        .fold(ResultsAccumulator::new(), |mut accumulator, batch| {
            accumulator.merge(analyse_events(batch));
            accumulator
        })
}
