//! Multi-threaded back-end of the analysis

use crate::{event::RawEvent, resacc::ResultsAccumulator};

use std::sync::Mutex;

/// Analyse events in multi-threaded mode
///
/// Does not finalize the output results, so should be readily amenable to
/// extra layers of parallelization (such as distribution across multiple
/// compute nodes).
///
pub fn run_analysis_impl(
    events: &[RawEvent],
    batch_size: usize,
    analyse_events: impl Send + Sync + Fn(&[RawEvent]) -> ResultsAccumulator,
) -> ResultsAccumulator {
    // The results of parallel tasks will be aggregated in input order
    let batches = events.chunks(batch_size);
    let accumulator = ReproducibleAccumulator::new(batches.len());

    // This function is a synchronization scope: it will only return
    // once all inner tasks have been executed
    rayon::scope(|scope| {
        // For each batch of events, spawn a task which is responsible for
        // analysing them
        for (batch_id, batch) in batches.enumerate() {
            let accumulator_ref = &accumulator;
            let analyse_events_ref = &analyse_events;
            scope.spawn(move |_| {
                let result = analyse_events_ref(batch);
                accumulator_ref.set_task_result(batch_id, result);
            });
        }
    });

    // Extract the results from the accumulator
    accumulator.get_merged_result()
}

/// Order-preserving results accumulation mechanism
struct ReproducibleAccumulator {
    /// Storage for the intermediary analysis results of parallel tasks
    results: Box<[Mutex<Option<ResultsAccumulator>>]>,
}
//
impl ReproducibleAccumulator {
    /// Set up results storage for N parallel tasks
    fn new(num_tasks: usize) -> Self {
        Self {
            results: (0..num_tasks)
                .map(|_| Mutex::new(None))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
        }
    }

    /// Integrate the results of the n-th analysis task
    fn set_task_result(&self, task_id: usize, result: ResultsAccumulator) {
        let mut lock = self.results[task_id]
            .lock()
            .expect("Mutex data should be valid");
        assert!(lock.is_none(), "Tasks should not report results twice");
        *lock = Some(result);
    }

    /// Aggregate the results in input order
    fn get_merged_result(self) -> ResultsAccumulator {
        self.results
            .into_vec()
            .into_iter()
            .map(|entry| {
                entry
                    .into_inner()
                    .expect("Mutex data should be valid")
                    .expect("Result should be ready")
            })
            .fold(ResultsAccumulator::new(), |mut r1, r2| {
                r1.merge(r2);
                r1
            })
    }
}
