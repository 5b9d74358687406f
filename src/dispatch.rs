//! Per-target fan-out of a matcher chain.
//!
//! With one worker the targets are matched in the caller's thread, in
//! submission order. With more, the builder is serialized once and every
//! target becomes an independent unit on a rayon pool; each unit rebuilds its
//! own chain from the descriptor and sends its matches back as soon as it
//! finishes, so the merged list follows completion order.

use crate::builder::MatcherBuilder;
use crate::result::MatchResult;
use crate::trace::{trace_debug, trace_span};
use crate::util::AutoEditResult;
use image::RgbImage;

/// Resolves a worker-count hint; `None` means one worker per host core.
pub fn resolve_workers(workers: Option<usize>) -> usize {
    workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
    })
}

/// Matches every target against `original` and concatenates the results.
///
/// Fails only when the chain cannot be described for the parallel path;
/// individual unit failures contribute no matches.
pub fn dispatch_targets(
    original: &RgbImage,
    targets: &[RgbImage],
    builder: &MatcherBuilder,
    workers: Option<usize>,
) -> AutoEditResult<Vec<MatchResult>> {
    let workers = resolve_workers(workers);
    let _span = trace_span!("dispatch", targets = targets.len(), workers = workers).entered();

    if workers <= 1 {
        return Ok(dispatch_sequential(original, targets, builder));
    }
    dispatch_parallel(original, targets, builder, workers)
}

/// Runs targets one after another in the caller's thread.
pub fn dispatch_sequential(
    original: &RgbImage,
    targets: &[RgbImage],
    builder: &MatcherBuilder,
) -> Vec<MatchResult> {
    let mut matches = Vec::new();
    for (idx, target) in targets.iter().enumerate() {
        trace_debug!("target {} of {}", idx + 1, targets.len());
        matches.extend(builder.match_pair(original, target));
    }
    matches
}

#[cfg(feature = "rayon")]
fn dispatch_parallel(
    original: &RgbImage,
    targets: &[RgbImage],
    builder: &MatcherBuilder,
    workers: usize,
) -> AutoEditResult<Vec<MatchResult>> {
    use crate::matchers::panic_message;
    use crate::spec::MatcherSpec;
    use crate::trace::trace_warn;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::mpsc;

    let (spec, config) = builder.serialize()?;
    let pool = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool,
        Err(err) => {
            trace_warn!("worker pool unavailable ({}), matching sequentially", err);
            return Ok(dispatch_sequential(original, targets, builder));
        }
    };

    let run_unit = |spec: &MatcherSpec, target: &RgbImage| -> Vec<MatchResult> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            MatcherBuilder::deserialize(spec, config).map(|b| b.match_pair(original, target))
        }));
        match outcome {
            Ok(Ok(matches)) => matches,
            Ok(Err(err)) => {
                trace_warn!("worker could not rebuild matchers: {}", err);
                Vec::new()
            }
            Err(payload) => {
                trace_warn!("worker panicked: {}", panic_message(payload.as_ref()));
                Vec::new()
            }
        }
    };

    let (tx, rx) = mpsc::channel::<Vec<MatchResult>>();
    pool.scope(|scope| {
        for target in targets {
            let tx = tx.clone();
            let spec = &spec;
            let run_unit = &run_unit;
            scope.spawn(move |_| {
                // The receiver outlives the scope; a send cannot fail here.
                let _ = tx.send(run_unit(spec, target));
            });
        }
    });
    drop(tx);

    Ok(rx.into_iter().flatten().collect())
}

#[cfg(not(feature = "rayon"))]
fn dispatch_parallel(
    original: &RgbImage,
    targets: &[RgbImage],
    builder: &MatcherBuilder,
    workers: usize,
) -> AutoEditResult<Vec<MatchResult>> {
    crate::trace::trace_event!("dispatch_sequential_fallback", workers = workers);
    Ok(dispatch_sequential(original, targets, builder))
}
