//! Scheduler: the fast tick that drives `Worker::run_once` and the
//! janitor tick that reaps stuck/expired state (spec.md §4.3). Both are
//! plain `tokio::time::interval` loops — there is no cron dependency
//! here, since the Worker binary is a long-lived process rather than a
//! serverless function.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::context::WorkerContext;
use crate::executor::{RunOnceResult, Worker};
use crate::janitor::run_janitor_pass;

/// Run one fast tick: invoke `Worker::run_once` up to
/// `config.fast_tick_concurrency` times in parallel, bounding total
/// wall time to the tick's own budget and stopping early once a batch
/// of calls comes back all-idle (no more queued work right now).
pub async fn run_fast_tick(ctx: &WorkerContext) -> Vec<RunOnceResult> {
    let worker = Worker::new(ctx.clone());
    let deadline = Instant::now() + ctx.config.job_timeout;
    let mut results = Vec::new();

    loop {
        if Instant::now() >= deadline {
            break;
        }

        let batch: Vec<_> = (0..ctx.config.fast_tick_concurrency)
            .map(|_| worker.run_once())
            .collect();
        let outcomes = futures_join_all(batch).await;

        let any_processed = outcomes.iter().any(|r| !matches!(r, RunOnceResult::Idle));
        results.extend(outcomes);
        if !any_processed {
            break;
        }
    }

    results
}

/// `futures::future::join_all` without pulling in the `futures` crate
/// for one call site — `tokio::join!` only handles a fixed arity, so a
/// runtime-sized batch goes through `JoinSet` instead.
async fn futures_join_all(
    tasks: Vec<impl std::future::Future<Output = RunOnceResult>>,
) -> Vec<RunOnceResult> {
    let mut set = tokio::task::JoinSet::new();
    for task in tasks {
        set.spawn(task);
    }
    let mut out = Vec::new();
    while let Some(res) = set.join_next().await {
        match res {
            Ok(r) => out.push(r),
            Err(e) => out.push(RunOnceResult::Error { error: e.to_string() }),
        }
    }
    out
}

/// Spawn the fast tick as a background task, looping forever on
/// `config.fast_tick_interval`. Returns the `JoinHandle` so the binary
/// can await it (it never completes under normal operation).
pub fn spawn_fast_tick_loop(ctx: WorkerContext) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ctx.config.fast_tick_interval);
        loop {
            ticker.tick().await;
            let results = run_fast_tick(&ctx).await;
            let processed = results.iter().filter(|r| matches!(r, RunOnceResult::Processed { .. })).count();
            let errored: Vec<_> = results
                .iter()
                .filter_map(|r| match r {
                    RunOnceResult::Error { error } => Some(error.clone()),
                    _ => None,
                })
                .collect();
            if processed > 0 {
                info!(processed, "fast tick processed jobs");
            }
            for error in errored {
                warn!(error, "fast tick run_once errored");
            }
        }
    })
}

/// Spawn the janitor as a background task, looping forever on
/// `config.janitor_interval`.
pub fn spawn_janitor_loop(ctx: WorkerContext) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ctx.config.janitor_interval);
        loop {
            ticker.tick().await;
            match run_janitor_pass(&ctx).await {
                Ok(report) => info!(?report, "janitor pass complete"),
                Err(e) => warn!(error = %e, "janitor pass failed"),
            }
        }
    })
}

/// Bundles both loop handles so a binary's `main` can hold a single
/// value and await either one exiting (which, barring a panic, never
/// happens — both loops are infinite).
pub struct Scheduler {
    pub fast_tick: tokio::task::JoinHandle<()>,
    pub janitor: tokio::task::JoinHandle<()>,
}

impl Scheduler {
    pub fn spawn(ctx: Arc<WorkerContext>) -> Self {
        let fast_tick = spawn_fast_tick_loop((*ctx).clone());
        let janitor = spawn_janitor_loop((*ctx).clone());
        Self { fast_tick, janitor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_arithmetic_is_sane() {
        let budget = Duration::from_secs(55);
        let start = Instant::now();
        assert!(start + budget > start);
    }
}
