use super::{build_pool, CancelToken};
use crate::models::{QueryResult, SimpleWord};
use crate::query::{QueryApi, QueryError};
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryEvent {
    Tick,
    RowDone(usize, QueryResult),
    RowFailed(usize),
    InsufficientBalance,
    AllDone,
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub max_workers: usize,
    /// Pause between submissions
    pub delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_workers: 3,
            delay: Duration::ZERO,
        }
    }
}

/// Results of a query batch, keyed by row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    pub succeeded: BTreeMap<usize, QueryResult>,
    pub failed: BTreeSet<usize>,
    pub insufficient_balance: bool,
}

/// Query every word on a pool of `max_workers` threads.
///
/// Each submitted row gets exactly one `RowDone` or `RowFailed` followed by a
/// `Tick`. Running out of API balance stops the batch: remaining rows fail
/// without being queried.
pub fn run_queries<F>(
    api: &dyn QueryApi,
    words: Vec<(SimpleWord, usize)>,
    options: &QueryOptions,
    cancel: &CancelToken,
    on_event: F,
) -> Result<QueryOutcome>
where
    F: Fn(QueryEvent) + Sync,
{
    let pool = build_pool("query", options.max_workers)?;
    let outcome = Mutex::new(QueryOutcome::default());
    let stop = AtomicBool::new(false);
    let on_event = &on_event;

    let fail = |row: usize| {
        outcome.lock().unwrap_or_else(|e| e.into_inner()).failed.insert(row);
        on_event(QueryEvent::RowFailed(row));
        on_event(QueryEvent::Tick);
    };
    let halted = || stop.load(Ordering::SeqCst) || cancel.is_cancelled();
    let (fail, halted, outcome_ref, stop_ref) = (&fail, &halted, &outcome, &stop);

    pool.in_place_scope(|s| {
        for (i, (word, row)) in words.into_iter().enumerate() {
            if halted() {
                fail(row);
                continue;
            }
            if i > 0 && !options.delay.is_zero() {
                std::thread::sleep(options.delay);
            }

            s.spawn(move |_| {
                if halted() {
                    fail(row);
                    return;
                }
                match api.query(&word) {
                    Ok(Some(result)) => {
                        log::info!("Query succeeded: {}", word);
                        outcome_ref
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .succeeded
                            .insert(row, result.clone());
                        on_event(QueryEvent::RowDone(row, result));
                        on_event(QueryEvent::Tick);
                    }
                    Ok(None) => {
                        log::warn!("Query failed: {}", word);
                        fail(row);
                    }
                    Err(QueryError::InsufficientBalance) => {
                        log::error!("Insufficient balance, stopping all queries: {}", word);
                        if !stop_ref.swap(true, Ordering::SeqCst) {
                            outcome_ref
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .insufficient_balance = true;
                            on_event(QueryEvent::InsufficientBalance);
                        }
                        fail(row);
                    }
                    Err(e) => {
                        log::error!("Query for {} failed: {}", word, e);
                        fail(row);
                    }
                }
            });
        }
    });

    on_event(QueryEvent::AllDone);
    Ok(outcome.into_inner().unwrap_or_else(|e| e.into_inner()))
}
