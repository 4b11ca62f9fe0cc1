// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recurring job scheduler driven by 5-field cron expressions.
//!
//! Each armed job is a tokio task that sleeps until the next local-time
//! occurrence, runs the job, and repeats until its token is cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local, NaiveTime, Timelike};
use croner::Cron;
use dashmap::DashMap;
use futures::future::BoxFuture;
use nutria_core::{Clock, NutriaError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A job body. Called once per occurrence.
pub type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Identifies an armed job for cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    id: u64,
    name: String,
}

impl JobHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Parses a cron expression.
pub fn parse_expression(expression: &str) -> Result<Cron, NutriaError> {
    Cron::new(expression)
        .parse()
        .map_err(|e| NutriaError::InvalidInput(format!("invalid cron expression `{expression}`: {e}")))
}

/// Cron expression firing every day at `time`.
pub fn daily_expression(time: NaiveTime) -> String {
    format!("{} {} * * *", time.minute(), time.hour())
}

/// Parses a strict `HH:MM` time of day.
pub fn parse_time_of_day(input: &str) -> Option<NaiveTime> {
    let (h, m) = input.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Next occurrence strictly after `from`.
pub fn next_occurrence(cron: &Cron, from: &DateTime<Local>) -> Option<DateTime<Local>> {
    cron.find_next_occurrence(from, false).ok()
}

/// Arms and cancels recurring jobs.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    root: CancellationToken,
    jobs: Arc<DashMap<u64, CancellationToken>>,
    next_id: AtomicU64,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            root: CancellationToken::new(),
            jobs: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Arms `job` to run at every occurrence of `expression`.
    pub fn arm(&self, name: &str, expression: &str, job: Job) -> Result<JobHandle, NutriaError> {
        let cron = parse_expression(expression)?;
        let handle = JobHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
        };
        let token = self.root.child_token();
        self.jobs.insert(handle.id, token.clone());

        let clock = self.clock.clone();
        let jobs = self.jobs.clone();
        let job_id = handle.id;
        let job_name = handle.name.clone();
        tokio::spawn(async move {
            // Never compute from before the last firing, so a sleep that
            // wakes early cannot run the same occurrence twice.
            let mut last_fired: Option<DateTime<Local>> = None;
            loop {
                let now = clock.now();
                let from = match last_fired {
                    Some(last) if last > now => last,
                    _ => now,
                };
                let Some(next) = next_occurrence(&cron, &from) else {
                    warn!(job = job_name.as_str(), "no next occurrence, stopping job");
                    break;
                };
                let wait = next.signed_duration_since(now).to_std().unwrap_or_default();

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
                debug!(job = job_name.as_str(), at = %next, "running scheduled job");
                job().await;
                last_fired = Some(next);
            }
            jobs.remove(&job_id);
            debug!(job = job_name.as_str(), "scheduled job stopped");
        });

        info!(job = name, expression, "job armed");
        Ok(handle)
    }

    /// Cancels a job. Returns false if it was not armed.
    pub fn cancel(&self, handle: &JobHandle) -> bool {
        match self.jobs.remove(&handle.id) {
            Some((_, token)) => {
                token.cancel();
                debug!(job = handle.name.as_str(), "job cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancels every job armed by this scheduler.
    pub fn shutdown(&self) {
        self.root.cancel();
        self.jobs.clear();
    }

    /// Number of armed jobs.
    pub fn armed(&self) -> usize {
        self.jobs.len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
