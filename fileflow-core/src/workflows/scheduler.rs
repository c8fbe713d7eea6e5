//! Cron bookkeeping and concurrency admission.
//!
//! [`CronTable`] is a pure structure driven by explicit instants: each job
//! remembers the anchor up to which its nominal firings have been
//! considered, and [`CronTable::due`] folds every firing missed since then
//! into at most one decision. [`Admission`] hands out the semaphore permits
//! an execution must hold while it runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::config::schema::SchedulerConfig;
use crate::error::{Error, Result};
use crate::workflows::trigger::parse_cron;

#[derive(Debug, Clone)]
struct CronJob {
    expression: String,
    schedule: cron::Schedule,
    anchor: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// Run once for `nominal`; `coalesced` earlier firings inside the grace
    /// window were folded into it.
    Fire {
        workflow_id: Uuid,
        nominal: DateTime<Utc>,
        coalesced: usize,
    },
    /// Every missed firing is older than the grace window.
    Drop {
        workflow_id: Uuid,
        nominal: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct CronTable {
    jobs: HashMap<Uuid, CronJob>,
    grace: ChronoDuration,
}

impl CronTable {
    pub fn new(grace: std::time::Duration) -> Self {
        Self {
            jobs: HashMap::new(),
            grace: ChronoDuration::from_std(grace).unwrap_or(ChronoDuration::seconds(30)),
        }
    }

    pub fn upsert(&mut self, workflow_id: Uuid, expression: &str, anchor: DateTime<Utc>) -> Result<()> {
        let schedule = parse_cron(expression)?;
        self.jobs.insert(
            workflow_id,
            CronJob {
                expression: expression.to_owned(),
                schedule,
                anchor,
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, workflow_id: Uuid) -> bool {
        self.jobs.remove(&workflow_id).is_some()
    }

    pub fn contains(&self, workflow_id: Uuid) -> bool {
        self.jobs.contains_key(&workflow_id)
    }

    pub fn set_anchor(&mut self, workflow_id: Uuid, anchor: DateTime<Utc>) {
        if let Some(job) = self.jobs.get_mut(&workflow_id) {
            job.anchor = anchor;
        }
    }

    pub fn expression(&self, workflow_id: Uuid) -> Option<&str> {
        self.jobs
            .get(&workflow_id)
            .map(|job| job.expression.as_str())
    }

    pub fn next_fire_time(&self, workflow_id: Uuid) -> Option<DateTime<Utc>> {
        let job = self.jobs.get(&workflow_id)?;
        job.schedule.after(&job.anchor).next()
    }

    /// Decides, for every job, what happens at `now`, then moves each anchor
    /// to `now`. Only firings inside `(anchor, now]` are considered, and only
    /// the latest one within the grace window may fire.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<ScheduleDecision> {
        let mut decisions = Vec::new();
        for (workflow_id, job) in self.jobs.iter_mut() {
            if now <= job.anchor {
                continue;
            }

            // `after` is exclusive; a firing exactly `grace` old is still on time.
            let window_start = job
                .anchor
                .max(now - self.grace - ChronoDuration::nanoseconds(1));
            let mut in_window = job
                .schedule
                .after(&window_start)
                .take_while(|nominal| *nominal <= now);
            if let Some(first) = in_window.next() {
                let (latest, extra) = in_window.fold((first, 0usize), |(_, count), nominal| {
                    (nominal, count + 1)
                });
                decisions.push(ScheduleDecision::Fire {
                    workflow_id: *workflow_id,
                    nominal: latest,
                    coalesced: extra,
                });
            } else if let Some(missed) = job
                .schedule
                .after(&job.anchor)
                .next()
                .filter(|nominal| *nominal <= now)
            {
                decisions.push(ScheduleDecision::Drop {
                    workflow_id: *workflow_id,
                    nominal: missed,
                });
            }
            job.anchor = now;
        }
        decisions
    }
}

/// A running execution's claim on the global and per-workflow caps.
#[derive(Debug)]
pub struct ExecutionPermit {
    _global: OwnedSemaphorePermit,
    _workflow: Option<OwnedSemaphorePermit>,
}

/// Claim on a slot of the bounded event queue; released on admission.
#[derive(Debug)]
pub struct QueuedEvent {
    _slot: OwnedSemaphorePermit,
}

pub struct Admission {
    global: Arc<Semaphore>,
    event_queue: Arc<Semaphore>,
    per_workflow: Mutex<HashMap<Uuid, Arc<Semaphore>>>,
    per_workflow_limit: usize,
}

impl Admission {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            global: Arc::new(Semaphore::new(config.max_concurrent_executions)),
            event_queue: Arc::new(Semaphore::new(config.max_queued_events)),
            per_workflow: Mutex::new(HashMap::new()),
            per_workflow_limit: config.max_instances_per_workflow,
        }
    }

    /// Non-blocking admission for manual and scheduled firings.
    pub fn try_admit(&self, workflow_id: Uuid) -> Result<ExecutionPermit> {
        // Acquired under the map lock so `forget_idle` never drops a claimed
        // semaphore.
        let workflow = self
            .per_workflow
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(workflow_id)
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_workflow_limit)))
            .clone()
            .try_acquire_owned()
            .map_err(|_| {
                Error::Capacity(format!(
                    "workflow {workflow_id} already has {} executions in flight",
                    self.per_workflow_limit
                ))
            })?;
        let global = self.global.clone().try_acquire_owned().map_err(|_| {
            Error::Capacity("global execution limit reached".to_owned())
        })?;
        Ok(ExecutionPermit {
            _global: global,
            _workflow: Some(workflow),
        })
    }

    /// Reserves a queue slot for an event firing, or fails when the queue is
    /// full.
    pub fn try_enqueue_event(&self) -> Result<QueuedEvent> {
        self.event_queue
            .clone()
            .try_acquire_owned()
            .map(|slot| QueuedEvent { _slot: slot })
            .map_err(|_| Error::Capacity("event queue is full".to_owned()))
    }

    /// Waits for a global permit. Event firings bypass the per-workflow cap.
    pub async fn admit_event(&self, queued: QueuedEvent) -> Result<ExecutionPermit> {
        let global = self
            .global
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Execution("execution admission closed".to_owned()))?;
        drop(queued);
        Ok(ExecutionPermit {
            _global: global,
            _workflow: None,
        })
    }

    /// Drops the per-workflow semaphore when no execution holds it. A later
    /// admission starts from a fresh one.
    pub fn forget_idle(&self, workflow_id: Uuid) -> bool {
        let mut per_workflow = self
            .per_workflow
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let idle = per_workflow
            .get(&workflow_id)
            .is_some_and(|semaphore| semaphore.available_permits() == self.per_workflow_limit);
        if idle {
            per_workflow.remove(&workflow_id);
        }
        idle
    }

    pub fn tracked_workflows(&self) -> usize {
        self.per_workflow
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn available_global(&self) -> usize {
        self.global.available_permits()
    }
}
