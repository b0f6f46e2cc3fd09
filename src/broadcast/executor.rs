//! Scheduled broadcast execution
//!
//! Runs every due task once per invocation. Tasks are independent: a failure
//! is recorded on that task and the batch moves on. There is no claim step,
//! so overlapping invocations may process the same task twice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{compose, media, schedule, targets};
use crate::channels::{OutgoingPayload, Transport};
use crate::db::{BroadcastRepo, BroadcastTask, GroupRepo, LeadRepo, NewBroadcast, Repositories};
use crate::{Error, Result};

/// Recorded on tasks that found nobody to send to
const NO_TARGETS: &str = "No targets found for scope";

/// Send pacing for large batches
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    /// Batches with more targets than this are paced
    pub threshold: usize,
    pub delay: std::time::Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            threshold: 30,
            delay: std::time::Duration::from_millis(50),
        }
    }
}

/// Counts for one executor run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Tasks that were due
    pub due: usize,
    /// One-shot tasks closed
    pub completed: usize,
    /// Recurring tasks moved to their next slot
    pub rescheduled: usize,
    /// Tasks parked in `error`
    pub failed: usize,
    /// Tasks left pending at their slot: no targets, or a storage error
    pub skipped: usize,
}

enum Outcome {
    Completed,
    Rescheduled,
    Failed,
    Skipped,
}

/// Broadcast executor
pub struct BroadcastExecutor {
    leads: LeadRepo,
    groups: GroupRepo,
    broadcasts: BroadcastRepo,
    transport: Arc<dyn Transport>,
    throttle: Throttle,
}

impl BroadcastExecutor {
    #[must_use]
    pub fn new(repos: &Repositories, transport: Arc<dyn Transport>, throttle: Throttle) -> Self {
        Self {
            leads: repos.leads.clone(),
            groups: repos.groups.clone(),
            broadcasts: repos.broadcasts.clone(),
            transport,
            throttle,
        }
    }

    /// Run all tasks due now
    ///
    /// # Errors
    ///
    /// Returns error only if the due tasks or audiences cannot be loaded
    pub async fn run(&self) -> Result<RunSummary> {
        self.run_at(Utc::now()).await
    }

    /// Run all tasks due at `now`
    ///
    /// # Errors
    ///
    /// Returns error only if the due tasks or audiences cannot be loaded
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let due = self.broadcasts.due(now)?;
        let mut summary = RunSummary {
            due: due.len(),
            ..RunSummary::default()
        };
        if due.is_empty() {
            return Ok(summary);
        }

        // One audience snapshot for the whole batch
        let leads = self.leads.all_ids()?;
        let groups = self.groups.authorized_ids()?;

        for task in &due {
            match self.execute(task, &leads, &groups, now).await {
                Ok(Outcome::Completed) => summary.completed += 1,
                Ok(Outcome::Rescheduled) => summary.rescheduled += 1,
                Ok(Outcome::Failed) => summary.failed += 1,
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "broadcast task skipped");
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!(
            due = summary.due,
            completed = summary.completed,
            rescheduled = summary.rescheduled,
            failed = summary.failed,
            skipped = summary.skipped,
            "broadcast run finished"
        );
        Ok(summary)
    }

    async fn execute(
        &self,
        task: &BroadcastTask,
        leads: &[i64],
        groups: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let targets = targets::resolve(task.scope, leads, groups);
        if targets.is_empty() {
            tracing::warn!(task_id = %task.id, scope = task.scope.as_str(), "broadcast has no targets");
            if schedule::interval(task.frequency, task.custom_interval_minutes).is_some() {
                // Recurring tasks keep their slot and retry next run
                self.broadcasts.record_no_targets(&task.id, NO_TARGETS)?;
                return Ok(Outcome::Skipped);
            }
            return self.finish(task, now, 0, Some(NO_TARGETS));
        }

        let base = compose::payload(&task.message, &task.buttons);
        let prepared = match media::prepare(
            self.transport.as_ref(),
            base,
            task.image.as_deref(),
            &targets,
        )
        .await
        {
            Ok(prepared) => prepared,
            Err(e) => {
                let message = match e {
                    Error::Upload(msg) => format!("Telegram Upload Error: {msg}"),
                    Error::Validation(msg) => format!("Image Error: {msg}"),
                    other => other.to_string(),
                };
                tracing::error!(task_id = %task.id, error = %message, "broadcast image preparation failed");
                self.broadcasts.mark_error(&task.id, &message)?;
                return Ok(Outcome::Failed);
            }
        };

        if prepared.payload.is_empty() {
            tracing::error!(task_id = %task.id, "broadcast has nothing to send");
            self.broadcasts
                .mark_error(&task.id, "broadcast has no message or image")?;
            return Ok(Outcome::Failed);
        }

        let sent = self
            .send_all(&prepared.payload, &targets[prepared.delivered..], targets.len())
            .await;
        let reached = u64::try_from(prepared.delivered + sent).unwrap_or(u64::MAX);

        tracing::info!(task_id = %task.id, targets = targets.len(), reached, "broadcast sent");
        self.finish(task, now, reached, None)
    }

    /// Close a one-shot task or move a recurring one past `now`
    fn finish(
        &self,
        task: &BroadcastTask,
        now: DateTime<Utc>,
        reached: u64,
        note: Option<&str>,
    ) -> Result<Outcome> {
        match schedule::interval(task.frequency, task.custom_interval_minutes) {
            None => {
                self.broadcasts.complete(&task.id, now, reached, note)?;
                Ok(Outcome::Completed)
            }
            Some(interval) => {
                let next = schedule::next_occurrence(task.scheduled_at, now, interval);
                self.broadcasts
                    .reschedule(&task.id, next, now, reached, note)?;
                tracing::info!(task_id = %task.id, next = %next, "broadcast rescheduled");
                Ok(Outcome::Rescheduled)
            }
        }
    }

    /// Deliver to each target, logging and skipping failures
    ///
    /// `batch_size` is the full audience size, used to decide on pacing.
    async fn send_all(&self, payload: &OutgoingPayload, targets: &[i64], batch_size: usize) -> usize {
        let paced = batch_size > self.throttle.threshold;
        let mut sent = 0;

        for (i, &chat_id) in targets.iter().enumerate() {
            if paced && i > 0 {
                tokio::time::sleep(self.throttle.delay).await;
            }
            match payload.deliver(self.transport.as_ref(), chat_id, None).await {
                Ok(_) => sent += 1,
                Err(e) => tracing::warn!(chat_id, error = %e, "broadcast send failed"),
            }
        }

        sent
    }

    /// Send a broadcast immediately without storing it
    ///
    /// Uses the same audience resolution, upload reuse and send loop as
    /// scheduled runs. Returns the number of chats reached.
    ///
    /// # Errors
    ///
    /// Returns error if validation fails, audiences cannot be loaded, or the
    /// image upload fails
    pub async fn send_now(&self, new: &NewBroadcast) -> Result<u64> {
        compose::validate(new, false)?;

        let leads = self.leads.all_ids()?;
        let groups = self.groups.authorized_ids()?;
        let targets = targets::resolve(new.scope.unwrap_or_default(), &leads, &groups);
        if targets.is_empty() {
            return Ok(0);
        }

        let base = compose::payload(&new.message, &new.buttons);
        let prepared =
            media::prepare(self.transport.as_ref(), base, new.image.as_deref(), &targets).await?;
        let sent = self
            .send_all(&prepared.payload, &targets[prepared.delivered..], targets.len())
            .await;

        Ok(u64::try_from(prepared.delivered + sent).unwrap_or(u64::MAX))
    }
}
