//! Dispatcher: primary-first handler invocation with bounded, cancellable
//! secondary fan-out.
//!
//! Semantics:
//! 1. The primary handler runs first and alone; retriable failures get up
//!    to `primary_retry` retries with exponential backoff.
//! 2. A failed primary skips fan-out entirely and the command is `error`.
//! 3. Secondaries run concurrently under a semaphore shared across all
//!    in-flight commands, one retry each; failures degrade the command to
//!    `partial` but never cancel sibling secondaries.
//! 4. Results keep catalog declaration order regardless of completion
//!    order, and outstanding work past the overall deadline is reported
//!    as a timeout result.

use crate::catalog::{EventType, TargetModule};
use crate::classifier::{ClassificationResult, ClassificationSource, ClassifiedEvent};
use crate::config::DispatchConfig;
use crate::error::CommandError;
use crate::logging::{log_debug, log_warn};
use crate::registry::{HandlerRegistry, HandlerResult};
use futures_util::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Smallest per-handler budget the dispatcher will compute.
const MIN_HANDLER_BUDGET: Duration = Duration::from_millis(50);

/// Overall outcome of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    /// Primary and all secondaries succeeded.
    Ok,
    /// Primary succeeded; at least one secondary failed.
    Partial,
    /// Primary failed; fan-out was skipped.
    Error,
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::Partial => "partial",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// One dispatched event and its handler's answer.
#[derive(Debug, Clone, Serialize)]
pub struct EventOutcome {
    pub event_type: EventType,
    pub module: TargetModule,
    pub result: HandlerResult,
}

/// Classification facts echoed into the command result.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationSummary {
    pub primary_event_type: EventType,
    pub source: ClassificationSource,
    pub confidence: f64,
    pub unresolved_fields: Vec<String>,
}

/// The composed response for one command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub events_processed: usize,
    pub primary: EventOutcome,
    pub secondaries: Vec<EventOutcome>,
    pub classification: ClassificationSummary,
    pub diagnostics: Vec<String>,
}

/// Per-handler budget: an equal share of the remaining time, floored so a
/// handler always gets something to work with.
fn per_task_budget(remaining: Duration, remaining_tasks: usize) -> Duration {
    let share = remaining / remaining_tasks.max(1) as u32;
    share.max(MIN_HANDLER_BUDGET)
}

/// Dispatches classified events to their module handlers.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    config: DispatchConfig,
    fanout: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, config: DispatchConfig) -> Self {
        let fanout = Arc::new(Semaphore::new(config.max_parallel));
        Self {
            registry,
            config,
            fanout,
        }
    }

    /// Dispatch one classification and compose the command result.
    ///
    /// Never fails: handler-level problems are folded into the per-event
    /// results and the overall status.
    pub async fn dispatch(
        &self,
        classification: ClassificationResult,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> CommandResult {
        let ClassificationResult {
            mut primary,
            secondaries,
            unresolved,
            source,
            action,
            diagnostics,
        } = classification;

        let summary = ClassificationSummary {
            primary_event_type: primary.event_type,
            source,
            confidence: primary.confidence,
            unresolved_fields: unresolved,
        };

        // Primary first; its effects land before any secondary starts.
        primary.event_id = Some(Uuid::new_v4());
        let total_tasks = 1 + secondaries.len();
        let primary_outcome = self
            .invoke_with_retry(
                &action,
                &primary,
                self.config.primary_retry,
                deadline,
                total_tasks,
                cancel,
            )
            .await;

        if !primary_outcome.result.ok {
            log_warn!(
                event_type = %primary_outcome.event_type,
                "Primary handler failed; skipping secondary fan-out"
            );
            return CommandResult {
                status: CommandStatus::Error,
                events_processed: 1,
                primary: primary_outcome,
                secondaries: Vec::new(),
                classification: summary,
                diagnostics,
            };
        }

        let secondary_outcomes = self
            .fan_out(&action, secondaries, deadline, cancel)
            .await;

        let events_processed = 1 + secondary_outcomes.len();
        let status = if secondary_outcomes.iter().all(|o| o.result.ok) {
            CommandStatus::Ok
        } else {
            CommandStatus::Partial
        };

        log_debug!(
            status = %status,
            events_processed = events_processed,
            "Command dispatch complete"
        );

        CommandResult {
            status,
            events_processed,
            primary: primary_outcome,
            secondaries: secondary_outcomes,
            classification: summary,
            diagnostics,
        }
    }

    /// Run all secondaries concurrently, bounded by the shared semaphore.
    /// `join_all` keeps input order, so results come back in declaration
    /// order no matter when each completes.
    async fn fan_out(
        &self,
        action: &str,
        secondaries: Vec<ClassifiedEvent>,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Vec<EventOutcome> {
        if secondaries.is_empty() {
            return Vec::new();
        }

        let task_count = secondaries.len();
        let futures = secondaries.into_iter().map(|mut event| {
            let fanout = Arc::clone(&self.fanout);
            event.event_id = Some(Uuid::new_v4());
            async move {
                let _permit = match fanout.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return EventOutcome {
                            event_type: event.event_type,
                            module: event.module,
                            result: HandlerResult::from_command_error(&CommandError::cancelled()),
                        }
                    }
                };
                self.invoke_with_retry(
                    action,
                    &event,
                    self.config.secondary_retry,
                    deadline,
                    task_count,
                    cancel,
                )
                .await
            }
        });

        join_all(futures).await
    }

    /// Invoke one event's handler, retrying retriable failures with
    /// exponential backoff. The event keeps one `event_id` across retries
    /// so idempotent handlers can deduplicate.
    async fn invoke_with_retry(
        &self,
        action: &str,
        event: &ClassifiedEvent,
        max_retries: u32,
        deadline: Instant,
        remaining_tasks: usize,
        cancel: &CancellationToken,
    ) -> EventOutcome {
        let outcome = |result: HandlerResult| EventOutcome {
            event_type: event.event_type,
            module: event.module,
            result,
        };

        let handler = match self.registry.handler_for(event.module) {
            Ok(handler) => handler,
            Err(error) => return outcome(HandlerResult::from_command_error(&error)),
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return outcome(HandlerResult::from_command_error(&CommandError::cancelled()));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return outcome(HandlerResult::from_command_error(
                    &CommandError::handler_timeout(event.module, 0),
                ));
            }

            let budget = per_task_budget(remaining, remaining_tasks);
            let error = tokio::select! {
                _ = cancel.cancelled() => {
                    return outcome(HandlerResult::from_command_error(&CommandError::cancelled()));
                }
                invoked = tokio::time::timeout(budget, handler.invoke(action, event, budget)) => {
                    match invoked {
                        // Structured handler results, ok or not, are final.
                        Ok(Ok(result)) => return outcome(result),
                        Ok(Err(error)) => error,
                        Err(_elapsed) => CommandError::handler_timeout(
                            event.module,
                            budget.as_millis() as u64,
                        ),
                    }
                }
            };

            if !error.is_retryable() || attempt > max_retries {
                return outcome(HandlerResult::from_command_error(&error));
            }

            let delay = self.backoff_delay(attempt);
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining <= delay {
                return outcome(HandlerResult::from_command_error(&error));
            }

            log_debug!(
                event_type = %event.event_type,
                attempt = attempt,
                max_retries = max_retries,
                delay_ms = delay.as_millis(),
                error = %error,
                "Handler failed, retrying after delay"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    return outcome(HandlerResult::from_command_error(&CommandError::cancelled()));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Exponential backoff with up to 10% jitter to avoid lockstep retries.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.config.backoff_initial_ms as f64
            * self.config.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let capped_ms = base_ms.min(self.config.backoff_max_ms as f64);
        let jitter = 1.0 + fastrand::f64() * 0.1;
        Duration::from_millis((capped_ms * jitter) as u64)
    }
}
