//! Lifecycle bookkeeping shared by every executor type.

use super::{ExecutorId, ExecutorPhase};
use crate::context::ExecutionContext;
use crate::core::CompletionStatus;
use crate::errors::{ExecutorOperation, IllegalCallOrderError, PlanflowError, PlanflowResult};
use crate::events::event_types;
use crate::plan::Step;
use crate::utils::{now_utc, Timestamp};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

#[derive(Debug)]
pub(crate) struct ExecutorState {
    pub(crate) id: ExecutorId,
    pub(crate) step: Arc<Step>,
    pub(crate) context: Arc<ExecutionContext>,
    phase: Mutex<ExecutorPhase>,
    started_at: Mutex<Option<Timestamp>>,
    refusal: Mutex<Option<String>>,
    pub(crate) status: OnceCell<CompletionStatus>,
}

impl ExecutorState {
    pub(crate) fn new(id: ExecutorId, step: Arc<Step>, context: Arc<ExecutionContext>) -> Self {
        Self {
            id,
            step,
            context,
            phase: Mutex::new(ExecutorPhase::Created),
            started_at: Mutex::new(None),
            refusal: Mutex::new(None),
            status: OnceCell::new(),
        }
    }

    pub(crate) fn phase(&self) -> ExecutorPhase {
        *self.phase.lock()
    }

    pub(crate) fn started_at(&self) -> Option<Timestamp> {
        *self.started_at.lock()
    }

    /// Moves `Created` to `Running`, or to `Refused` if the run is cancelled.
    pub(crate) fn begin_execute(&self) -> PlanflowResult<()> {
        let mut phase = self.phase.lock();
        if *phase != ExecutorPhase::Created {
            return Err(self.illegal(ExecutorOperation::Execute, "called more than once"));
        }

        if self.context.is_cancellation_requested() {
            let reason = self
                .context
                .cancel_reason()
                .unwrap_or_else(|| "run cancelled".to_string());
            *phase = ExecutorPhase::Refused;
            *self.refusal.lock() = Some(reason.clone());
            debug!(step = %self.step.name(), "execute refused: run already cancelled");
            return Err(PlanflowError::Cancelled(reason));
        }

        *phase = ExecutorPhase::Running;
        *self.started_at.lock() = Some(now_utc());
        Ok(())
    }

    /// Checks that a wait is legal. Returns the not-started status if
    /// `execute()` was refused.
    pub(crate) fn check_waitable(&self) -> PlanflowResult<Option<CompletionStatus>> {
        match self.phase() {
            ExecutorPhase::Created => Err(self.illegal(
                ExecutorOperation::WaitForCompletion,
                "called before execute",
            )),
            ExecutorPhase::Refused => {
                let reason = self
                    .refusal
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "run cancelled".to_string());
                Ok(Some(CompletionStatus::not_started(
                    &self.step,
                    &format!("not started: {reason}"),
                )))
            }
            ExecutorPhase::Running | ExecutorPhase::Finished => Ok(None),
        }
    }

    /// Records the terminal status.
    pub(crate) fn finish(&self, status: CompletionStatus) -> CompletionStatus {
        *self.phase.lock() = ExecutorPhase::Finished;
        debug!(
            step = %self.step.name(),
            state = %status.state,
            "step finished"
        );
        self.context.emit(
            event_types::STEP_COMPLETED,
            Some(serde_json::json!({
                "step_id": self.step.id().to_string(),
                "step": self.step.name(),
                "step_type": self.step.step_type(),
                "state": status.state,
                "duration_ms": status.duration_ms(),
            })),
        );
        status
    }

    /// Reason recorded for children that were never launched.
    pub(crate) fn not_started_reason(&self) -> String {
        match self.context.cancel_reason() {
            Some(reason) => format!("not started: run cancelled ({reason})"),
            None => "not started: run cancelled".to_string(),
        }
    }

    /// Reason recorded for a launched step whose wait was cut short.
    pub(crate) fn interrupted_reason(&self) -> String {
        match self.context.cancel_reason() {
            Some(reason) => format!("interrupted: run cancelled ({reason})"),
            None => "interrupted: run cancelled".to_string(),
        }
    }

    fn illegal(&self, operation: ExecutorOperation, reason: &str) -> PlanflowError {
        IllegalCallOrderError::new(self.step.id(), self.step.name(), operation, reason).into()
    }
}
