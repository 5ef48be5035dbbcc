//! Per-run pipeline state machine.
//!
//! A [`PipelineMachine`] is created for each invocation, fed every decoded event in
//! arrival order, and frozen into a [`PipelineRun`] once the stream ends.

use std::time::Duration;

use tracing::{debug, warn};

use crate::event::{PipelineEvent, Stage, TokenUsage};
use crate::payload::DecodedEvent;

/// Lifecycle status of a single stage.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Running,
    Done,
    Skipped,
    Failed,
    NeedsConfirmation,
}

impl StageStatus {
    /// True once the stage has left `running` for good.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StageStatus::Done
                | StageStatus::Skipped
                | StageStatus::Failed
                | StageStatus::NeedsConfirmation
        )
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct StageState {
    pub stage: Stage,
    pub status: StageStatus,
    /// Reported duration, recorded when the stage completes.
    pub duration: Option<Duration>,
}

impl StageState {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            status: StageStatus::Pending,
            duration: None,
        }
    }
}

/// Clarification requested by the intent stage.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct Confirmation {
    pub clarified_question: String,
    pub alternatives: Vec<String>,
}

impl Confirmation {
    /// Human-readable prompt asking the caller to resubmit with a confirmed intent.
    pub fn advisory(&self) -> String {
        format!(
            "intent is ambiguous and needs confirmation:\n  question: {}\n  alternatives: {}\n\nresubmit with --confirmed-intent \"<your choice>\"",
            self.clarified_question,
            self.alternatives.join(", ")
        )
    }
}

/// How a finished run should be presented.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RunOutcome {
    /// The pipeline reported `error` or `forbidden`.
    Failed { message: String },
    /// The intent stage asked for a confirmed intent.
    NeedsConfirmation(Confirmation),
    /// Synthesis produced text.
    Completed { text: String },
    /// The stream closed without result or error.
    Empty,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Receives decoded events in strict arrival order.
///
/// Called synchronously from the read loop, so implementations must not block.
pub trait EventSink {
    fn on_event(&mut self, event: &DecodedEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&DecodedEvent),
{
    fn on_event(&mut self, event: &DecodedEvent) {
        self(event)
    }
}

/// Forwards each event to two sinks, first `A` then `B`.
pub struct Tee<'a, A: ?Sized, B: ?Sized> {
    pub first: &'a mut A,
    pub second: &'a mut B,
}

impl<A: EventSink + ?Sized, B: EventSink + ?Sized> EventSink for Tee<'_, A, B> {
    fn on_event(&mut self, event: &DecodedEvent) {
        self.first.on_event(event);
        self.second.on_event(event);
    }
}

/// Mutable state of a run while its stream is open.
#[derive(Debug)]
pub struct PipelineMachine {
    run_id: uuid::Uuid,
    stages: [StageState; 4],
    result: String,
    usage: Option<TokenUsage>,
    error: Option<String>,
    confirmation: Option<Confirmation>,
}

impl Default for PipelineMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMachine {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            stages: Stage::ALL.map(StageState::new),
            result: String::new(),
            usage: None,
            error: None,
            confirmation: None,
        }
    }

    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.stages[stage.index()].status
    }

    /// Synthesis text accumulated since the start or the last reset.
    pub fn result(&self) -> &str {
        &self.result
    }

    /// Applies one interpreted event.
    pub fn apply(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => {
                self.transition(*stage, StageStatus::Running);
            }
            PipelineEvent::StageCompleted {
                stage,
                skipped,
                duration_ms,
            } => {
                let next = if *skipped {
                    StageStatus::Skipped
                } else {
                    StageStatus::Done
                };
                if self.transition(*stage, next)
                    && let Some(ms) = duration_ms
                {
                    self.stages[stage.index()].duration = Some(Duration::from_millis(*ms));
                }
            }
            PipelineEvent::StageFailed { stage, message } => {
                debug!(run_id = %self.run_id, %stage, message = message.as_deref().unwrap_or(""), "stage failed");
                self.transition(*stage, StageStatus::Failed);
            }
            PipelineEvent::NeedsConfirmation {
                clarified_question,
                alternatives,
            } => {
                // Recorded even when the intent stage has already settled.
                self.transition(Stage::Intent, StageStatus::NeedsConfirmation);
                self.confirmation = Some(Confirmation {
                    clarified_question: clarified_question.clone(),
                    alternatives: alternatives.clone(),
                });
            }
            PipelineEvent::SynthesisReset => {
                debug!(run_id = %self.run_id, discarded = self.result.len(), "synthesis reset");
                self.result.clear();
            }
            PipelineEvent::SynthesisChunk { chunk } => {
                if !chunk.is_empty() {
                    self.result.push_str(chunk);
                }
            }
            PipelineEvent::PipelineComplete { token_usage } => {
                self.usage = *token_usage;
            }
            PipelineEvent::Error { message } | PipelineEvent::Forbidden { message } => {
                self.error = Some(message.clone());
            }
            PipelineEvent::Unknown { event, .. } => {
                debug!(run_id = %self.run_id, event = %event, "unrecognised pipeline event");
            }
        }
    }

    /// Moves a stage forward. Returns false, leaving it untouched, on regression.
    fn transition(&mut self, stage: Stage, next: StageStatus) -> bool {
        let state = &mut self.stages[stage.index()];
        let allowed = match state.status {
            StageStatus::Pending => next != StageStatus::Pending,
            StageStatus::Running => next.is_terminal(),
            _ => false,
        };
        if !allowed {
            warn!(run_id = %self.run_id, %stage, from = ?state.status, to = ?next, "ignoring stage regression");
            return false;
        }
        state.status = next;
        true
    }

    /// Freezes the run.
    pub fn finish(self) -> PipelineRun {
        PipelineRun {
            run_id: self.run_id,
            stages: self.stages,
            result: self.result,
            usage: self.usage,
            error: self.error,
            confirmation: self.confirmation,
        }
    }
}

impl EventSink for PipelineMachine {
    fn on_event(&mut self, event: &DecodedEvent) {
        self.apply(&PipelineEvent::from_decoded(event));
    }
}

/// Immutable result of a finished run.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PipelineRun {
    run_id: uuid::Uuid,
    stages: [StageState; 4],
    result: String,
    usage: Option<TokenUsage>,
    error: Option<String>,
    confirmation: Option<Confirmation>,
}

impl PipelineRun {
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    pub fn stages(&self) -> &[StageState] {
        &self.stages
    }

    pub fn stage(&self, stage: Stage) -> &StageState {
        &self.stages[stage.index()]
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn usage(&self) -> Option<&TokenUsage> {
        self.usage.as_ref()
    }

    /// Pipeline-reported error, kept even when some result text was streamed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn outcome(&self) -> RunOutcome {
        if let Some(message) = &self.error {
            return RunOutcome::Failed {
                message: message.clone(),
            };
        }
        if let Some(confirmation) = &self.confirmation {
            return RunOutcome::NeedsConfirmation(confirmation.clone());
        }
        if !self.result.is_empty() {
            return RunOutcome::Completed {
                text: self.result.clone(),
            };
        }
        RunOutcome::Empty
    }
}
