//! ============================================================================
//! Workflow - four-stage generation state machine
//! ============================================================================
//! Linear Upload -> Style -> Generating -> Result flow with explicit Retry
//! and Reset edges. The transition function is pure; the controller is the
//! side-effect boundary that runs the single generation call and feeds its
//! outcome back in as an event.
//!
//! Progress is advisory only: a simulated counter capped below 100 until the
//! call actually settles. It must never be used to infer real completion.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::executor::StyleTransferExecutor;
use crate::types::{GeneratedImage, GenerationError, ImageRef, StyleChoice};

/// Ceiling for the simulated progress counter while the call is in flight
pub const MAX_SIMULATED_PROGRESS: u8 = 95;

/// Fixed increment applied per advisory tick
pub const PROGRESS_STEP: u8 = 5;

/// Cadence of the advisory progress counter
pub const PROGRESS_TICK_MS: u64 = 600;

/// Stage of the generation workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    Upload = 1,
    Style = 2,
    Generating = 3,
    Result = 4,
}

impl WorkflowStep {
    /// 1-based ordinal, matching the step indicator shown to users
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }
}

/// Events driving the workflow
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// Source image received (Upload stage)
    UploadImage(ImageRef),
    /// Style selection made or replaced (Style stage)
    ChooseStyle(StyleChoice),
    /// Enter Generating; guarded on image + style presence
    StartGeneration { id: Uuid },
    /// Advisory progress tick while Generating
    Tick,
    /// The generation call settled, successfully or not
    Settle {
        id: Uuid,
        outcome: Result<GeneratedImage, GenerationError>,
    },
    /// Back to Style keeping the source image (Result stage)
    Retry,
    /// Full reset to the initial state, from anywhere
    Reset,
}

/// Complete workflow state
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub step: WorkflowStep,
    pub image: Option<ImageRef>,
    pub style: Option<StyleChoice>,
    /// Advisory progress estimate, 0-100
    pub progress: u8,
    pub error: Option<String>,
    pub generated: Option<GeneratedImage>,
    /// Identity of the in-flight generation; settles carrying a different id
    /// are stale and dropped
    pub generation_id: Option<Uuid>,
}

/// Pure transition function: apply one event to a state, returning the next
/// state. Events that are not legal in the current step leave the state
/// unchanged.
pub fn apply(state: WorkflowState, event: WorkflowEvent) -> WorkflowState {
    match (state.step, event) {
        (WorkflowStep::Upload, WorkflowEvent::UploadImage(image)) => WorkflowState {
            step: WorkflowStep::Style,
            image: Some(image),
            ..state
        },

        (WorkflowStep::Style, WorkflowEvent::ChooseStyle(style)) => WorkflowState {
            style: Some(style),
            ..state
        },

        (WorkflowStep::Style, WorkflowEvent::StartGeneration { id })
            if state.image.is_some() && state.style.is_some() =>
        {
            WorkflowState {
                step: WorkflowStep::Generating,
                progress: 0,
                error: None,
                generated: None,
                generation_id: Some(id),
                ..state
            }
        }

        (WorkflowStep::Generating, WorkflowEvent::Tick) => WorkflowState {
            progress: state
                .progress
                .saturating_add(PROGRESS_STEP)
                .min(MAX_SIMULATED_PROGRESS),
            ..state
        },

        (WorkflowStep::Generating, WorkflowEvent::Settle { id, outcome })
            if state.generation_id == Some(id) =>
        {
            match outcome {
                Ok(image) => WorkflowState {
                    step: WorkflowStep::Result,
                    progress: 100,
                    generated: Some(image),
                    error: None,
                    ..state
                },
                Err(err) => WorkflowState {
                    step: WorkflowStep::Result,
                    progress: 100,
                    generated: None,
                    error: Some(err.to_string()),
                    ..state
                },
            }
        }

        (WorkflowStep::Result, WorkflowEvent::Retry) => WorkflowState {
            step: WorkflowStep::Style,
            progress: 0,
            error: None,
            generated: None,
            generation_id: None,
            ..state
        },

        (_, WorkflowEvent::Reset) => WorkflowState::default(),

        (step, event) => {
            debug!("Ignoring {:?} in step {:?}", event, step);
            state
        }
    }
}

/// Drives the workflow and owns its one asynchronous edge: the generation
/// call. Everything else goes through the pure transition function.
pub struct WorkflowController {
    state: WorkflowState,
    executor: StyleTransferExecutor,
}

impl WorkflowController {
    pub fn new(executor: StyleTransferExecutor) -> Self {
        Self {
            state: WorkflowState::default(),
            executor,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn upload_image(&mut self, image: ImageRef) {
        self.state = apply(self.state.clone(), WorkflowEvent::UploadImage(image));
    }

    pub fn choose_style(&mut self, style: StyleChoice) {
        self.state = apply(self.state.clone(), WorkflowEvent::ChooseStyle(style));
    }

    pub fn retry(&mut self) {
        self.state = apply(self.state.clone(), WorkflowEvent::Retry);
    }

    pub fn reset(&mut self) {
        self.state = apply(self.state.clone(), WorkflowEvent::Reset);
    }

    /// Whether the Style -> Generating transition is currently permitted
    pub fn can_generate(&self) -> bool {
        self.state.step == WorkflowStep::Style
            && self.state.image.is_some()
            && self.state.style.is_some()
    }

    /// Run the single generation call, ticking the advisory counter while it
    /// is in flight. `on_progress` observes every advisory update. Returns
    /// the settled state; if the guard refuses the transition the state is
    /// returned unchanged.
    ///
    /// There is no cancellation: once issued, the call runs to completion.
    /// A Reset while a call is outstanding merely changes the current
    /// generation id, so the eventual Settle is dropped as stale.
    pub async fn run_generation(&mut self, mut on_progress: impl FnMut(u8)) -> &WorkflowState {
        let id = Uuid::new_v4();
        self.state = apply(self.state.clone(), WorkflowEvent::StartGeneration { id });
        if self.state.step != WorkflowStep::Generating {
            return &self.state;
        }

        let (Some(image), Some(style)) = (self.state.image.clone(), self.state.style.clone())
        else {
            return &self.state;
        };

        let call = self.executor.transform(&image, &style);
        tokio::pin!(call);

        let mut ticker = tokio::time::interval(Duration::from_millis(PROGRESS_TICK_MS));
        // The first interval tick completes immediately; consume it so the
        // counter starts moving one cadence after submission.
        ticker.tick().await;

        let outcome = loop {
            tokio::select! {
                outcome = &mut call => break outcome,
                _ = ticker.tick() => {
                    self.state = apply(self.state.clone(), WorkflowEvent::Tick);
                    on_progress(self.state.progress);
                }
            }
        };

        self.state = apply(self.state.clone(), WorkflowEvent::Settle { id, outcome });
        on_progress(self.state.progress);
        &self.state
    }
}
