//! Sequential workflow orchestrator.

use super::WorkflowState;
use crate::capabilities::CapabilitySet;
use crate::config::Temperatures;
use crate::context::WorkflowContext;
use crate::core::{RestorationLevel, StageId, WorkflowRequest, WorkflowResult, WorkflowStatus};
use crate::errors::WorkflowError;
use crate::events::{EventSink, NoOpEventSink, WorkflowEvent};
use crate::stages::{EnvironmentalStage, HistoricalStage, RestorationStage, Stage, VisionStage};
use crate::utils::{elapsed_ms, now_utc};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Runs the four stages in order against a per-run context.
///
/// The orchestrator holds no per-run state, so one instance may serve
/// concurrent runs.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    stages: [Arc<dyn Stage>; 4],
    sink: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Creates an orchestrator from explicit stage handlers.
    ///
    /// Handlers are bound to their slot by position, not by [`Stage::id`].
    #[must_use]
    pub fn new(
        vision: Arc<dyn Stage>,
        restoration: Arc<dyn Stage>,
        historical: Arc<dyn Stage>,
        environmental: Arc<dyn Stage>,
    ) -> Self {
        Self {
            stages: [vision, restoration, historical, environmental],
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Creates the standard stages over `capabilities`.
    #[must_use]
    pub fn from_capabilities(capabilities: &CapabilitySet, temperatures: Temperatures) -> Self {
        Self::new(
            Arc::new(VisionStage::new(capabilities.vision.clone())),
            Arc::new(RestorationStage::new(
                capabilities.text.clone(),
                capabilities.image.clone(),
                temperatures.restoration,
            )),
            Arc::new(HistoricalStage::new(
                capabilities.text.clone(),
                temperatures.historical,
            )),
            Arc::new(EnvironmentalStage::new(
                capabilities.text.clone(),
                temperatures.environmental,
            )),
        )
    }

    /// Creates the standard stages over the HTTP adapters.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Config` if an adapter cannot be built.
    #[cfg(feature = "providers")]
    pub fn from_config(config: &crate::config::ProviderConfig) -> Result<Self, WorkflowError> {
        let capabilities = CapabilitySet::from_config(config)
            .map_err(|e| WorkflowError::config(e.to_string()))?;
        Ok(Self::from_capabilities(&capabilities, config.temperatures))
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    fn handler(&self, stage: StageId) -> &Arc<dyn Stage> {
        &self.stages[stage.position()]
    }

    /// Runs one workflow over `image_path`.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::process`].
    pub async fn process_image(
        &self,
        image_path: impl Into<PathBuf>,
        restoration_level: RestorationLevel,
        time_span_years: u32,
    ) -> Result<WorkflowResult, WorkflowError> {
        let request = WorkflowRequest::new(image_path)
            .with_restoration_level(restoration_level)
            .with_time_span(time_span_years);
        self.process(&request).await
    }

    /// Runs one workflow in a fresh context.
    ///
    /// Stage failures are reported in the returned result, never as `Err`.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvariantViolation` if a stage output is
    /// written twice in the run.
    pub async fn process(&self, request: &WorkflowRequest) -> Result<WorkflowResult, WorkflowError> {
        let mut ctx = WorkflowContext::new();
        self.process_in(&mut ctx, request).await
    }

    /// Runs one workflow in a caller-owned context, resetting it first.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::process`].
    pub async fn process_in(
        &self,
        ctx: &mut WorkflowContext,
        request: &WorkflowRequest,
    ) -> Result<WorkflowResult, WorkflowError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "workflow",
            %run_id,
            image = %request.image_path.display()
        );
        self.execute(run_id, ctx, request).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        ctx: &mut WorkflowContext,
        request: &WorkflowRequest,
    ) -> Result<WorkflowResult, WorkflowError> {
        ctx.reset();
        let started_at = now_utc();

        tracing::info!(
            restoration_level = %request.restoration_level,
            years = request.time_span_years,
            "Workflow started"
        );
        self.sink
            .emit(&WorkflowEvent::WorkflowStarted {
                run_id,
                image_path: request.image_path.display().to_string(),
                restoration_level: request.restoration_level.to_string(),
                time_span_years: request.time_span_years,
            })
            .await;

        let mut state = WorkflowState::NotStarted.begin();
        let mut executed_stages = Vec::with_capacity(StageId::ORDER.len());
        let mut stages = IndexMap::new();
        let mut error = None;
        let mut warnings = Vec::new();

        let status = loop {
            let stage = match state {
                WorkflowState::Running(stage) => stage,
                WorkflowState::Completed => break WorkflowStatus::Completed,
                WorkflowState::Failed(stage) => break WorkflowStatus::FailedAt(stage),
                WorkflowState::NotStarted => unreachable!("begin() runs before the loop"),
            };

            tracing::debug!(stage = %stage, "Stage started");
            self.sink
                .emit(&WorkflowEvent::StageStarted { run_id, stage })
                .await;

            let result = match self.handler(stage).run(ctx, request).await {
                Ok(result) => result,
                Err(violation) => {
                    tracing::error!(stage = %stage, code = violation.code(), "{violation}");
                    return Err(violation.into());
                }
            };
            debug_assert_eq!(result.stage, stage, "handler bound to the wrong slot");
            executed_stages.push(stage);

            match &result.error {
                None => {
                    tracing::info!(stage = %stage, duration_ms = result.duration_ms(), "Stage completed");
                    self.sink
                        .emit(&WorkflowEvent::StageCompleted {
                            run_id,
                            stage,
                            duration_ms: result.duration_ms(),
                        })
                        .await;
                }
                Some(stage_error) => {
                    let fatal = stage.is_fatal();
                    tracing::warn!(
                        stage = %stage,
                        kind = %stage_error.kind,
                        fatal,
                        "Stage failed: {}",
                        stage_error.message
                    );
                    self.sink
                        .emit(&WorkflowEvent::StageFailed {
                            run_id,
                            stage,
                            kind: stage_error.kind,
                            message: stage_error.message.clone(),
                            fatal,
                        })
                        .await;
                    if fatal {
                        error = Some(stage_error.message.clone());
                    } else {
                        warnings.push(format!("{stage}: {}", stage_error.message));
                    }
                }
            }

            state = state.after(result.status);
            stages.insert(stage, result);
        };

        let duration_ms = elapsed_ms(&started_at);
        match (status, &error) {
            (WorkflowStatus::FailedAt(stage), Some(message)) => {
                tracing::warn!(%status, duration_ms, "Workflow halted");
                self.sink
                    .emit(&WorkflowEvent::WorkflowFailed {
                        run_id,
                        stage,
                        error: message.clone(),
                    })
                    .await;
            }
            _ => {
                tracing::info!(%status, duration_ms, warnings = warnings.len(), "Workflow completed");
                self.sink
                    .emit(&WorkflowEvent::WorkflowCompleted {
                        run_id,
                        duration_ms,
                        warnings: warnings.len(),
                    })
                    .await;
            }
        }

        Ok(WorkflowResult {
            run_id,
            status,
            executed_stages,
            stages,
            error,
            warnings,
            context: ctx.stats(),
            started_at,
            ended_at: now_utc(),
        })
    }
}
