//! # Restoreflow
//!
//! A sequential artifact analysis workflow. One uploaded photograph flows
//! through four stages, each reading what the earlier ones left in a shared
//! per-run context:
//!
//! - **Vision**: identifies the artifact, its materials and its condition
//! - **Restoration**: produces a restored image, falling back to local
//!   enhancement when no image generator is available
//! - **Historical**: writes the historical and cultural background
//! - **Environmental**: projects degradation over a time span with a linear
//!   per-material model and asks for conservation recommendations
//!
//! Vision, historical and environmental failures halt the run. A restoration
//! failure is recorded as a warning and the run continues.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use restoreflow::prelude::*;
//!
//! let config = ProviderConfig::from_env()?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//!
//! let result = orchestrator
//!     .process_image("bust.jpg", RestorationLevel::Medium, 20)
//!     .await?;
//! println!("{}", result.status);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod capabilities;
pub mod config;
pub mod context;
pub mod core;
pub mod degradation;
pub mod errors;
pub mod events;
pub mod parsing;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::capabilities::{
        CapabilityError, CapabilitySet, ImageCapability, ImageInput, TextCapability,
        TextRequest, VisionCapability,
    };
    pub use crate::config::{GeminiConfig, OpenAiConfig, ProviderConfig, Temperatures};
    pub use crate::context::{MessageRole, WorkflowContext};
    pub use crate::core::{
        FailureKind, RestorationLevel, RestorationMethod, StageId, StageResult, StageStatus,
        WorkflowRequest, WorkflowResult, WorkflowStatus,
    };
    pub use crate::degradation::{predict, ConditionBand, DegradationPrediction};
    pub use crate::errors::{InvariantViolation, WorkflowError};
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, WorkflowEvent,
    };
    pub use crate::pipeline::Orchestrator;
    pub use crate::stages::Stage;
    pub use crate::utils::Timestamp;
}
