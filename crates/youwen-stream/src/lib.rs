//! Client engine for the multi-stage prompt enhancement pipeline.
//!
//! The backend answers one POST with an event stream. This crate frames the raw
//! bytes, decodes each payload, and folds the events into a per-stage status model
//! plus a single accumulated result.
//!
//! ```no_run
//! use youwen_stream::{ClientConfig, DecodedEvent, EnhanceRequest, SseClient};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), youwen_stream::StreamError> {
//! let client = SseClient::new(ClientConfig::new("http://localhost:8080").bearer_token("CODE"))?;
//! let mut on_event = |event: &DecodedEvent| eprintln!("{}", event.event);
//! let run = client
//!     .enhance(&EnhanceRequest::new("write a crawler"), &mut on_event)
//!     .await?;
//! println!("{}", run.result());
//! # Ok(())
//! # }
//! ```

/// HTTP transport for streaming responses.
pub mod client;
/// Environment and `.env` settings.
pub mod config;
pub mod errors;
/// Typed pipeline events.
pub mod event;
pub mod frame;
pub mod observability;
pub mod payload;
/// Stage state machine and the frozen run aggregate.
pub mod pipeline;
/// Enhancement request body.
pub mod request;
pub mod skills;
pub mod version;

pub use client::{ClientConfig, SseClient};
pub use config::{EnhanceMode, Settings};
pub use errors::StreamError;
pub use event::{PipelineEvent, Stage, TokenUsage};
pub use frame::{Frame, FrameDecoder};
pub use payload::DecodedEvent;
pub use pipeline::{
    Confirmation, EventSink, PipelineMachine, PipelineRun, RunOutcome, StageState, StageStatus,
};
pub use request::{AgentConfig, EnhanceRequest, SkillDescriptor};
