pub mod config;
pub mod events;
pub mod gst_utils;
pub mod lifecycle;
pub mod pipeline;
pub mod receiver;
pub mod run_loop;
pub mod signals;

// Re-export commonly used types
pub use config::{CodecHint, Config, StreamConfig, StreamMode, StreamStyle};
pub use lifecycle::{Controller, ControllerState, PipelineHandle};
pub use pipeline::{build, PipelineDescription};
pub use run_loop::{RunLoop, RunOutcome};

// Common error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReceiverError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported combination: {0}")]
    UnsupportedCombination(String),

    #[error("Failed to create pipeline: {0}")]
    ParseError(#[from] gst::glib::Error),

    #[error("Failed to start pipeline: {0}")]
    StartError(String),

    #[error("Pipeline error: {message} ({})", .debug.as_deref().unwrap_or("no debug info"))]
    RuntimeError {
        message: String,
        debug: Option<String>,
    },

    #[error("A pipeline is already running")]
    AlreadyRunning,

    #[error("GStreamer boolean error: {0}")]
    GstBoolError(#[from] gst::glib::BoolError),

    #[error("Failed to start pipeline: missing GStreamer elements: {}", .0.join(", "))]
    MissingElements(Vec<String>),
}

pub type Result<T> = std::result::Result<T, ReceiverError>;
