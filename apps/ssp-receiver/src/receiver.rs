//! Preview and record flows.
//!
//! Each flow builds its description, checks the registry, starts the
//! pipeline and blocks on a [`RunLoop`] until the stream ends, fails or the
//! interrupt token is cancelled. Failures to set up or start the pipeline
//! come back as [`ReceiverError`]; an error posted while running ends the
//! run in order and is returned as [`RunOutcome::Error`]. Mapping either to
//! an exit status is left to the caller.

use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::StreamConfig;
use crate::gst_utils;
use crate::lifecycle::Controller;
use crate::pipeline::{self, PipelineDescription};
use crate::run_loop::{RunLoop, RunOutcome, DEFAULT_POLL_INTERVAL};
use crate::{ReceiverError, Result};

pub struct Receiver {
    config: StreamConfig,
    interrupt: CancellationToken,
    poll_interval: Duration,
}

impl Receiver {
    pub fn new(config: StreamConfig, interrupt: CancellationToken) -> Self {
        Self {
            config,
            interrupt,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn start_preview(&self) -> Result<RunOutcome> {
        println!(
            "Starting {} preview from {}:{} (codec: {})",
            self.config.mode(),
            self.config.address(),
            self.config.port(),
            self.config.codec()
        );

        let description = match pipeline::build(&self.config, None) {
            Ok(description) => description,
            Err(err @ ReceiverError::UnsupportedCombination(_)) => {
                println!("Combined video+audio preview not implemented");
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        self.run(&description, "Pipeline started. Press Ctrl+C to stop.")
    }

    pub fn start_recording(&self, output: &Path) -> Result<RunOutcome> {
        println!(
            "Recording {} from {}:{} to {}",
            self.config.mode(),
            self.config.address(),
            self.config.port(),
            output.display()
        );

        let description = pipeline::build(&self.config, Some(output))?;
        self.run(&description, "Recording started. Press Ctrl+C to stop.")
    }

    fn run(&self, description: &PipelineDescription, banner: &str) -> Result<RunOutcome> {
        println!("Pipeline: {}", description.to_launch_string());
        info!("Pipeline stages: {}", description);

        gst_utils::verify_elements(description)?;
        self.run_launch(&description.to_launch_string(), banner)
    }

    pub(crate) fn run_launch(&self, launch: &str, banner: &str) -> Result<RunOutcome> {
        let mut run_loop =
            RunLoop::new(self.interrupt.clone()).with_poll_interval(self.poll_interval);
        let mut controller = Controller::with_run_loop(&run_loop);

        controller.start_launch(launch)?;
        println!("{}", banner);

        let outcome = controller.run(&mut run_loop)?;
        match outcome {
            RunOutcome::Error { ref message, .. } => {
                warn!("Receiver stopped on pipeline error: {}", message)
            }
            _ => info!("Receiver finished: {:?}", outcome),
        }
        Ok(outcome)
    }
}
