use gst::prelude::*;
use gst::MessageView;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::pipeline::PipelineDescription;
use crate::run_loop::{RunLoop, RunOutcome};
use crate::{ReceiverError, Result};

/// Lifecycle state of a [`Controller`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// A parsed pipeline together with its bus.
///
/// Dropping the handle always returns the pipeline to `Null`.
#[derive(Debug)]
pub struct PipelineHandle {
    pipeline: gst::Pipeline,
    bus: gst::Bus,
    launch: String,
}

impl PipelineHandle {
    fn parse(launch: &str) -> Result<Self> {
        let element = gst::parse::launch(launch)?;
        let pipeline = match element.downcast::<gst::Pipeline>() {
            Ok(pipeline) => pipeline,
            Err(element) => {
                // A single element description is not wrapped by the parser
                let pipeline = gst::Pipeline::builder().name("ssp-receiver").build();
                pipeline.add(&element)?;
                pipeline
            }
        };

        let bus = pipeline.bus().ok_or_else(|| {
            ReceiverError::StartError("Failed to get pipeline bus".to_string())
        })?;

        Ok(Self {
            pipeline,
            bus,
            launch: launch.to_string(),
        })
    }

    pub fn gst_pipeline(&self) -> &gst::Pipeline {
        &self.pipeline
    }

    pub fn bus(&self) -> &gst::Bus {
        &self.bus
    }

    pub fn launch(&self) -> &str {
        &self.launch
    }

    pub fn current_state(&self) -> gst::State {
        self.pipeline.current_state()
    }

    fn shutdown(&self) {
        if let Err(err) = self.pipeline.set_state(gst::State::Null) {
            warn!("Failed to set pipeline to Null: {:?}", err);
        }
    }

    /// First error posted on the bus, used to explain a failed start
    fn pending_error(&self) -> Option<String> {
        let msg = self.bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            MessageView::Error(err) => Some(match err.debug() {
                Some(debug) => format!("{} ({})", err.error(), debug),
                None => err.error().to_string(),
            }),
            _ => None,
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        debug!("Dropping pipeline handle");
        self.shutdown();
    }
}

/// Owns the single live pipeline of a receiver flow and moves it through
/// `Idle -> Starting -> Running -> Stopping -> Idle`.
#[derive(Debug)]
pub struct Controller {
    state: ControllerState,
    handle: Option<PipelineHandle>,
    quit: Option<CancellationToken>,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Idle,
            handle: None,
            quit: None,
        }
    }

    /// Controller whose `stop` also ends the given run loop
    pub fn with_run_loop(run_loop: &RunLoop) -> Self {
        let mut controller = Self::new();
        controller.quit = Some(run_loop.quit_token());
        controller
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn handle(&self) -> Option<&PipelineHandle> {
        self.handle.as_ref()
    }

    pub fn start(&mut self, description: &PipelineDescription) -> Result<&PipelineHandle> {
        self.start_launch(&description.to_launch_string())
    }

    /// Parse `launch` and bring it to `Playing`.
    ///
    /// On failure nothing stays allocated and the controller is `Idle` again.
    pub fn start_launch(&mut self, launch: &str) -> Result<&PipelineHandle> {
        if self.handle.is_some() {
            return Err(ReceiverError::AlreadyRunning);
        }

        self.state = ControllerState::Starting;
        info!("Starting pipeline: {}", launch);

        let handle = match PipelineHandle::parse(launch) {
            Ok(handle) => handle,
            Err(err) => {
                error!("Failed to create pipeline: {}", err);
                self.state = ControllerState::Idle;
                return Err(err);
            }
        };

        if let Err(err) = handle.pipeline.set_state(gst::State::Playing) {
            let detail = handle
                .pending_error()
                .unwrap_or_else(|| format!("{:?}", err));
            error!("Failed to start pipeline: {}", detail);
            drop(handle);
            self.state = ControllerState::Idle;
            return Err(ReceiverError::StartError(detail));
        }

        self.state = ControllerState::Running;
        let handle = self.handle.insert(handle);
        Ok(&*handle)
    }

    /// Drain the live pipeline's bus on `run_loop`, then stop.
    pub fn run(&mut self, run_loop: &mut RunLoop) -> Result<RunOutcome> {
        let bus = match self.handle {
            Some(ref handle) => handle.bus.clone(),
            None => {
                return Err(ReceiverError::StartError(
                    "no pipeline is running".to_string(),
                ));
            }
        };

        let outcome = run_loop.run(&bus);
        debug!("Run finished: {:?}", outcome);
        self.stop();
        Ok(outcome)
    }

    /// Set the pipeline to `Null` and release it.
    ///
    /// Safe to call any number of times; returns `true` only for the call
    /// that released a pipeline.
    pub fn stop(&mut self) -> bool {
        if let Some(ref quit) = self.quit {
            quit.cancel();
        }

        let Some(handle) = self.handle.take() else {
            self.state = ControllerState::Idle;
            return false;
        };

        self.state = ControllerState::Stopping;
        info!("Stopping pipeline");
        handle.shutdown();
        drop(handle);
        self.state = ControllerState::Idle;
        true
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}
