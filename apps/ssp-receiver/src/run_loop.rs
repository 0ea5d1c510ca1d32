use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::events::{self, BusEvent, Flow};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Longest bus wait between two token checks
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    EndOfStream,
    Error {
        message: String,
        debug: Option<String>,
    },
    /// The process received an interrupt signal
    Interrupted,
    /// A stop was requested through [`RunLoop::quit_token`]
    Stopped,
}

/// Blocking loop draining a pipeline bus until a terminal condition.
///
/// Two tokens end the loop early: `interrupt` is shared with the signal
/// listener, `quit` belongs to this loop and is handed to whoever owns the
/// pipeline so that stopping it also ends the run.
#[derive(Debug)]
pub struct RunLoop {
    interrupt: CancellationToken,
    quit: CancellationToken,
    poll_interval: Duration,
    running: bool,
}

impl RunLoop {
    pub fn new(interrupt: CancellationToken) -> Self {
        Self {
            interrupt,
            quit: CancellationToken::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            running: false,
        }
    }

    /// Intervals above [`MAX_POLL_INTERVAL`] are clamped to it
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.min(MAX_POLL_INTERVAL);
        self
    }

    pub fn quit_token(&self) -> CancellationToken {
        self.quit.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Dispatch bus events until end-of-stream, an error, an interrupt or a
    /// quit request. Events queued behind the first terminal one are left
    /// unprocessed.
    pub fn run(&mut self, bus: &gst::Bus) -> RunOutcome {
        self.running = true;
        let poll_ms = self.poll_interval.min(MAX_POLL_INTERVAL).as_millis() as u64;
        let poll = gst::ClockTime::from_mseconds(poll_ms);
        debug!("Run loop started (poll interval {:?})", self.poll_interval);

        let outcome = loop {
            if self.interrupt.is_cancelled() {
                info!("Run loop interrupted");
                break RunOutcome::Interrupted;
            }
            if self.quit.is_cancelled() {
                info!("Run loop stopped");
                break RunOutcome::Stopped;
            }

            let Some(msg) = bus.timed_pop(poll) else {
                continue;
            };
            let Some(event) = BusEvent::from_message(&msg) else {
                continue;
            };

            if events::dispatch(&event) == Flow::Quit {
                break match event {
                    BusEvent::Error { message, debug, .. } => RunOutcome::Error { message, debug },
                    _ => RunOutcome::EndOfStream,
                };
            }
        };

        self.running = false;
        outcome
    }
}
