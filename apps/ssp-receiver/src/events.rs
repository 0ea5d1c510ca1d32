use gst::prelude::*;
use gst::MessageView;
use tracing::{debug, error, info, warn};

/// Bus notifications the receiver reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    EndOfStream,
    Error {
        source: String,
        message: String,
        debug: Option<String>,
    },
    Warning {
        source: String,
        message: String,
        debug: Option<String>,
    },
    Info {
        source: String,
        message: String,
        debug: Option<String>,
    },
}

/// Whether the run loop keeps draining the bus after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl BusEvent {
    /// Classify a bus message, `None` for messages the receiver ignores
    pub fn from_message(msg: &gst::Message) -> Option<Self> {
        let source = || {
            msg.src()
                .map(|s| s.path_string().to_string())
                .unwrap_or_default()
        };

        match msg.view() {
            MessageView::Eos(_) => Some(BusEvent::EndOfStream),
            MessageView::Error(err) => Some(BusEvent::Error {
                source: source(),
                message: err.error().to_string(),
                debug: err.debug().map(|s| s.to_string()),
            }),
            MessageView::Warning(warning) => Some(BusEvent::Warning {
                source: source(),
                message: warning.error().to_string(),
                debug: warning.debug().map(|s| s.to_string()),
            }),
            MessageView::Info(info) => Some(BusEvent::Info {
                source: source(),
                message: info.error().to_string(),
                debug: info.debug().map(|s| s.to_string()),
            }),
            _ => None,
        }
    }

    /// Only end-of-stream and errors end a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, BusEvent::EndOfStream | BusEvent::Error { .. })
    }

    /// Console line for this event, prefixed by its category
    pub fn notice(&self) -> String {
        match self {
            BusEvent::EndOfStream => "End of stream".to_string(),
            BusEvent::Error { message, debug, .. } => {
                format!("Error: {}, {}", message, debug.as_deref().unwrap_or("None"))
            }
            BusEvent::Warning { message, debug, .. } => {
                format!("Warning: {}, {}", message, debug.as_deref().unwrap_or("None"))
            }
            BusEvent::Info { message, .. } => format!("Info: {}", message),
        }
    }
}

/// Report an event on the console and in the log, and decide whether to stop
pub fn dispatch(event: &BusEvent) -> Flow {
    match event {
        BusEvent::EndOfStream => {
            println!("{}", event.notice());
            info!("Pipeline received EOS");
        }
        BusEvent::Error {
            source,
            message,
            debug: debug_details,
        } => {
            eprintln!("{}", event.notice());
            error!("Pipeline error from {}: {} ({:?})", source, message, debug_details);
        }
        BusEvent::Warning {
            source,
            message,
            debug: debug_details,
        } => {
            eprintln!("{}", event.notice());
            warn!("Pipeline warning from {}: {} ({:?})", source, message, debug_details);
        }
        BusEvent::Info {
            source,
            message,
            debug: debug_details,
        } => {
            println!("{}", event.notice());
            info!("Pipeline info from {}: {}", source, message);
            debug!("Info debug details: {:?}", debug_details);
        }
    }

    if event.is_terminal() {
        Flow::Quit
    } else {
        Flow::Continue
    }
}
