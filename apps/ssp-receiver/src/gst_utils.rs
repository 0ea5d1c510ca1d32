use gst::prelude::*;
use tracing::{debug, error, info};

use crate::pipeline::{PipelineDescription, StageKind};
use crate::{ReceiverError, Result};

/// Initialize GStreamer with error handling and logging
pub fn initialize() -> Result<()> {
    info!("Initializing GStreamer");

    gst::init().map_err(|e| {
        error!("Failed to initialize GStreamer: {}", e);
        ReceiverError::ConfigError(format!("GStreamer initialization failed: {}", e))
    })?;

    let (major, minor, micro, nano) = gst::version();
    info!("GStreamer version: {}.{}.{}.{}", major, minor, micro, nano);

    if let Ok(debug_str) = std::env::var("GST_DEBUG") {
        debug!("GST_DEBUG set to: {}", debug_str);
    }

    // sspsrc usually lives outside the system plugin directories
    if let Ok(plugin_path) = std::env::var("GST_PLUGIN_PATH") {
        info!("Using custom GST_PLUGIN_PATH: {}", plugin_path);
    }

    Ok(())
}

pub fn has_element(factory: &str) -> bool {
    gst::ElementFactory::find(factory).is_some()
}

/// Fail early, before anything is started, when the registry lacks an
/// element the description needs.
pub fn verify_elements(description: &PipelineDescription) -> Result<()> {
    let mut missing = Vec::new();

    for factory in description.factories() {
        match gst::ElementFactory::find(factory) {
            Some(found) => debug!("Found element: {} (rank: {:?})", factory, found.rank()),
            None => {
                error!("Missing element: {}", factory);
                missing.push(factory.to_string());
            }
        }
    }

    if !missing.is_empty() {
        return Err(ReceiverError::MissingElements(missing));
    }
    Ok(())
}

/// Print element availability for every stage the receiver can build
/// (for the --check-plugins flag)
pub fn print_plugin_info() {
    println!("\nGStreamer Plugin Discovery Report");
    println!("==================================");

    let (major, minor, micro, nano) = gst::version();
    println!("\nGStreamer Version: {}.{}.{}.{}", major, minor, micro, nano);

    if let Ok(plugin_path) = std::env::var("GST_PLUGIN_PATH") {
        println!("Custom Plugin Path: {}", plugin_path);
    }

    println!("\nElements:");
    for kind in StageKind::all() {
        let status = if has_element(kind.factory()) {
            "✓"
        } else {
            "✗"
        };
        println!("  {} {:<14} ({})", status, kind.factory(), kind.logical_name());
    }

    let registry = gst::Registry::get();
    println!("\nRegistry Statistics:");
    println!("  Total Plugins: {}", registry.plugins().len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CodecHint, StreamConfig, StreamMode};
    use crate::pipeline;
    use std::path::Path;

    #[test]
    fn test_gstreamer_initialization() {
        let result = initialize();
        assert!(result.is_ok(), "GStreamer initialization failed: {:?}", result);
        assert!(has_element("fakesink"));
        assert!(!has_element("no-such-element-for-ssp-tests"));
    }

    #[test]
    fn test_missing_source_is_reported() {
        initialize().unwrap();
        if has_element("sspsrc") {
            return;
        }

        let config =
            StreamConfig::new("192.168.1.50", 9999, StreamMode::Audio, CodecHint::Auto).unwrap();
        let description = pipeline::build(&config, Some(Path::new("out.aac"))).unwrap();
        match verify_elements(&description) {
            Err(ReceiverError::MissingElements(missing)) => {
                assert!(missing.contains(&"sspsrc".to_string()));
            }
            other => panic!("expected missing elements, got {:?}", other),
        }
    }
}
