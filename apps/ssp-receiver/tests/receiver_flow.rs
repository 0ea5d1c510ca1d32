use ssp_receiver::{
    config::{Config, Overrides},
    gst_utils,
    pipeline,
    receiver::Receiver,
    CodecHint, ReceiverError, StreamConfig, StreamMode,
};
use std::path::Path;
use std::process::Command;
use tokio_util::sync::CancellationToken;

fn init_test_environment() {
    gst::init().ok();

    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

fn receiver_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ssp-receiver"))
}

#[test]
fn test_audio_recording_from_overrides() {
    let mut config = Config::default();
    config.apply_overrides(Overrides {
        ip: Some("192.168.1.50".to_string()),
        mode: Some(StreamMode::Audio),
        ..Default::default()
    });

    let stream = config.stream_config().unwrap();
    let description = pipeline::build(&stream, Some(Path::new("out.aac"))).unwrap();
    assert_eq!(
        description.to_string(),
        "source(ip=192.168.1.50, port=9999, mode=audio) -> aac-parse -> file-sink(out.aac)"
    );
}

#[test]
fn test_recording_without_source_element_fails() {
    init_test_environment();
    if gst_utils::has_element("sspsrc") {
        return;
    }

    let stream =
        StreamConfig::new("192.168.1.50", 9999, StreamMode::Audio, CodecHint::Auto).unwrap();
    let dir = tempfile::TempDir::new().unwrap();
    let output = dir.path().join("out.aac");

    let result = Receiver::new(stream, CancellationToken::new()).start_recording(&output);
    let err = result.unwrap_err();
    assert!(matches!(err, ReceiverError::MissingElements(_)));
    assert!(err.to_string().starts_with("Failed to start pipeline"));
    // Nothing ran, so nothing was written
    assert!(!output.exists());
}

#[test]
fn test_cli_audio_recording_exit_code() {
    init_test_environment();
    if gst_utils::has_element("sspsrc") {
        return;
    }

    let dir = tempfile::TempDir::new().unwrap();
    let output = dir.path().join("out.aac");

    let result = receiver_bin()
        .args(["--ip", "192.168.1.50", "--mode", "audio", "--record"])
        .arg(&output)
        .env_remove("SSP_CAMERA_IP")
        .env_remove("SSP_CAMERA_PORT")
        .output()
        .unwrap();

    assert_eq!(result.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&result.stdout);
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stdout.contains("Recording audio from 192.168.1.50:9999"));
    assert!(stdout.contains("Pipeline: sspsrc ip=192.168.1.50 port=9999 mode=audio ! aacparse ! filesink location="));
    assert_eq!(stderr.matches("Failed to start pipeline").count(), 1);
    assert!(!stdout.contains("Failed to start pipeline"));
    assert!(stdout.contains("Failed to start receiver"));
}

#[test]
fn test_cli_combined_preview_exit_code() {
    let result = receiver_bin()
        .args(["--ip", "192.168.1.50", "--mode", "both"])
        .env_remove("SSP_CAMERA_IP")
        .env_remove("SSP_CAMERA_PORT")
        .output()
        .unwrap();

    assert_eq!(result.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Combined video+audio preview not implemented"));
    assert!(!stdout.contains("Pipeline:"));
}

#[test]
fn test_cli_rejects_invalid_arguments() {
    let bad_mode = receiver_bin()
        .args(["--ip", "192.168.1.50", "--mode", "stereo"])
        .output()
        .unwrap();
    assert_eq!(bad_mode.status.code(), Some(2));

    let bad_port = receiver_bin()
        .args(["--ip", "192.168.1.50", "--port", "0"])
        .output()
        .unwrap();
    assert_eq!(bad_port.status.code(), Some(2));
}

#[test]
fn test_cli_requires_address() {
    let result = receiver_bin()
        .env_remove("SSP_CAMERA_IP")
        .output()
        .unwrap();
    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("camera address is required"));
}
