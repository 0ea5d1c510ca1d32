use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::{ReceiverError, Result};

pub const DEFAULT_PORT: u16 = 9999;
pub const DEFAULT_PREVIEW_WIDTH: u32 = 640;
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 480;
pub const MIN_BUFFER_SIZE: u32 = 1024;
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Which sub-streams to request from the camera
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    #[default]
    Video,
    Audio,
    Both,
}

impl StreamMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamMode::Video => "video",
            StreamMode::Audio => "audio",
            StreamMode::Both => "both",
        }
    }
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Video codec hint used to pick the preview decoder chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CodecHint {
    #[default]
    Auto,
    H264,
    H265,
}

impl CodecHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecHint::Auto => "auto",
            CodecHint::H264 => "h264",
            CodecHint::H265 => "h265",
        }
    }
}

impl fmt::Display for CodecHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Camera stream to request, mirrors the `stream-style` property of `sspsrc`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StreamStyle {
    #[default]
    Default,
    Main,
    Secondary,
}

impl StreamStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStyle::Default => "default",
            StreamStyle::Main => "main",
            StreamStyle::Secondary => "secondary",
        }
    }
}

impl fmt::Display for StreamStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated description of the camera stream to receive.
///
/// Only constructible through [`StreamConfig::new`] so every instance that
/// reaches the pipeline builder carries a usable address and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    address: String,
    port: u16,
    mode: StreamMode,
    codec: CodecHint,
    stream_style: StreamStyle,
    buffer_size: Option<u32>,
    hlg: bool,
    preview_size: (u32, u32),
}

impl StreamConfig {
    pub fn new(
        address: impl Into<String>,
        port: u16,
        mode: StreamMode,
        codec: CodecHint,
    ) -> Result<Self> {
        let address = address.into();
        validate_address(&address)?;
        if port == 0 {
            return Err(ReceiverError::ConfigError(
                "port must be between 1 and 65535".to_string(),
            ));
        }

        Ok(Self {
            address,
            port,
            mode,
            codec,
            stream_style: StreamStyle::Default,
            buffer_size: None,
            hlg: false,
            preview_size: (DEFAULT_PREVIEW_WIDTH, DEFAULT_PREVIEW_HEIGHT),
        })
    }

    pub fn with_stream_style(mut self, stream_style: StreamStyle) -> Self {
        self.stream_style = stream_style;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: u32) -> Result<Self> {
        if buffer_size < MIN_BUFFER_SIZE {
            return Err(ReceiverError::ConfigError(format!(
                "buffer size must be at least {} bytes, got {}",
                MIN_BUFFER_SIZE, buffer_size
            )));
        }
        self.buffer_size = Some(buffer_size);
        Ok(self)
    }

    pub fn with_hlg(mut self, hlg: bool) -> Self {
        self.hlg = hlg;
        self
    }

    pub fn with_preview_size(mut self, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ReceiverError::ConfigError(format!(
                "preview size must be non-zero, got {}x{}",
                width, height
            )));
        }
        self.preview_size = (width, height);
        Ok(self)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    pub fn codec(&self) -> CodecHint {
        self.codec
    }

    pub fn stream_style(&self) -> StreamStyle {
        self.stream_style
    }

    pub fn buffer_size(&self) -> Option<u32> {
        self.buffer_size
    }

    pub fn hlg(&self) -> bool {
        self.hlg
    }

    pub fn preview_size(&self) -> (u32, u32) {
        self.preview_size
    }
}

fn validate_address(address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(ReceiverError::ConfigError(
            "camera address must not be empty".to_string(),
        ));
    }
    if address.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ReceiverError::ConfigError(format!(
            "camera address contains whitespace or control characters: {:?}",
            address
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub camera: CameraConfig,
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub ip: Option<String>,
    pub port: u16,
    pub mode: StreamMode,
    pub codec: CodecHint,
    pub stream_style: StreamStyle,
    pub buffer_size: Option<u32>,
    pub hlg: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
}

/// Values given on the command line, each one replacing the file value when set
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub mode: Option<StreamMode>,
    pub codec: Option<CodecHint>,
    pub stream_style: Option<StreamStyle>,
    pub buffer_size: Option<u32>,
    pub hlg: Option<bool>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            camera: CameraConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            poll_interval_ms: 100,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            ip: None,
            port: DEFAULT_PORT,
            mode: StreamMode::default(),
            codec: CodecHint::default(),
            stream_style: StreamStyle::default(),
            buffer_size: None,
            hlg: false,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_PREVIEW_WIDTH,
            height: DEFAULT_PREVIEW_HEIGHT,
        }
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.app.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".to_string());
        }
        if self.app.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(format!(
                "poll_interval_ms must be at most {}",
                MAX_POLL_INTERVAL_MS
            ));
        }

        if self.camera.port == 0 {
            return Err("camera port must be greater than 0".to_string());
        }

        if let Some(buffer_size) = self.camera.buffer_size {
            if buffer_size < MIN_BUFFER_SIZE {
                return Err(format!(
                    "camera buffer_size must be at least {}",
                    MIN_BUFFER_SIZE
                ));
            }
        }

        if self.preview.width == 0 || self.preview.height == 0 {
            return Err("preview width and height must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReceiverError::ConfigError(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ReceiverError::ConfigError(format!(
                "Failed to read configuration file {:?}: {}",
                path, e
            ))
        })?;

        let config = Self::from_toml(&content).map_err(|e| match e {
            ReceiverError::ConfigError(msg) => ReceiverError::ConfigError(format!(
                "Invalid configuration file {:?}: {}",
                path, msg
            )),
            other => other,
        })?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| ReceiverError::ConfigError(e.to_string()))?;
        config.validate().map_err(ReceiverError::ConfigError)?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(ip) = overrides.ip {
            self.camera.ip = Some(ip);
        }
        if let Some(port) = overrides.port {
            self.camera.port = port;
        }
        if let Some(mode) = overrides.mode {
            self.camera.mode = mode;
        }
        if let Some(codec) = overrides.codec {
            self.camera.codec = codec;
        }
        if let Some(stream_style) = overrides.stream_style {
            self.camera.stream_style = stream_style;
        }
        if let Some(buffer_size) = overrides.buffer_size {
            self.camera.buffer_size = Some(buffer_size);
        }
        if let Some(hlg) = overrides.hlg {
            self.camera.hlg = hlg;
        }
        if let Some(width) = overrides.width {
            self.preview.width = width;
        }
        if let Some(height) = overrides.height {
            self.preview.height = height;
        }
    }

    pub fn stream_config(&self) -> Result<StreamConfig> {
        let address = self.camera.ip.clone().ok_or_else(|| {
            ReceiverError::ConfigError(
                "camera address is required (use --ip or set camera.ip)".to_string(),
            )
        })?;

        let mut stream = StreamConfig::new(
            address,
            self.camera.port,
            self.camera.mode,
            self.camera.codec,
        )?
        .with_stream_style(self.camera.stream_style)
        .with_hlg(self.camera.hlg)
        .with_preview_size(self.preview.width, self.preview.height)?;

        if let Some(buffer_size) = self.camera.buffer_size {
            stream = stream.with_buffer_size(buffer_size)?;
        }

        debug!("Resolved stream configuration: {:?}", stream);
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.camera.port, 9999);
        assert_eq!(config.camera.mode, StreamMode::Video);
        assert_eq!(config.camera.codec, CodecHint::Auto);
        assert_eq!(config.preview.width, 640);
        assert_eq!(config.preview.height, 480);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[app]
log_level = "debug"

[camera]
ip = "10.0.0.7"
port = 9000
mode = "audio"
stream_style = "secondary"
"#
        )
        .unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(config.app.log_level, "debug");
        assert_eq!(config.app.poll_interval_ms, 100);
        assert_eq!(config.camera.ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(config.camera.port, 9000);
        assert_eq!(config.camera.mode, StreamMode::Audio);
        assert_eq!(config.camera.codec, CodecHint::Auto);
        assert_eq!(config.camera.stream_style, StreamStyle::Secondary);
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = Config::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ReceiverError::ConfigError(_))));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.camera.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.camera.buffer_size = Some(16);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.preview.height = 0;
        assert!(config.validate().is_err());

        assert!(Config::from_toml("[camera]\nmode = \"stereo\"\n").is_err());
    }

    #[test]
    fn test_poll_interval_upper_bound() {
        let mut config = Config::default();
        config.app.poll_interval_ms = MAX_POLL_INTERVAL_MS;
        assert!(config.validate().is_ok());

        config.app.poll_interval_ms = MAX_POLL_INTERVAL_MS + 1;
        assert!(config.validate().is_err());

        let result = Config::from_toml("[app]\npoll_interval_ms = 18446744073710\n");
        assert!(matches!(result, Err(ReceiverError::ConfigError(_))));
    }

    #[test]
    fn test_hlg_can_be_turned_off() {
        let mut config = Config::from_toml("[camera]\nip = \"10.0.0.7\"\nhlg = true\n").unwrap();

        config.apply_overrides(Overrides::default());
        assert!(config.camera.hlg);

        config.apply_overrides(Overrides {
            hlg: Some(false),
            ..Default::default()
        });
        assert!(!config.stream_config().unwrap().hlg());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = Config::from_toml(
            r#"
[camera]
ip = "10.0.0.7"
port = 9000
codec = "h265"
"#,
        )
        .unwrap();

        config.apply_overrides(Overrides {
            ip: Some("192.168.1.50".to_string()),
            codec: Some(CodecHint::H264),
            width: Some(1280),
            ..Default::default()
        });

        let stream = config.stream_config().unwrap();
        assert_eq!(stream.address(), "192.168.1.50");
        assert_eq!(stream.port(), 9000);
        assert_eq!(stream.codec(), CodecHint::H264);
        assert_eq!(stream.preview_size(), (1280, 480));
    }

    #[test]
    fn test_stream_config_requires_address() {
        let config = Config::default();
        assert!(matches!(
            config.stream_config(),
            Err(ReceiverError::ConfigError(_))
        ));
    }

    #[test]
    fn test_stream_config_rejects_bad_values() {
        assert!(StreamConfig::new("", 9999, StreamMode::Video, CodecHint::Auto).is_err());
        assert!(
            StreamConfig::new("10.0.0.1 ! fakesink", 9999, StreamMode::Video, CodecHint::Auto)
                .is_err()
        );
        assert!(StreamConfig::new("10.0.0.1", 0, StreamMode::Video, CodecHint::Auto).is_err());

        let stream = StreamConfig::new("10.0.0.1", 9999, StreamMode::Video, CodecHint::Auto)
            .unwrap();
        assert!(stream.clone().with_buffer_size(512).is_err());
        assert!(stream.clone().with_preview_size(0, 480).is_err());
        assert_eq!(
            stream.with_buffer_size(4096).unwrap().buffer_size(),
            Some(4096)
        );
    }
}
