//! Typed pipeline descriptions for the SSP receiver.
//!
//! [`build`] turns a [`StreamConfig`] into an ordered list of [`Stage`]s. The
//! description stays structured until it is handed to GStreamer, where
//! [`PipelineDescription::to_launch_string`] renders it in `gst-launch-1.0`
//! syntax with every user supplied value quoted.

use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::{CodecHint, StreamConfig, StreamMode, StreamStyle};
use crate::{ReceiverError, Result};

/// Element name given to the source in preview pipelines
pub const SOURCE_NAME: &str = "src";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Source,
    Queue,
    GenericDecode,
    H264Parse,
    H264Decode,
    H265Parse,
    H265Decode,
    Convert,
    Scale,
    DisplaySink,
    AacParse,
    AacDecode,
    AudioConvert,
    AudioSink,
    H264Encode,
    Mp4Mux,
    FileSink,
}

impl StageKind {
    pub fn logical_name(&self) -> &'static str {
        match self {
            StageKind::Source => "source",
            StageKind::Queue => "queue",
            StageKind::GenericDecode => "generic-decode",
            StageKind::H264Parse => "h264-parse",
            StageKind::H264Decode => "h264-decode",
            StageKind::H265Parse => "h265-parse",
            StageKind::H265Decode => "h265-decode",
            StageKind::Convert => "convert",
            StageKind::Scale => "scale",
            StageKind::DisplaySink => "display-sink",
            StageKind::AacParse => "aac-parse",
            StageKind::AacDecode => "aac-decode",
            StageKind::AudioConvert => "audio-convert",
            StageKind::AudioSink => "audio-sink",
            StageKind::H264Encode => "h264-encode",
            StageKind::Mp4Mux => "mp4-mux",
            StageKind::FileSink => "file-sink",
        }
    }

    /// GStreamer element factory implementing this stage
    pub fn factory(&self) -> &'static str {
        match self {
            StageKind::Source => "sspsrc",
            StageKind::Queue => "queue",
            StageKind::GenericDecode => "decodebin",
            StageKind::H264Parse => "h264parse",
            StageKind::H264Decode => "avdec_h264",
            StageKind::H265Parse => "h265parse",
            StageKind::H265Decode => "avdec_h265",
            StageKind::Convert => "videoconvert",
            StageKind::Scale => "videoscale",
            StageKind::DisplaySink => "autovideosink",
            StageKind::AacParse => "aacparse",
            StageKind::AacDecode => "avdec_aac",
            StageKind::AudioConvert => "audioconvert",
            StageKind::AudioSink => "autoaudiosink",
            StageKind::H264Encode => "x264enc",
            StageKind::Mp4Mux => "mp4mux",
            StageKind::FileSink => "filesink",
        }
    }

    /// Parameter rendered without its key in the logical form
    fn positional_param(&self) -> Option<&'static str> {
        match self {
            StageKind::FileSink => Some("location"),
            _ => None,
        }
    }

    /// Every stage kind, used to report element availability
    pub fn all() -> &'static [StageKind] {
        &[
            StageKind::Source,
            StageKind::Queue,
            StageKind::GenericDecode,
            StageKind::H264Parse,
            StageKind::H264Decode,
            StageKind::H265Parse,
            StageKind::H265Decode,
            StageKind::Convert,
            StageKind::Scale,
            StageKind::DisplaySink,
            StageKind::AacParse,
            StageKind::AacDecode,
            StageKind::AudioConvert,
            StageKind::AudioSink,
            StageKind::H264Encode,
            StageKind::Mp4Mux,
            StageKind::FileSink,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    UInt(u64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::UInt(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: &'static str,
    pub value: ParamValue,
}

impl Param {
    fn string(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: ParamValue::Str(value.into()),
        }
    }

    fn uint(key: &'static str, value: impl Into<u64>) -> Self {
        Self {
            key,
            value: ParamValue::UInt(value.into()),
        }
    }

    fn boolean(key: &'static str, value: bool) -> Self {
        Self {
            key,
            value: ParamValue::Bool(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    kind: StageKind,
    name: Option<String>,
    params: Vec<Param>,
}

impl Stage {
    fn new(kind: StageKind) -> Self {
        Self {
            kind,
            name: None,
            params: Vec::new(),
        }
    }

    fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|p| p.key == key).map(|p| &p.value)
    }

    fn write_launch(&self, out: &mut String) {
        // Scale dimensions are caps, not element properties
        if self.kind == StageKind::Scale {
            out.push_str(self.kind.factory());
            out.push_str(" ! video/x-raw");
            for param in &self.params {
                out.push(',');
                out.push_str(param.key);
                out.push('=');
                out.push_str(&param.value.to_string());
            }
            return;
        }

        out.push_str(self.kind.factory());
        for param in &self.params {
            out.push(' ');
            out.push_str(param.key);
            out.push('=');
            out.push_str(&quote_launch_value(&param.value.to_string()));
        }
        if let Some(ref name) = self.name {
            out.push_str(" name=");
            out.push_str(&quote_launch_value(name));
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.logical_name())?;
        if self.params.is_empty() {
            return Ok(());
        }

        let positional = self.kind.positional_param();
        f.write_str("(")?;
        for (idx, param) in self.params.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            if Some(param.key) == positional {
                write!(f, "{}", param.value)?;
            } else {
                write!(f, "{}={}", param.key, param.value)?;
            }
        }
        f.write_str(")")
    }
}

/// Linear processing graph from the camera source to a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDescription {
    stages: Vec<Stage>,
}

impl PipelineDescription {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.kind.logical_name()).collect()
    }

    /// Element factories the description needs, without duplicates
    pub fn factories(&self) -> Vec<&'static str> {
        let mut factories: Vec<&'static str> = Vec::new();
        for stage in &self.stages {
            let factory = stage.kind.factory();
            if !factories.contains(&factory) {
                factories.push(factory);
            }
        }
        factories
    }

    /// Render in `gst-launch-1.0` syntax for `gst::parse::launch`
    pub fn to_launch_string(&self) -> String {
        let mut out = String::new();
        for (idx, stage) in self.stages.iter().enumerate() {
            if idx > 0 {
                out.push_str(" ! ");
            }
            stage.write_launch(&mut out);
        }
        out
    }
}

impl fmt::Display for PipelineDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, stage) in self.stages.iter().enumerate() {
            if idx > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}

fn quote_launch_value(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-/:+@%~".contains(c));
    if plain {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn source(config: &StreamConfig, mode: StreamMode) -> Stage {
    let mut stage = Stage::new(StageKind::Source)
        .with_param(Param::string("ip", config.address()))
        .with_param(Param::uint("port", config.port()))
        .with_param(Param::string("mode", mode.as_str()));

    if config.stream_style() != StreamStyle::Default {
        stage = stage.with_param(Param::string(
            "stream-style",
            config.stream_style().as_str(),
        ));
    }
    if let Some(buffer_size) = config.buffer_size() {
        stage = stage.with_param(Param::uint("buffer-size", buffer_size));
    }
    if config.hlg() {
        stage = stage.with_param(Param::boolean("is-hlg", true));
    }
    stage
}

fn scale(config: &StreamConfig) -> Stage {
    let (width, height) = config.preview_size();
    Stage::new(StageKind::Scale)
        .with_param(Param::uint("width", width))
        .with_param(Param::uint("height", height))
}

fn file_sink(output: &Path) -> Result<Stage> {
    // filesink takes a UTF-8 location, a lossy rendering would name another file
    let location = output.to_str().ok_or_else(|| {
        ReceiverError::ConfigError(format!(
            "output path is not valid UTF-8: {}",
            output.display()
        ))
    })?;
    Ok(Stage::new(StageKind::FileSink).with_param(Param::string("location", location)))
}

fn preview(config: &StreamConfig) -> Result<Vec<Stage>> {
    let stages = match config.mode() {
        StreamMode::Video => {
            let mut stages =
                vec![source(config, StreamMode::Video).with_name(SOURCE_NAME)];
            match config.codec() {
                CodecHint::Auto => {
                    stages.push(Stage::new(StageKind::Queue));
                    stages.push(Stage::new(StageKind::GenericDecode));
                }
                CodecHint::H264 => {
                    stages.push(Stage::new(StageKind::H264Parse));
                    stages.push(Stage::new(StageKind::H264Decode));
                }
                CodecHint::H265 => {
                    stages.push(Stage::new(StageKind::H265Parse));
                    stages.push(Stage::new(StageKind::H265Decode));
                }
            }
            stages.push(Stage::new(StageKind::Convert));
            stages.push(scale(config));
            stages.push(Stage::new(StageKind::DisplaySink));
            stages
        }
        StreamMode::Audio => vec![
            source(config, StreamMode::Audio).with_name(SOURCE_NAME),
            Stage::new(StageKind::AacParse),
            Stage::new(StageKind::AacDecode),
            Stage::new(StageKind::AudioConvert),
            Stage::new(StageKind::AudioSink),
        ],
        StreamMode::Both => {
            return Err(ReceiverError::UnsupportedCombination(
                "combined video+audio preview not implemented".to_string(),
            ));
        }
    };
    Ok(stages)
}

fn recording(config: &StreamConfig, output: &Path) -> Result<Vec<Stage>> {
    let sink = file_sink(output)?;
    let stages = match config.mode() {
        StreamMode::Audio => vec![
            source(config, StreamMode::Audio),
            Stage::new(StageKind::AacParse),
            sink,
        ],
        mode => {
            if mode == StreamMode::Both {
                warn!("Combined video+audio recording is not supported, recording video only");
            }
            vec![
                source(config, StreamMode::Video),
                Stage::new(StageKind::Queue),
                Stage::new(StageKind::GenericDecode),
                Stage::new(StageKind::Convert),
                Stage::new(StageKind::H264Encode),
                Stage::new(StageKind::Mp4Mux),
                sink,
            ]
        }
    };
    Ok(stages)
}

/// Build the description for a preview (`output == None`) or a recording.
///
/// Pure: nothing here touches the network or the filesystem.
pub fn build(config: &StreamConfig, output: Option<&Path>) -> Result<PipelineDescription> {
    let stages = match output {
        None => preview(config)?,
        Some(path) => recording(config, path)?,
    };
    let description = PipelineDescription { stages };
    debug!("Built pipeline description: {}", description);
    Ok(description)
}
