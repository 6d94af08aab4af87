// Business rules - trim parameters, naming and media types

use std::path::Path;

use crate::domain::errors::DomainError;
use crate::domain::model::{IntakeVideo, TRAILING_TRIM_SECONDS};

/// Suffix appended to the stem of the original file name
pub const DOWNLOAD_SUFFIX: &str = "_trimmed";

/// Media type used when neither the extension nor the intake declares one
pub const DEFAULT_MEDIA_TYPE: &str = "video/mp4";

const DEFAULT_EXTENSION: &str = "mp4";

/// Compute the output time limit for a probed duration
pub fn trim_limit(duration: f64) -> Result<f64, DomainError> {
    let limit = duration - TRAILING_TRIM_SECONDS;
    if !limit.is_finite() || limit <= 0.0 {
        return Err(DomainError::TooShort {
            duration,
            minimum: TRAILING_TRIM_SECONDS,
        });
    }
    Ok(limit)
}

/// Format seconds as a plain decimal string ("7", "1.5"), never in exponent form
pub fn format_seconds(seconds: f64) -> String {
    format!("{}", seconds)
}

/// Stem and extension of a file name; a bare `.mp4` is all extension
fn split_name(name: &str) -> (String, Option<String>) {
    let base = Path::new(name)
        .file_name()
        .map(|base| base.to_string_lossy().to_string())
        .unwrap_or_default();
    if let Some(ext) = base.strip_prefix('.').filter(|ext| !ext.is_empty() && !ext.contains('.')) {
        return (String::new(), Some(ext.to_string()));
    }

    let path = Path::new(&base);
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_string())
        .filter(|ext| !ext.is_empty());
    (stem, ext)
}

/// Lower-cased extension of a file name, if any
pub fn extension_of(name: &str) -> Option<String> {
    split_name(name).1.map(|ext| ext.to_lowercase())
}

/// Derive the media type from a file name, falling back to the declared one
pub fn media_type_for(name: &str, declared: &str) -> String {
    let known = extension_of(name).and_then(|ext| match ext.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "mov" => Some("video/quicktime"),
        "mkv" => Some("video/x-matroska"),
        "avi" => Some("video/x-msvideo"),
        "3gp" => Some("video/3gpp"),
        _ => None,
    });

    match known {
        Some(media_type) => media_type.to_string(),
        None if !declared.trim().is_empty() => declared.trim().to_string(),
        None => DEFAULT_MEDIA_TYPE.to_string(),
    }
}

/// Suggested download name: original stem, fixed suffix, original extension
pub fn download_name(original: &str) -> String {
    let (stem, ext) = split_name(original);
    let stem = if stem.is_empty() { "video".to_string() } else { stem };

    match ext {
        Some(ext) => format!("{}{}.{}", stem, DOWNLOAD_SUFFIX, ext),
        None => format!("{}{}", stem, DOWNLOAD_SUFFIX),
    }
}

/// Everything the orchestrator needs to drive one engine invocation
#[derive(Debug, Clone, PartialEq)]
pub struct TrimPlan {
    pub input_name: String,
    pub output_name: String,
    pub limit: f64,
    pub args: Vec<String>,
}

impl TrimPlan {
    /// Build the plan for a validated video
    pub fn for_video(video: &IntakeVideo) -> Result<Self, DomainError> {
        let limit = trim_limit(video.duration)?;
        let extension = workspace_extension(&video.file.name);
        let input_name = format!("input.{}", extension);
        let output_name = format!("output.{}", extension);
        let args = invocation_args(&input_name, limit, &output_name);

        Ok(Self {
            input_name,
            output_name,
            limit,
            args,
        })
    }

    /// Workspace entries this plan creates
    pub fn staged_names(&self) -> [&str; 2] {
        [&self.input_name, &self.output_name]
    }
}

/// Engine argument list: stream copy with timestamps normalized to zero
pub fn invocation_args(input: &str, limit: f64, output: &str) -> Vec<String> {
    vec![
        "-i".to_string(),
        input.to_string(),
        "-t".to_string(),
        format_seconds(limit),
        "-c".to_string(),
        "copy".to_string(),
        "-avoid_negative_ts".to_string(),
        "make_zero".to_string(),
        output.to_string(),
    ]
}

/// Extension for staged entries; restricted to a safe alphabet
fn workspace_extension(name: &str) -> String {
    extension_of(name)
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
