//! Local file selection: validation, size formatting and the rough duration
//! heuristic shown before upload.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use shared::{
    domain::{AudioFormat, DEFAULT_BITRATE_KBPS},
    error::ValidationError,
};
use tracing::info;

/// Estimated duration above which an advisory is surfaced.
pub const ADVISORY_THRESHOLD_MINUTES: f64 = 5.0;
const PROCESSING_TIME_FACTOR: f64 = 0.8;

/// A file as reported by a picker or a drop target, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    pub mime: Option<String>,
}

impl LocalFile {
    /// Reads metadata and guesses the MIME type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("failed to read metadata for '{}'", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Ok(Self {
            path: path.to_path_buf(),
            name,
            size_bytes: metadata.len(),
            mime,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    pub mime: Option<String>,
    pub format: AudioFormat,
}

impl StagedFile {
    /// MIME sent with the multipart part: the reported one when recognized,
    /// otherwise the canonical type of the resolved format.
    pub fn upload_mime(&self) -> &str {
        match self.mime.as_deref() {
            Some(mime) if AudioFormat::from_mime(mime).is_some() => mime,
            _ => self.format.mime(),
        }
    }

    pub fn size_text(&self) -> String {
        format_file_size(self.size_bytes)
    }

    pub fn estimated_minutes(&self) -> f64 {
        estimate_duration_minutes(self.size_bytes, self.mime.as_deref(), &self.name)
    }

    pub fn advisory(&self) -> Option<Advisory> {
        Advisory::for_duration(self.estimated_minutes())
    }
}

/// Non-blocking warning about a long expected processing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advisory {
    pub estimated_minutes: u64,
    pub processing_minutes: u64,
}

impl Advisory {
    pub fn for_duration(duration_minutes: f64) -> Option<Self> {
        if duration_minutes <= ADVISORY_THRESHOLD_MINUTES {
            return None;
        }
        Some(Self {
            estimated_minutes: duration_minutes.round() as u64,
            processing_minutes: (duration_minutes * PROCESSING_TIME_FACTOR).ceil() as u64,
        })
    }

    pub fn message(&self) -> String {
        format!(
            "This file looks long (about {} min). Processing could take up to {} minutes.",
            self.estimated_minutes, self.processing_minutes
        )
    }
}

/// Validates a local file for upload.
///
/// The type check accepts either a recognized MIME type or a recognized
/// extension; the size check applies regardless of type.
pub fn stage(file: LocalFile) -> Result<StagedFile, ValidationError> {
    let format = file
        .mime
        .as_deref()
        .and_then(AudioFormat::from_mime)
        .or_else(|| AudioFormat::from_file_name(&file.name));
    let Some(format) = format else {
        return Err(ValidationError::UnsupportedType {
            name: file.name,
            mime: file.mime,
        });
    };
    if let Some(err) = ValidationError::too_large(file.size_bytes) {
        return Err(err);
    }

    info!(
        name = %file.name,
        size_bytes = file.size_bytes,
        format = format.extension(),
        "staged audio file"
    );
    Ok(StagedFile {
        path: file.path,
        name: file.name,
        size_bytes: file.size_bytes,
        mime: file.mime,
        format,
    })
}

/// Base-1024 size with at most two decimals: `1536` → `"1.5 KB"`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    while unit + 1 < UNITS.len() && bytes >= 1024u64.pow(unit as u32 + 1) {
        unit += 1;
    }
    let value = bytes as f64 / 1024u64.pow(unit as u32) as f64;
    let text = format!("{value:.2}");
    let compact = text.trim_end_matches('0').trim_end_matches('.');
    format!("{compact} {}", UNITS[unit])
}

/// Rough duration in minutes from size and a typical bitrate for the format.
/// No container parsing is attempted.
pub fn estimate_duration_minutes(size_bytes: u64, mime: Option<&str>, name: &str) -> f64 {
    let bitrate_kbps = mime
        .and_then(AudioFormat::from_mime)
        .or_else(|| AudioFormat::from_file_name(name))
        .map(AudioFormat::typical_bitrate_kbps)
        .unwrap_or(DEFAULT_BITRATE_KBPS);
    let bytes_per_second = f64::from(bitrate_kbps) * 125.0;
    size_bytes as f64 / bytes_per_second / 60.0
}

#[cfg(test)]
#[path = "tests/staging_tests.rs"]
mod tests;
