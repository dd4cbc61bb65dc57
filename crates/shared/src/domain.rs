use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest payload the upload endpoint accepts (100 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Bitrate assumed when neither MIME type nor extension names a known format.
pub const DEFAULT_BITRATE_KBPS: u32 = 192;

/// Server-assigned name addressing a progress stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(pub String);

impl SessionHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Ogg,
    Flac,
    M4a,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 5] = [
        AudioFormat::Wav,
        AudioFormat::Mp3,
        AudioFormat::Ogg,
        AudioFormat::Flac,
        AudioFormat::M4a,
    ];

    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|format| format.mime() == mime)
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "wav" => Some(AudioFormat::Wav),
            "mp3" => Some(AudioFormat::Mp3),
            "ogg" => Some(AudioFormat::Ogg),
            "flac" => Some(AudioFormat::Flac),
            "m4a" => Some(AudioFormat::M4a),
            _ => None,
        }
    }

    /// Resolves the extension after the last dot of a file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, extension) = name.rsplit_once('.')?;
        Self::from_extension(extension)
    }

    pub fn mime(self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::M4a => "audio/mp4",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
            AudioFormat::M4a => "m4a",
        }
    }

    /// Typical bitrate used for the rough duration estimate.
    pub fn typical_bitrate_kbps(self) -> u32 {
        match self {
            AudioFormat::Wav => 1411,
            AudioFormat::Mp3 => 192,
            AudioFormat::Ogg => 160,
            AudioFormat::Flac => 900,
            AudioFormat::M4a => 192,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    Pending,
    Processing,
    Success,
    Error,
    Retried,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewState {
    #[default]
    Idle,
    FileStaged,
    Uploading,
    Streaming,
    Completed,
    Failed,
}

impl ViewState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ViewState::Completed | ViewState::Failed)
    }

    /// States in which a local file may be (re)selected.
    pub fn accepts_selection(self) -> bool {
        matches!(
            self,
            ViewState::Idle | ViewState::FileStaged | ViewState::Failed
        )
    }
}
