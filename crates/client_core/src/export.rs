use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

const TRANSCRIPT_SUFFIX: &str = "-transcripcion.txt";
const FALLBACK_TRANSCRIPT_NAME: &str = "transcripcion.txt";

/// `{base}-transcripcion.txt` for a known source file, `transcripcion.txt`
/// otherwise.
pub fn transcript_file_name(source_name: Option<&str>) -> String {
    let stem = source_name
        .and_then(|name| Path::new(name).file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty());
    match stem {
        Some(stem) => format!("{stem}{TRANSCRIPT_SUFFIX}"),
        None => FALLBACK_TRANSCRIPT_NAME.to_string(),
    }
}

/// Writes the transcript as plain text. A directory target receives a file
/// named by [`transcript_file_name`].
pub async fn save_transcript(
    target: &Path,
    source_name: Option<&str>,
    text: &str,
) -> Result<PathBuf> {
    let path = if tokio::fs::metadata(target)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
    {
        target.join(transcript_file_name(source_name))
    } else {
        target.to_path_buf()
    };

    tokio::fs::write(&path, text)
        .await
        .with_context(|| format!("failed to write transcript to '{}'", path.display()))?;
    info!(path = %path.display(), bytes = text.len(), "saved transcript");
    Ok(path)
}
