use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load audio '{}': {reason}", path.display())]
    AudioLoad { path: PathBuf, reason: String },

    #[error(
        "ffmpeg executable not found ({}). Install ffmpeg and make sure it is on PATH, \
         or point --ffmpeg / [encoder].ffmpeg at the binary.",
        binary.display()
    )]
    EncoderMissing { binary: PathBuf },

    #[error("{stage} encode failed ({status}): {stderr}")]
    EncodeFailure {
        stage: &'static str,
        status: String,
        stderr: String,
    },

    #[error("Failed to open frame writer for '{}': {reason}", path.display())]
    WriterOpen { path: PathBuf, reason: String },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn audio_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::AudioLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Non-zero encoder exits are the only failures the fallback chain may recover from.
    pub fn is_recoverable_encode(&self) -> bool {
        matches!(self, Self::EncodeFailure { .. })
    }
}
