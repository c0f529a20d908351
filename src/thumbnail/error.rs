use std::fmt;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where in the pipeline a render gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metadata,
    Download,
    Decode,
    Compose,
    Encode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Metadata => "metadata",
            Stage::Download => "download",
            Stage::Decode => "decode",
            Stage::Compose => "compose",
            Stage::Encode => "encode",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("no video found for {0:?}")]
    NotFound(String),
    #[error("fetch failed during {stage}")]
    FetchFailed {
        stage: Stage,
        #[source]
        source: BoxError,
    },
    #[error("render failed during {stage}")]
    RenderFailed {
        stage: Stage,
        #[source]
        source: BoxError,
    },
}

impl ThumbnailError {
    pub fn fetch(stage: Stage, source: impl Into<BoxError>) -> Self {
        ThumbnailError::FetchFailed {
            stage,
            source: source.into(),
        }
    }

    pub fn render(stage: Stage, source: impl Into<BoxError>) -> Self {
        ThumbnailError::RenderFailed {
            stage,
            source: source.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ThumbnailError::NotFound(_) => Stage::Metadata,
            ThumbnailError::FetchFailed { stage, .. } | ThumbnailError::RenderFailed { stage, .. } => {
                *stage
            }
        }
    }
}

/// Failure of a single HTTP image download.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("transport error")]
    Transport(#[from] reqwest::Error),
}
