use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Segmentation,
    Resolution,
    Mixing,
    Compositing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Segmentation => "segmentation",
            Stage::Resolution => "resolution",
            Stage::Mixing => "mixing",
            Stage::Compositing => "compositing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal render error tagged with the stage that detected it.
#[derive(Debug, Error)]
#[error("{stage} failed: {cause:#}")]
pub struct RenderFailure {
    pub stage: Stage,
    pub cause: anyhow::Error,
}

impl RenderFailure {
    pub fn new(stage: Stage, cause: impl Into<anyhow::Error>) -> Self {
        RenderFailure {
            stage,
            cause: cause.into(),
        }
    }

    pub fn segmentation(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(Stage::Segmentation, cause)
    }

    pub fn resolution(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(Stage::Resolution, cause)
    }

    pub fn mixing(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(Stage::Mixing, cause)
    }

    pub fn compositing(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(Stage::Compositing, cause)
    }
}

/// Attaches a stage to any error on the way out of a pipeline step.
pub trait StageExt<T> {
    fn stage(self, stage: Stage) -> Result<T, RenderFailure>;
}

impl<T, E> StageExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn stage(self, stage: Stage) -> Result<T, RenderFailure> {
        self.map_err(|e| RenderFailure::new(stage, e))
    }
}
