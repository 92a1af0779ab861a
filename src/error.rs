use std::{any::Any, io, path::PathBuf};

use thiserror::Error;

use crate::{semaphore::Interrupted, worker::WorkerId};

/// Rejected configuration, reported before any worker thread starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} has to be a positive integer")]
    NotPositive { field: &'static str },

    #[error("no production function was supplied")]
    MissingProducer,

    #[error("no consumption function was supplied")]
    MissingConsumer,

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Why a single worker stopped before reaching its normal exit.
#[derive(Debug, Error)]
pub enum Fault {
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    #[error("queue was empty while holding an item permit ({consumed} of {max_items} consumed)")]
    Inconsistent { consumed: usize, max_items: usize },

    #[error("worker function panicked: {message}")]
    Panicked { message: String },
}

impl Fault {
    pub(crate) fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Fault::Panicked { message }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Fault::Interrupted(_))
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn {worker}: {source}")]
    Spawn {
        worker: WorkerId,
        #[source]
        source: io::Error,
    },

    #[error("{worker} failed: {fault}")]
    Worker {
        worker: WorkerId,
        #[source]
        fault: Fault,
    },
}
