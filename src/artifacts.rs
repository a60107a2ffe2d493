//! Binary persistence for fitted artifacts
//!
//! Pipelines, target encoders and predictors are written with bincode so that
//! every fitted `f64` survives the round trip bit for bit.

use crate::error::{ForestError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Serialize `value` to `path`, creating parent directories
pub fn save_artifact<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let bytes = bincode::serialize(value).map_err(|e| {
        ForestError::SerializationError(format!("failed to serialize {}: {}", path.display(), e))
    })?;

    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

/// Deserialize an artifact written by [`save_artifact`]
pub fn load_artifact<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| {
        ForestError::DataError(format!("failed to open artifact {}: {}", path.display(), e))
    })?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    bincode::deserialize(&bytes).map_err(|e| {
        ForestError::SerializationError(format!(
            "failed to deserialize {}: {}",
            path.display(),
            e
        ))
    })
}
