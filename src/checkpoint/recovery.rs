//! Checkpoint persistence
//!
//! A save first writes the whole state to `<path>_tmp`, syncs it, and only then
//! renames it over `<path>`. A failed or interrupted save therefore never
//! touches the previous checkpoint; at worst a stray temp file is left behind.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::{SchedulerState, CHECKPOINT_VERSION};
use crate::error::{CheckpointError, EvoResult, EvolutionError};
use crate::fitness::traits::FitnessValue;
use crate::genome::traits::Genome;

/// Magic bytes following the version header of binary checkpoints
const BINARY_MAGIC: &[u8; 4] = b"CVEO";

/// Format for checkpoint serialization
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointFormat {
    /// JSON format (human-readable, larger)
    Json,
    /// Binary format (compact, fast)
    #[default]
    Binary,
}

/// Path of the temporary file a save writes before the atomic replace
pub fn temp_path(path: &Path) -> PathBuf {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push("_tmp");
    PathBuf::from(tmp)
}

/// Atomically save scheduler state to `path`.
///
/// Any failure is reported as [`EvolutionError::CheckpointWrite`] and is meant
/// to stop the run.
pub fn save_checkpoint<G, F>(
    state: &SchedulerState<G, F>,
    path: impl AsRef<Path>,
    format: CheckpointFormat,
) -> EvoResult<()>
where
    G: Genome,
    F: FitnessValue,
{
    let path = path.as_ref();
    let tmp = temp_path(path);

    write_state(state, &tmp, format)
        .and_then(|()| fs::rename(&tmp, path).map_err(CheckpointError::from))
        .map_err(|source| EvolutionError::CheckpointWrite {
            path: path.to_path_buf(),
            source,
        })?;

    info!(path = %path.display(), generation = state.generation, "checkpoint saved");
    Ok(())
}

fn write_state<G, F>(
    state: &SchedulerState<G, F>,
    path: &Path,
    format: CheckpointFormat,
) -> Result<(), CheckpointError>
where
    G: Genome,
    F: FitnessValue,
{
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        CheckpointFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, state)
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        }
        CheckpointFormat::Binary => {
            writer.write_all(&CHECKPOINT_VERSION.to_le_bytes())?;
            writer.write_all(BINARY_MAGIC)?;
            bincode::serialize_into(&mut writer, state)
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        }
    }

    let file = writer
        .into_inner()
        .map_err(|e| CheckpointError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

/// Load scheduler state from `path`, detecting the format from its header
pub fn load_checkpoint<G, F>(path: impl AsRef<Path>) -> EvoResult<SchedulerState<G, F>>
where
    G: Genome,
    F: FitnessValue,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(CheckpointError::NotFound(path.display().to_string()).into());
    }

    let bytes = fs::read(path).map_err(CheckpointError::from)?;
    let state: SchedulerState<G, F> = if bytes.len() >= 8 && &bytes[4..8] == BINARY_MAGIC {
        let version = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        check_version(version)?;
        bincode::deserialize(&bytes[8..])
            .map_err(|e| CheckpointError::Deserialization(e.to_string()))?
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|e| CheckpointError::Deserialization(e.to_string()))?
    };

    if !state.is_compatible() {
        return Err(CheckpointError::VersionTooNew {
            found: state.version,
            supported: CHECKPOINT_VERSION,
        }
        .into());
    }
    if state.config.num_islands == 0 || state.config.merge_period == 0 {
        return Err(CheckpointError::Corrupted(format!(
            "{} holds an unusable configuration",
            path.display()
        ))
        .into());
    }

    info!(path = %path.display(), generation = state.generation, "checkpoint restored");
    Ok(state)
}

fn check_version(found: u32) -> Result<(), CheckpointError> {
    if found > CHECKPOINT_VERSION {
        return Err(CheckpointError::VersionTooNew {
            found,
            supported: CHECKPOINT_VERSION,
        });
    }
    Ok(())
}

/// Checkpoint location and format for one run
///
/// Only one store may write to a given path at a time; no locking is done.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointStore {
    /// Destination file
    pub path: PathBuf,
    /// Serialization format used when saving
    pub format: CheckpointFormat,
}

impl CheckpointStore {
    /// Create a store writing binary checkpoints to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: CheckpointFormat::Binary,
        }
    }

    /// Set the serialization format
    pub fn with_format(mut self, format: CheckpointFormat) -> Self {
        self.format = format;
        self
    }

    /// Atomically replace the checkpoint with `state`
    pub fn save<G, F>(&self, state: &SchedulerState<G, F>) -> EvoResult<()>
    where
        G: Genome,
        F: FitnessValue,
    {
        save_checkpoint(state, &self.path, self.format)
    }

    /// Read the checkpoint back
    pub fn restore<G, F>(&self) -> EvoResult<SchedulerState<G, F>>
    where
        G: Genome,
        F: FitnessValue,
    {
        load_checkpoint(&self.path)
    }
}
