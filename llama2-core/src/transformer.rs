use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::debug;

use crate::configuration::{Config, read_config};
use crate::error::LoadError;
use crate::state::RunState;
use crate::utils::DEFAULT_CHUNK_ELEMS;
use crate::weights::TransformerWeights;

/// A loaded model: decoded hyperparameters, weight tensors and the scratch
/// state a forward pass mutates. All three are built together and torn
/// down together by `Drop`; a shared classifier never owns a second copy
/// of the embedding table, so nothing is released twice.
#[derive(Debug)]
pub struct Transformer {
    config: Config,
    weights: TransformerWeights,
    state: RunState,
}

impl Transformer {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn weights(&self) -> &TransformerWeights {
        &self.weights
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Read-only weights alongside mutable scratch state, the access
    /// pattern of a forward-pass step.
    pub fn split_mut(&mut self) -> (&TransformerWeights, &mut RunState) {
        (&self.weights, &mut self.state)
    }

    /// Builds a model from any seekable byte source positioned at offset 0:
    /// header first, then weight tensors, then scratch state. The first
    /// failing stage aborts the whole build.
    pub fn from_source<R: Read + Seek>(source: &mut R, chunk_elems: usize) -> Result<Self> {
        let config = read_config(source).context("Failed to decode checkpoint header")?;
        debug!("{config:?}");

        let weights = TransformerWeights::load(source, &config, chunk_elems)
            .context("Failed to load checkpoint weights")?;

        let state = RunState::new(&config).context("Failed to allocate inference state")?;

        Ok(Self {
            config,
            weights,
            state,
        })
    }
}

/// Builder pattern for loading a model from a checkpoint file.
pub struct TransformerBuilder {
    checkpoint_path: PathBuf,
    chunk_elems: usize,
}

impl TransformerBuilder {
    pub fn new(checkpoint_path: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_path: checkpoint_path.into(),
            chunk_elems: DEFAULT_CHUNK_ELEMS,
        }
    }

    /// Overrides the per-read chunk cap, in f32 elements.
    pub fn with_chunk_elems(mut self, chunk_elems: usize) -> Self {
        self.chunk_elems = chunk_elems;
        self
    }

    pub fn build(self) -> Result<Transformer> {
        let file =
            File::open(&self.checkpoint_path).map_err(|source| LoadError::SourceOpenFailure {
                path: self.checkpoint_path.clone(),
                source,
            })?;

        debug!(
            "Loading checkpoint {} ({} bytes)",
            self.checkpoint_path.display(),
            file.metadata().map(|m| m.len()).unwrap_or(0)
        );

        let mut source = BufReader::new(file);
        Transformer::from_source(&mut source, self.chunk_elems)
    }
}
