//! Loading core for llama2-style binary checkpoints.
//!
//! A checkpoint is a fixed 28-byte header of seven little-endian i32
//! hyperparameters followed by contiguous f32 tensors whose shapes are
//! derived from the header; tensor boundaries are computed, not stored.
//! This crate decodes the header, streams every tensor into its own
//! allocation under a bounded chunk size, and provisions the
//! zero-initialized scratch buffers a forward pass mutates. The forward
//! pass itself, tokenization and sampling live elsewhere.

mod configuration;
mod error;
mod state;
mod transformer;
mod utils;
mod weights;

pub use configuration::{Config, HEADER_SIZE, read_config};
pub use error::LoadError;
pub use state::RunState;
pub use transformer::{Transformer, TransformerBuilder};
pub use utils::DEFAULT_CHUNK_ELEMS;
pub use weights::{Classifier, TransformerWeights};
