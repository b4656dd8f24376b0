use std::io::{Cursor, Read};

use anyhow::{Context, Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::LoadError;

/// Size of the checkpoint header in bytes (7 i32 fields).
pub const HEADER_SIZE: usize = 28;

/// Decoded model hyperparameters.
///
/// `head_size` and `kv_dim` are derived exactly once here; every later
/// component consumes them from this struct instead of redoing the integer
/// division.
#[derive(Debug, Clone)]
pub struct Config {
    pub dim: usize,
    pub hidden_dim: usize,
    pub n_layers: usize,
    pub n_heads: usize,
    pub n_kv_heads: usize,
    pub vocab_size: usize,
    pub seq_len: usize,
    /// dim / n_heads
    pub head_size: usize,
    /// dim * n_kv_heads / n_heads
    pub kv_dim: usize,
    /// True when the classifier weights alias the token embedding table.
    pub shared_classifier: bool,
}

/// Header exactly as stored: seven consecutive little-endian i32 values.
///
/// The sign of `vocab_size` carries the shared-classifier flag; it is
/// consumed once, during conversion into [`Config`].
#[derive(Debug, Clone, Copy)]
struct RawConfig {
    dim: i32,
    hidden_dim: i32,
    n_layers: i32,
    n_heads: i32,
    n_kv_heads: i32,
    vocab_size: i32,
    seq_len: i32,
}

impl TryInto<Config> for RawConfig {
    type Error = Error;

    fn try_into(self) -> Result<Config> {
        validate_config(&self).with_context(|| "Invalid model configuration")?;

        let dim = self.dim as usize;
        let n_heads = self.n_heads as usize;
        let n_kv_heads = self.n_kv_heads as usize;

        Ok(Config {
            dim,
            hidden_dim: self.hidden_dim as usize,
            n_layers: self.n_layers as usize,
            n_heads,
            n_kv_heads,
            vocab_size: self.vocab_size.unsigned_abs() as usize,
            seq_len: self.seq_len as usize,
            head_size: dim / n_heads,
            kv_dim: dim * n_kv_heads / n_heads,
            shared_classifier: self.vocab_size > 0,
        })
    }
}

/// Reads and validates the model configuration from the start of the
/// checkpoint, leaving `source` positioned at the first tensor byte.
pub fn read_config<R: Read>(source: &mut R) -> Result<Config> {
    let mut data = [0u8; HEADER_SIZE];
    source
        .read_exact(&mut data)
        .map_err(|source| LoadError::TruncatedInput {
            what: "header",
            needed: HEADER_SIZE,
            source,
        })?;

    let mut cursor = Cursor::new(&data[..]);

    // Use a macro to reduce repetitive error handling
    macro_rules! read_i32 {
        ($field:literal) => {
            cursor
                .read_i32::<LittleEndian>()
                .with_context(|| format!("Failed to read {}", $field))?
        };
    }

    let raw = RawConfig {
        dim: read_i32!("dimension"),
        hidden_dim: read_i32!("hidden dimension"),
        n_layers: read_i32!("number of layers"),
        n_heads: read_i32!("number of heads"),
        n_kv_heads: read_i32!("number of KV heads"),
        vocab_size: read_i32!("vocabulary size"),
        seq_len: read_i32!("sequence length"),
    };

    raw.try_into()
}

/// Validates the header to ensure the architecture is representable.
fn validate_config(raw: &RawConfig) -> Result<()> {
    let dimensions = [
        ("dim", raw.dim),
        ("hidden_dim", raw.hidden_dim),
        ("n_layers", raw.n_layers),
        ("n_heads", raw.n_heads),
        ("n_kv_heads", raw.n_kv_heads),
        ("seq_len", raw.seq_len),
    ];

    for (name, value) in dimensions {
        if value <= 0 {
            anyhow::bail!("Invalid {}: must be positive, got {}", name, value);
        }
    }

    // vocab_size is sign-encoded, only zero is meaningless.
    if raw.vocab_size == 0 {
        anyhow::bail!("Invalid vocab_size: must be non-zero");
    }

    if raw.n_kv_heads > raw.n_heads {
        anyhow::bail!(
            "Invalid head counts: n_kv_heads {} exceeds n_heads {}",
            raw.n_kv_heads,
            raw.n_heads
        );
    }

    if raw.dim % raw.n_heads != 0 {
        anyhow::bail!(
            "Invalid head size: dim {} is not divisible by n_heads {}",
            raw.dim,
            raw.n_heads
        );
    }

    // Widened: the product of two valid i32 fields can exceed i32.
    if (raw.dim as i64 * raw.n_kv_heads as i64) % raw.n_heads as i64 != 0 {
        anyhow::bail!(
            "Invalid KV dimension: dim {} * n_kv_heads {} is not divisible by n_heads {}",
            raw.dim,
            raw.n_kv_heads,
            raw.n_heads
        );
    }

    validate_element_counts(raw)
}

/// Rejects headers whose derived tensor or cache sizes overflow usize
/// arithmetic. Widening to u128 keeps the products themselves exact.
fn validate_element_counts(raw: &RawConfig) -> Result<()> {
    let dim = raw.dim as u128;
    let hidden_dim = raw.hidden_dim as u128;
    let n_layers = raw.n_layers as u128;
    let n_heads = raw.n_heads as u128;
    let vocab_size = raw.vocab_size.unsigned_abs() as u128;
    let seq_len = raw.seq_len as u128;

    // kv_dim and head_size never exceed dim, so bounding these products
    // bounds every tensor, the KV cache and the skipped RoPE table.
    let element_counts = [
        ("token_embedding_table", vocab_size * dim),
        ("wq", n_layers * dim * dim),
        ("w1", n_layers * dim * hidden_dim),
        ("key_cache", n_layers * seq_len * dim),
        ("att", n_heads * seq_len),
        ("rope table", seq_len * dim),
    ];

    // Leave headroom for the element-to-byte conversion.
    let limit = (usize::MAX / std::mem::size_of::<f32>()) as u128;
    for (name, elements) in element_counts {
        if elements > limit {
            anyhow::bail!(
                "Invalid dimensions: {} would need {} elements",
                name,
                elements
            );
        }
    }

    Ok(())
}
