use anyhow::Result;
use log::debug;

use crate::configuration::Config;
use crate::utils::try_zeroed;

/// Scratch buffers mutated by every forward-pass step.
///
/// Sized purely from the header, allocated once per loaded model and
/// reused across steps; nothing in here is persisted. Every buffer is
/// zero-initialized, which the KV cache relies on for sequence positions
/// not yet written. Buffers are released by `Drop`, exactly once.
#[derive(Debug)]
pub struct RunState {
    /// Activation at the current time step (dim,)
    pub x: Vec<f32>,
    /// Residual-branch working buffer (dim,)
    pub xb: Vec<f32>,
    /// Second residual-branch working buffer (dim,)
    pub xb2: Vec<f32>,
    /// FFN hidden buffer (hidden_dim,)
    pub hb: Vec<f32>,
    /// Second FFN hidden buffer (hidden_dim,)
    pub hb2: Vec<f32>,
    /// Query buffer (dim,)
    pub q: Vec<f32>,
    /// Attention scores (n_heads, seq_len)
    pub att: Vec<f32>,
    /// Output logits (vocab_size,)
    pub logits: Vec<f32>,
    /// Key cache (n_layers, seq_len, kv_dim)
    pub key_cache: Vec<f32>,
    /// Value cache (n_layers, seq_len, kv_dim)
    pub value_cache: Vec<f32>,
}

impl RunState {
    /// Allocates every scratch buffer zero-initialized. The first failed
    /// allocation aborts construction; buffers already allocated are
    /// dropped on the way out and no partial state is returned.
    pub fn new(config: &Config) -> Result<Self> {
        let Config {
            dim,
            hidden_dim,
            n_layers,
            n_heads,
            vocab_size,
            seq_len,
            kv_dim,
            ..
        } = *config;

        debug!("Allocating RunState buffers: dim={dim}, hidden_dim={hidden_dim}, kv_dim={kv_dim}");

        Ok(Self {
            x: try_zeroed("x", dim)?,
            xb: try_zeroed("xb", dim)?,
            xb2: try_zeroed("xb2", dim)?,
            hb: try_zeroed("hb", hidden_dim)?,
            hb2: try_zeroed("hb2", hidden_dim)?,
            q: try_zeroed("q", dim)?,
            att: try_zeroed("att", n_heads * seq_len)?,
            logits: try_zeroed("logits", vocab_size)?,
            key_cache: try_zeroed("key_cache", n_layers * seq_len * kv_dim)?,
            value_cache: try_zeroed("value_cache", n_layers * seq_len * kv_dim)?,
        })
    }
}
