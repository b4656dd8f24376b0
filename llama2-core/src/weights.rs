use std::io::{Read, Seek, SeekFrom};

use anyhow::{Context, Result};
use log::debug;

use crate::configuration::{Config, HEADER_SIZE};
use crate::utils::{read_f32_chunked, try_zeroed};

/// Classifier weights either own their storage or alias the token
/// embedding table (weight tying). Encoding the alias as a variant keeps
/// the shared buffer owned by exactly one field, so it is released exactly
/// once, never through the alias.
#[derive(Debug)]
pub enum Classifier {
    Owned(Vec<f32>),
    SharedWithEmbedding,
}

/// All learned parameters, streamed from the checkpoint in the fixed
/// on-disk order. Shapes are shown per tensor; layer blocks are stored
/// flattened with the layer index outermost.
#[derive(Debug)]
pub struct TransformerWeights {
    /// (vocab_size, dim)
    pub token_embedding_table: Vec<f32>,
    /// (n_layers, dim)
    pub rms_att_weight: Vec<f32>,
    /// (n_layers, dim, n_heads * head_size)
    pub wq: Vec<f32>,
    /// (n_layers, dim, kv_dim)
    pub wk: Vec<f32>,
    /// (n_layers, dim, kv_dim)
    pub wv: Vec<f32>,
    /// (n_layers, n_heads * head_size, dim)
    pub wo: Vec<f32>,
    /// (n_layers, dim)
    pub rms_ffn_weight: Vec<f32>,
    /// (n_layers, hidden_dim, dim)
    pub w1: Vec<f32>,
    /// (n_layers, dim, hidden_dim)
    pub w2: Vec<f32>,
    /// (n_layers, hidden_dim, dim)
    pub w3: Vec<f32>,
    /// (dim,)
    pub rms_final_weight: Vec<f32>,
    /// (vocab_size, dim), possibly aliasing the embedding table
    pub wcls: Classifier,
}

impl TransformerWeights {
    /// Resolves the classifier weights, following the alias when shared.
    pub fn classifier(&self) -> &[f32] {
        match &self.wcls {
            Classifier::Owned(weights) => weights,
            Classifier::SharedWithEmbedding => &self.token_embedding_table,
        }
    }

    /// Streams every weight tensor from `source`, which must be positioned
    /// anywhere past the header (each tensor is seeked to explicitly).
    ///
    /// Tensors are read in the fixed checkpoint order, each one allocated
    /// at its exact size and filled through the chunked reader. The RoPE
    /// frequency table that sits between the final norm and the classifier
    /// block is skipped by offset advance only, never materialized.
    pub fn load<R: Read + Seek>(source: &mut R, config: &Config, chunk_elems: usize) -> Result<Self> {
        if chunk_elems == 0 {
            anyhow::bail!("Invalid chunk cap: must be non-zero");
        }

        let Config {
            dim,
            hidden_dim,
            n_layers,
            n_heads,
            vocab_size,
            seq_len,
            head_size,
            kv_dim,
            shared_classifier,
            ..
        } = *config;

        let all_heads_dim = n_heads * head_size;

        let mut stream = TensorStream {
            source,
            offset: HEADER_SIZE as u64,
            chunk_elems,
        };

        let token_embedding_table =
            stream.next_tensor("token_embedding_table", vocab_size * dim)?;
        let rms_att_weight = stream.next_tensor("rms_att_weight", n_layers * dim)?;
        let wq = stream.next_tensor("wq", n_layers * dim * all_heads_dim)?;
        let wk = stream.next_tensor("wk", n_layers * dim * kv_dim)?;
        let wv = stream.next_tensor("wv", n_layers * dim * kv_dim)?;
        let wo = stream.next_tensor("wo", n_layers * all_heads_dim * dim)?;
        let rms_ffn_weight = stream.next_tensor("rms_ffn_weight", n_layers * dim)?;
        let w1 = stream.next_tensor("w1", n_layers * dim * hidden_dim)?;
        let w2 = stream.next_tensor("w2", n_layers * dim * hidden_dim)?;
        let w3 = stream.next_tensor("w3", n_layers * dim * hidden_dim)?;
        let rms_final_weight = stream.next_tensor("rms_final_weight", dim)?;

        // RoPE frequency table: present in the file, never loaded.
        stream.skip_elements(seq_len * head_size);

        let wcls = if shared_classifier {
            debug!("Classifier weights shared with token_embedding_table");
            Classifier::SharedWithEmbedding
        } else {
            Classifier::Owned(stream.next_tensor("wcls", vocab_size * dim)?)
        };

        debug!(
            "Checkpoint weights loaded, {} bytes consumed",
            stream.offset
        );

        Ok(Self {
            token_embedding_table,
            rms_att_weight,
            wq,
            wk,
            wv,
            wo,
            rms_ffn_weight,
            w1,
            w2,
            w3,
            rms_final_weight,
            wcls,
        })
    }
}

/// Cursor over the tensor section of a checkpoint: a running byte offset
/// plus the chunk cap handed to every read.
struct TensorStream<'a, R> {
    source: &'a mut R,
    offset: u64,
    chunk_elems: usize,
}

impl<R: Read + Seek> TensorStream<'_, R> {
    /// Allocates, seeks, streams and accounts for one tensor.
    fn next_tensor(&mut self, name: &'static str, elements: usize) -> Result<Vec<f32>> {
        debug!(
            "Reading {name}: {elements} elements ({} bytes) at offset {}",
            elements * std::mem::size_of::<f32>(),
            self.offset
        );

        let mut buf = try_zeroed(name, elements)?;

        self.source
            .seek(SeekFrom::Start(self.offset))
            .with_context(|| format!("Failed to seek to {name} at offset {}", self.offset))?;

        read_f32_chunked(self.source, &mut buf, self.chunk_elems, name)
            .with_context(|| format!("Failed to read {name}"))?;

        self.offset += (elements * std::mem::size_of::<f32>()) as u64;
        Ok(buf)
    }

    /// Advances the offset past `elements` f32 values without reading.
    fn skip_elements(&mut self, elements: usize) {
        self.offset += (elements * std::mem::size_of::<f32>()) as u64;
    }
}
