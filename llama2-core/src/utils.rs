use std::io::Read;
use std::slice;

use crate::error::LoadError;

/// Chunk cap for streaming tensor reads: 16Ki f32 elements, so a single
/// read call transfers at most 64 KiB regardless of tensor size.
pub const DEFAULT_CHUNK_ELEMS: usize = 16 * 1024;

/// Fills `dst` from `source` in chunks of at most `chunk_elems` elements.
///
/// `dst` is the final tensor storage; bytes land in it directly, there is
/// no intermediate buffer. Tensor data is little-endian f32 and is taken
/// as-is, which assumes a little-endian host.
///
/// Any chunk that cannot be read in full fails with [`LoadError::ShortRead`]
/// carrying the tensor name and the byte offset the transfer stopped at.
pub(crate) fn read_f32_chunked<R: Read>(
    source: &mut R,
    dst: &mut [f32],
    chunk_elems: usize,
    tensor: &'static str,
) -> Result<(), LoadError> {
    // Callers validate the cap; chunks_mut panics on zero.
    debug_assert!(chunk_elems > 0, "chunk cap must be non-zero");

    let chunk_bytes = chunk_elems * std::mem::size_of::<f32>();

    // SAFETY: the byte view covers exactly the slice's own storage, and
    // every f32 bit pattern is a valid value.
    let bytes = unsafe {
        slice::from_raw_parts_mut(
            dst.as_mut_ptr() as *mut u8,
            dst.len() * std::mem::size_of::<f32>(),
        )
    };

    let mut offset = 0u64;
    for chunk in bytes.chunks_mut(chunk_bytes) {
        source.read_exact(chunk).map_err(|source| LoadError::ShortRead {
            tensor,
            offset,
            requested: chunk.len(),
            source,
        })?;
        offset += chunk.len() as u64;
    }

    Ok(())
}

/// Allocates a zero-initialized f32 buffer, surfacing allocation failure
/// as [`LoadError::AllocationFailure`] instead of aborting.
pub(crate) fn try_zeroed(what: &'static str, elements: usize) -> Result<Vec<f32>, LoadError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(elements)
        .map_err(|source| LoadError::AllocationFailure {
            what,
            elements,
            source,
        })?;
    buf.resize(elements, 0.0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn le_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_chunked_read_fills_destination() {
        let values: Vec<f32> = (0..100).map(|i| i as f32 * 0.5).collect();
        let mut source = Cursor::new(le_bytes(&values));

        let mut dst = vec![0.0f32; values.len()];
        // Chunk cap smaller than the tensor forces multiple transfers.
        read_f32_chunked(&mut source, &mut dst, 7, "test").unwrap();

        assert_eq!(dst, values);
    }

    #[test]
    fn test_chunked_read_single_chunk() {
        let values: Vec<f32> = vec![1.0, -2.0, 3.5];
        let mut source = Cursor::new(le_bytes(&values));

        let mut dst = vec![0.0f32; values.len()];
        read_f32_chunked(&mut source, &mut dst, DEFAULT_CHUNK_ELEMS, "test").unwrap();

        assert_eq!(dst, values);
    }

    #[test]
    fn test_short_chunk_is_fatal() {
        let values: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let mut bytes = le_bytes(&values);
        bytes.pop(); // one byte missing at the tail

        let mut dst = vec![0.0f32; values.len()];
        let err = read_f32_chunked(&mut Cursor::new(bytes), &mut dst, 4, "tail")
            .expect_err("truncated source must fail");

        match err {
            LoadError::ShortRead { tensor, .. } => assert_eq!(tensor, "tail"),
            other => panic!("expected ShortRead, got {other:?}"),
        }
    }

    #[test]
    fn test_try_zeroed_is_zero_initialized() {
        let buf = try_zeroed("buf", 37).unwrap();
        assert_eq!(buf.len(), 37);
        assert!(buf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_try_zeroed_empty() {
        let buf = try_zeroed("empty", 0).unwrap();
        assert!(buf.is_empty());
    }
}
