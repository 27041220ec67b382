//! Block representation helpers.

/// Size of an SM4 block in bytes.
pub const BLOCK_SIZE: usize = 16;

/// SM4 block of 16 bytes.
pub type Block = [u8; BLOCK_SIZE];

/// XORs two blocks, writing the result into `dst`.
#[inline]
pub fn xor_in_place(dst: &mut Block, rhs: &Block) {
    for (d, r) in dst.iter_mut().zip(rhs.iter()) {
        *d ^= *r;
    }
}

/// Loads a block as four big-endian words.
#[inline]
pub(crate) fn load_words(block: &Block) -> [u32; 4] {
    core::array::from_fn(|i| {
        u32::from_be_bytes([
            block[4 * i],
            block[4 * i + 1],
            block[4 * i + 2],
            block[4 * i + 3],
        ])
    })
}

/// Stores four words big-endian in the given order.
#[inline]
pub(crate) fn store_words(words: [u32; 4]) -> Block {
    let mut out = [0u8; BLOCK_SIZE];
    for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

/// Copies a slice into a block, reporting a length mismatch.
pub(crate) fn block_from_slice(what: &'static str, bytes: &[u8]) -> crate::Result<Block> {
    bytes.try_into().map_err(|_| crate::Error::InvalidLength {
        what,
        expected: "exactly 16 bytes",
        actual: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_big_endian() {
        let block: Block = core::array::from_fn(|i| i as u8);
        let words = load_words(&block);
        assert_eq!(words[0], 0x0001_0203);
        assert_eq!(words[3], 0x0c0d_0e0f);
        assert_eq!(store_words(words), block);
    }

    #[test]
    fn block_from_slice_rejects_short_input() {
        let err = block_from_slice("iv", &[0u8; 15]).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidLength { actual: 15, .. }));
    }
}
