//! GHASH over GF(2^128) with the GCM bit ordering.
//!
//! Multiplication is bit-serial and branch-free on secret data: each bit of
//! the multiplier selects `V` through a mask, and the reduction by
//! `x^128 + x^7 + x^2 + x + 1` is applied the same way.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::block::{xor_in_place, Block, BLOCK_SIZE};

/// Reduction constant in the first byte, GCM bit order.
const R: u8 = 0xe1;

/// Running GHASH state keyed by `H`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct GHash {
    h: Block,
    y: Block,
}

impl GHash {
    pub(crate) fn new(h: &Block) -> Self {
        Self {
            h: *h,
            y: [0u8; BLOCK_SIZE],
        }
    }

    /// Folds one full block: `Y = (Y ⊕ X) · H`.
    #[inline]
    pub(crate) fn update_block(&mut self, block: &Block) {
        xor_in_place(&mut self.y, block);
        self.y = gf_mul(&self.y, &self.h);
    }

    /// Folds `data`, zero-padding a trailing partial block.
    pub(crate) fn update_padded(&mut self, data: &[u8]) {
        let mut chunks = data.chunks_exact(BLOCK_SIZE);
        for chunk in &mut chunks {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            self.update_block(&block);
        }
        let rest = chunks.remainder();
        if !rest.is_empty() {
            let mut block = [0u8; BLOCK_SIZE];
            block[..rest.len()].copy_from_slice(rest);
            self.update_block(&block);
            block.zeroize();
        }
    }

    /// Folds the length block `bitlen(a) ‖ bitlen(c)`, both 64-bit big-endian.
    pub(crate) fn update_lengths(&mut self, a_bits: u64, c_bits: u64) {
        let mut block = [0u8; BLOCK_SIZE];
        block[..8].copy_from_slice(&a_bits.to_be_bytes());
        block[8..].copy_from_slice(&c_bits.to_be_bytes());
        self.update_block(&block);
    }

    /// Current accumulator.
    pub(crate) fn value(&self) -> Block {
        self.y
    }
}

/// Multiplies `x · y` in GF(2^128).
pub(crate) fn gf_mul(x: &Block, y: &Block) -> Block {
    let mut z = [0u8; BLOCK_SIZE];
    let mut v = *y;

    for byte in x {
        for bit in (0..8).rev() {
            let mask = 0u8.wrapping_sub((byte >> bit) & 1);
            for (zk, vk) in z.iter_mut().zip(v.iter()) {
                *zk ^= vk & mask;
            }

            let lsb_mask = 0u8.wrapping_sub(v[BLOCK_SIZE - 1] & 1);
            let mut carry = 0u8;
            for vk in v.iter_mut() {
                let next = *vk & 1;
                *vk = (*vk >> 1) | (carry << 7);
                carry = next;
            }
            v[0] ^= R & lsb_mask;
        }
    }

    v.zeroize();
    z
}
