//! Vector-accelerated round transform.
//!
//! The four bytes of the round word are processed as parallel lanes of one
//! `u32`. The S-box is evaluated from its algebraic factorisation (see
//! [`super::affine`]) with lane-wise GF(2^8) arithmetic, so no lookup table
//! is indexed by secret data.

use crate::round::l;

use super::affine::{FIELD_POLY, SBOX_AFFINE};
use super::RoundTransform;

const LANE_LSB: u32 = 0x0101_0101;
const LANE_LOW7: u32 = 0x7f7f_7f7f;

const AFFINE_COLUMNS: [u8; 8] = SBOX_AFFINE.lin.columns();
const AFFINE_BIAS: u32 = SBOX_AFFINE.bias as u32 * LANE_LSB;

/// Spreads bit `bit` of every lane into a full-lane mask.
#[inline(always)]
const fn lane_mask(x: u32, bit: u32) -> u32 {
    ((x >> bit) & LANE_LSB) * 0xff
}

/// Multiplies every lane by `x`.
#[inline(always)]
const fn xtime_lanes(a: u32) -> u32 {
    ((a & LANE_LOW7) << 1) ^ (((a >> 7) & LANE_LSB) * FIELD_POLY as u32)
}

/// Lane-wise GF(2^8) product.
#[inline]
const fn mul_lanes(mut a: u32, b: u32) -> u32 {
    let mut product = 0u32;
    let mut bit = 0;
    while bit < 8 {
        product ^= a & lane_mask(b, bit);
        a = xtime_lanes(a);
        bit += 1;
    }
    product
}

/// Lane-wise inverse as `x^254`; zero lanes stay zero.
#[inline]
const fn inv_lanes(x: u32) -> u32 {
    let x2 = mul_lanes(x, x);
    let x3 = mul_lanes(x2, x);
    let x6 = mul_lanes(x3, x3);
    let x12 = mul_lanes(x6, x6);
    let x14 = mul_lanes(x12, x2);
    let x15 = mul_lanes(x12, x3);
    let x30 = mul_lanes(x15, x15);
    let x60 = mul_lanes(x30, x30);
    let x120 = mul_lanes(x60, x60);
    let x240 = mul_lanes(x120, x120);
    mul_lanes(x240, x14)
}

/// Lane-wise `A · x ⊕ c`.
#[inline]
const fn affine_lanes(x: u32) -> u32 {
    let mut out = AFFINE_BIAS;
    let mut bit = 0;
    while bit < 8 {
        out ^= ((x >> bit) & LANE_LSB) * AFFINE_COLUMNS[bit as usize] as u32;
        bit += 1;
    }
    out
}

/// τ computed over all four lanes at once.
#[inline]
pub const fn tau_lanes(word: u32) -> u32 {
    affine_lanes(inv_lanes(affine_lanes(word)))
}

/// Round transform using lane-parallel substitution.
#[derive(Clone, Copy, Debug, Default)]
pub struct VectorAccelerated;

impl RoundTransform for VectorAccelerated {
    #[inline]
    fn t(word: u32) -> u32 {
        l(tau_lanes(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::{t, tau};
    use crate::sbox::SBOX;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn every_byte_in_every_lane_matches_the_sbox() {
        for x in 0..=255u32 {
            assert_eq!(tau_lanes(x * LANE_LSB), SBOX[x as usize] as u32 * LANE_LSB);
            for lane in 0..4u32 {
                let word = x << (8 * lane);
                assert_eq!(tau_lanes(word), tau(word), "word = {word:#010x}");
            }
        }
    }

    #[test]
    fn random_words_match_direct_transform() {
        let mut rng = ChaCha20Rng::from_seed([21u8; 32]);
        for _ in 0..4096 {
            let word: u32 = rng.gen();
            assert_eq!(VectorAccelerated::t(word), t(word));
        }
    }

    #[test]
    fn inversion_fixes_zero_and_one() {
        assert_eq!(inv_lanes(0), 0);
        assert_eq!(inv_lanes(LANE_LSB), LANE_LSB);
        assert_eq!(mul_lanes(inv_lanes(0x0203_0405), 0x0203_0405), LANE_LSB);
    }
}
