//! SM4 round transformations.
//!
//! `T = L ∘ τ` drives the 32 cipher rounds and `T' = L' ∘ τ` drives the key
//! schedule. Only `T` is pluggable; see [`crate::backend`].

use crate::sbox::SBOX;

/// Applies the S-box to each byte of a word (τ).
#[inline]
pub const fn tau(word: u32) -> u32 {
    let b0 = SBOX[(word >> 24) as usize] as u32;
    let b1 = SBOX[((word >> 16) & 0xff) as usize] as u32;
    let b2 = SBOX[((word >> 8) & 0xff) as usize] as u32;
    let b3 = SBOX[(word & 0xff) as usize] as u32;
    (b0 << 24) | (b1 << 16) | (b2 << 8) | b3
}

/// Linear diffusion of the cipher rounds.
#[inline]
pub const fn l(b: u32) -> u32 {
    b ^ b.rotate_left(2) ^ b.rotate_left(10) ^ b.rotate_left(18) ^ b.rotate_left(24)
}

/// Linear diffusion of the key schedule.
#[inline]
pub const fn l_prime(b: u32) -> u32 {
    b ^ b.rotate_left(13) ^ b.rotate_left(23)
}

/// Round transform `T`, computed directly.
#[inline]
pub const fn t(word: u32) -> u32 {
    l(tau(word))
}

/// Key-schedule transform `T'`.
#[inline]
pub const fn t_prime(word: u32) -> u32 {
    l_prime(tau(word))
}
