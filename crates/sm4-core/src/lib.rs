//! SM4 block cipher with ECB/CBC helpers and GCM authenticated encryption.
//!
//! This crate provides:
//! - Key schedule and single-block encryption and decryption.
//! - Three interchangeable round-transform backends with runtime selection.
//! - ECB and CBC over block-aligned buffers.
//! - A streaming GCM session plus one-shot seal/open helpers.
//!
//! Every backend produces byte-identical output. The reference and table
//! backends index lookup tables with secret data; only the vector backend
//! avoids that, and no stronger side-channel claim is made.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backend;
mod block;
mod cipher;
mod error;
pub mod gcm;
mod key;
pub mod modes;
mod round;
mod sbox;

pub use crate::backend::{best_backend, detect, BackendConfig, BackendId, CapabilitySet};
pub use crate::block::{xor_in_place, Block, BLOCK_SIZE};
pub use crate::cipher::{
    crypt_block_with, expand_decrypt_key, expand_key, DecryptContext, EncryptContext,
};
pub use crate::error::{Error, Result};
pub use crate::gcm::{open_and_verify, seal_and_tag, GcmSession, Tag};
pub use crate::key::{Direction, RoundKeys, Sm4Key, KEY_SIZE, ROUNDS};
pub use crate::modes::{cbc_decrypt, cbc_encrypt, ecb_decrypt, ecb_encrypt};
pub use crate::round::{l, l_prime, t, t_prime, tau};
pub use crate::sbox::{sbox, CK, FK, SBOX};
