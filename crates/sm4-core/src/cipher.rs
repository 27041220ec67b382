//! SM4 key schedule and block encryption/decryption.

use crate::backend::{
    BackendConfig, BackendId, Reference, RoundTransform, TableAccelerated, VectorAccelerated,
};
use crate::block::{load_words, store_words, Block};
use crate::key::{Direction, RoundKeys, Sm4Key, ROUNDS};
use crate::round::t_prime;
use crate::sbox::{CK, FK};

/// Expands a key into the 32 round keys in encryption order.
pub fn expand_key(key: &Sm4Key) -> RoundKeys {
    let mk = load_words(&key.0);
    let mut k = [0u32; ROUNDS + 4];
    for i in 0..4 {
        k[i] = mk[i] ^ FK[i];
    }

    let mut rk = [0u32; ROUNDS];
    for i in 0..ROUNDS {
        k[i + 4] = k[i] ^ t_prime(k[i + 1] ^ k[i + 2] ^ k[i + 3] ^ CK[i]);
        rk[i] = k[i + 4];
    }

    RoundKeys::new(rk, Direction::Encrypt)
}

/// Expands a key into round keys in decryption order (the encryption
/// schedule reversed).
pub fn expand_decrypt_key(key: &Sm4Key) -> RoundKeys {
    let mut rk = *expand_key(key).words();
    rk.reverse();
    RoundKeys::new(rk, Direction::Decrypt)
}

/// Runs the 32 rounds with the round transform `B`.
#[inline]
fn rounds<B: RoundTransform>(block: &Block, round_keys: &RoundKeys) -> Block {
    let mut x = load_words(block);
    for &rk in round_keys.words() {
        let t = B::t(x[1] ^ x[2] ^ x[3] ^ rk);
        x = [x[1], x[2], x[3], x[0] ^ t];
    }
    store_words([x[3], x[2], x[1], x[0]])
}

/// Transforms one block with the given backend. Whether this encrypts or
/// decrypts depends only on the schedule's direction.
pub fn crypt_block_with(backend: BackendId, block: &Block, round_keys: &RoundKeys) -> Block {
    match backend {
        BackendId::Reference => rounds::<Reference>(block, round_keys),
        BackendId::TableAccelerated => rounds::<TableAccelerated>(block, round_keys),
        BackendId::VectorAccelerated => rounds::<VectorAccelerated>(block, round_keys),
    }
}

/// Schedule plus backend shared by both context types.
#[derive(Clone, Debug)]
struct Keyed {
    round_keys: RoundKeys,
    backend: BackendId,
}

impl Keyed {
    fn new(round_keys: RoundKeys, config: &BackendConfig) -> Self {
        Self {
            round_keys,
            backend: config.resolve(),
        }
    }

    #[inline]
    fn process(&self, block: &Block) -> Block {
        crypt_block_with(self.backend, block, &self.round_keys)
    }
}

/// Encrypt-only SM4 instance bound to one backend.
///
/// Immutable after creation; share it freely across threads. There is no
/// way to decrypt with it:
///
/// ```compile_fail
/// use sm4_core::{EncryptContext, Sm4Key};
///
/// let ctx = EncryptContext::new(&Sm4Key::from([7u8; 16]));
/// let _ = ctx.decrypt_block(&[0u8; 16]);
/// ```
#[derive(Clone, Debug)]
pub struct EncryptContext(Keyed);

impl EncryptContext {
    /// Derives the context using the best available backend.
    pub fn new(key: &Sm4Key) -> Self {
        Self::with_config(key, &BackendConfig::Auto)
    }

    /// Derives the context with an explicit backend choice.
    pub fn with_config(key: &Sm4Key, config: &BackendConfig) -> Self {
        Self(Keyed::new(expand_key(key), config))
    }

    /// Backend this context dispatches to.
    pub fn backend(&self) -> BackendId {
        self.0.backend
    }

    /// Encrypts one block.
    #[inline]
    pub fn encrypt_block(&self, block: &Block) -> Block {
        self.0.process(block)
    }
}

/// Decrypt-only SM4 instance bound to one backend.
///
/// Immutable after creation; share it freely across threads.
#[derive(Clone, Debug)]
pub struct DecryptContext(Keyed);

impl DecryptContext {
    /// Derives the context using the best available backend.
    pub fn new(key: &Sm4Key) -> Self {
        Self::with_config(key, &BackendConfig::Auto)
    }

    /// Derives the context with an explicit backend choice.
    pub fn with_config(key: &Sm4Key, config: &BackendConfig) -> Self {
        Self(Keyed::new(expand_decrypt_key(key), config))
    }

    /// Backend this context dispatches to.
    pub fn backend(&self) -> BackendId {
        self.0.backend
    }

    /// Decrypts one block.
    #[inline]
    pub fn decrypt_block(&self, block: &Block) -> Block {
        self.0.process(block)
    }
}
