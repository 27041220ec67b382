//! SM4-GCM authenticated encryption.
//!
//! A [`GcmSession`] walks `initialized → AAD → encrypt|decrypt → finished`.
//! AAD and data may be supplied in any number of calls of any size; partial
//! blocks are carried between calls, so the result is identical to a single
//! call over the concatenated input. A session produces exactly one tag.

mod ghash;

use subtle::ConstantTimeEq;
use tracing::{debug, trace};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::backend::BackendConfig;
use crate::block::{xor_in_place, Block, BLOCK_SIZE};
use crate::cipher::EncryptContext;
use crate::error::{Error, Result};
use crate::key::{Direction, Sm4Key};

use self::ghash::GHash;

/// Length of the nonce that takes the direct `nonce ‖ 0^31 ‖ 1` path.
pub const STANDARD_NONCE_SIZE: usize = 12;

/// Length of an untruncated tag.
pub const TAG_SIZE: usize = 16;

/// Authentication tag: the leading `len` bytes of the full 16-byte value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag {
    bytes: [u8; TAG_SIZE],
    len: usize,
}

impl Tag {
    /// Tag bytes, already truncated.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl AsRef<[u8]> for Tag {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Initialized,
    Aad,
    Data(Direction),
    Finished,
}

impl Phase {
    const fn name(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Aad => "absorbing AAD",
            Self::Data(direction) => direction.name(),
            Self::Finished => "finished",
        }
    }
}

fn check_tag_len(len: usize) -> Result<()> {
    if !(1..=TAG_SIZE).contains(&len) {
        return Err(Error::InvalidLength {
            what: "tag",
            expected: "between 1 and 16 bytes",
            actual: len,
        });
    }
    Ok(())
}

fn check_output_len(input: usize, output: usize) -> Result<()> {
    if input != output {
        return Err(Error::InvalidLength {
            what: "output buffer",
            expected: "the same length as the input",
            actual: output,
        });
    }
    Ok(())
}

#[inline]
fn bit_length(bytes: u64) -> u64 {
    bytes.wrapping_mul(8)
}

/// One GCM encryption or decryption under a single key and nonce.
///
/// Not shareable between threads without external locking. Secrets held by
/// the session are wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct GcmSession {
    #[zeroize(skip)]
    cipher: EncryptContext,
    ghash: GHash,
    j0: Block,
    counter: Block,
    keystream: Block,
    aad_carry: Block,
    data_carry: Block,
    aad_len: u64,
    data_len: u64,
    #[zeroize(skip)]
    phase: Phase,
}

impl GcmSession {
    /// Starts a session with the best available backend.
    ///
    /// Any nonce length is accepted; 12 bytes is the standard choice.
    pub fn new(key: &Sm4Key, nonce: &[u8]) -> Result<Self> {
        Self::with_config(key, nonce, &BackendConfig::Auto)
    }

    /// Starts a session with an explicit backend choice.
    pub fn with_config(key: &Sm4Key, nonce: &[u8], config: &BackendConfig) -> Result<Self> {
        let nonce_bits = u64::try_from(nonce.len())
            .ok()
            .and_then(|len| len.checked_mul(8))
            .ok_or(Error::InvalidLength {
                what: "nonce",
                expected: "a bit length that fits in 64 bits",
                actual: nonce.len(),
            })?;

        let cipher = EncryptContext::with_config(key, config);
        let h = cipher.encrypt_block(&[0u8; BLOCK_SIZE]);
        let ghash = GHash::new(&h);

        let j0 = if nonce.len() == STANDARD_NONCE_SIZE {
            let mut j0 = [0u8; BLOCK_SIZE];
            j0[..STANDARD_NONCE_SIZE].copy_from_slice(nonce);
            j0[BLOCK_SIZE - 1] = 1;
            j0
        } else {
            let mut g = GHash::new(&h);
            g.update_padded(nonce);
            g.update_lengths(0, nonce_bits);
            g.value()
        };

        debug!(
            nonce_len = nonce.len(),
            backend = %cipher.backend(),
            "gcm session initialised"
        );

        Ok(Self {
            cipher,
            ghash,
            j0,
            counter: j0,
            keystream: [0u8; BLOCK_SIZE],
            aad_carry: [0u8; BLOCK_SIZE],
            data_carry: [0u8; BLOCK_SIZE],
            aad_len: 0,
            data_len: 0,
            phase: Phase::Initialized,
        })
    }

    fn invalid(&self, operation: &'static str) -> Error {
        Error::InvalidState {
            operation,
            phase: self.phase.name(),
        }
    }

    /// Authenticates `aad` without encrypting it. Must precede all data.
    ///
    /// AAD split over several calls is hashed as one contiguous string: a
    /// call's trailing partial block is held back and completed by the next
    /// call, and zero-padded only once the data phase or `finish` begins.
    /// Splitting therefore never changes the tag. Callers that expect every
    /// call to be padded on its own will see a different tag whenever an
    /// earlier call's length is not a multiple of 16.
    pub fn aad(&mut self, aad: &[u8]) -> Result<()> {
        match self.phase {
            Phase::Initialized | Phase::Aad => {}
            _ => return Err(self.invalid("add AAD")),
        }
        self.phase = Phase::Aad;
        trace!(len = aad.len(), "gcm aad");

        let mut rest = aad;
        let used = (self.aad_len % BLOCK_SIZE as u64) as usize;
        if used != 0 {
            let take = rest.len().min(BLOCK_SIZE - used);
            self.aad_carry[used..used + take].copy_from_slice(&rest[..take]);
            rest = &rest[take..];
            if used + take == BLOCK_SIZE {
                self.ghash.update_block(&self.aad_carry);
            }
        }

        let mut chunks = rest.chunks_exact(BLOCK_SIZE);
        for chunk in &mut chunks {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            self.ghash.update_block(&block);
        }
        let tail = chunks.remainder();
        self.aad_carry[..tail.len()].copy_from_slice(tail);

        self.aad_len = self.aad_len.wrapping_add(aad.len() as u64);
        Ok(())
    }

    /// Folds any buffered partial AAD block, zero-padded.
    fn close_aad(&mut self) {
        let used = (self.aad_len % BLOCK_SIZE as u64) as usize;
        if used != 0 {
            let mut block = [0u8; BLOCK_SIZE];
            block[..used].copy_from_slice(&self.aad_carry[..used]);
            self.ghash.update_block(&block);
            block.zeroize();
        }
        self.aad_carry.zeroize();
    }

    fn enter_data(&mut self, direction: Direction, operation: &'static str) -> Result<()> {
        match self.phase {
            Phase::Initialized | Phase::Aad => {
                self.close_aad();
                self.phase = Phase::Data(direction);
                Ok(())
            }
            Phase::Data(current) if current == direction => Ok(()),
            _ => Err(self.invalid(operation)),
        }
    }

    /// Advances the 32-bit counter field and encrypts it.
    fn next_keystream(&mut self) {
        let mut ctr = [0u8; 4];
        ctr.copy_from_slice(&self.counter[12..]);
        let next = u32::from_be_bytes(ctr).wrapping_add(1);
        self.counter[12..].copy_from_slice(&next.to_be_bytes());
        self.keystream = self.cipher.encrypt_block(&self.counter);
    }

    /// Applies the keystream to `input`, folding the ciphertext side into GHASH.
    fn apply(&mut self, input: &[u8], output: &mut [u8], direction: Direction) {
        let mut pos = (self.data_len % BLOCK_SIZE as u64) as usize;
        let mut i = 0;

        while i < input.len() {
            if pos == 0 && input.len() - i >= BLOCK_SIZE {
                self.next_keystream();
                let mut block = [0u8; BLOCK_SIZE];
                block.copy_from_slice(&input[i..i + BLOCK_SIZE]);
                let mut transformed = block;
                xor_in_place(&mut transformed, &self.keystream);
                let ciphertext = match direction {
                    Direction::Encrypt => &transformed,
                    Direction::Decrypt => &block,
                };
                self.ghash.update_block(ciphertext);
                output[i..i + BLOCK_SIZE].copy_from_slice(&transformed);
                i += BLOCK_SIZE;
                continue;
            }

            if pos == 0 {
                self.next_keystream();
            }
            let out = input[i] ^ self.keystream[pos];
            self.data_carry[pos] = match direction {
                Direction::Encrypt => out,
                Direction::Decrypt => input[i],
            };
            output[i] = out;
            pos += 1;
            i += 1;
            if pos == BLOCK_SIZE {
                self.ghash.update_block(&self.data_carry);
                pos = 0;
            }
        }

        self.data_len = self.data_len.wrapping_add(input.len() as u64);
    }

    /// Encrypts `plaintext` into `ciphertext` (same length).
    pub fn encrypt(&mut self, plaintext: &[u8], ciphertext: &mut [u8]) -> Result<()> {
        check_output_len(plaintext.len(), ciphertext.len())?;
        self.enter_data(Direction::Encrypt, "encrypt")?;
        trace!(len = plaintext.len(), "gcm encrypt");
        self.apply(plaintext, ciphertext, Direction::Encrypt);
        Ok(())
    }

    /// Decrypts `ciphertext` into `plaintext` (same length).
    ///
    /// The plaintext is unauthenticated until [`finish`](Self::finish) and a
    /// tag comparison succeed; prefer [`open_and_verify`].
    pub fn decrypt(&mut self, ciphertext: &[u8], plaintext: &mut [u8]) -> Result<()> {
        check_output_len(ciphertext.len(), plaintext.len())?;
        self.enter_data(Direction::Decrypt, "decrypt")?;
        trace!(len = ciphertext.len(), "gcm decrypt");
        self.apply(ciphertext, plaintext, Direction::Decrypt);
        Ok(())
    }

    /// Computes the tag, keeping its leading `tag_len` bytes (1..=16).
    pub fn finish(&mut self, tag_len: usize) -> Result<Tag> {
        check_tag_len(tag_len)?;
        match self.phase {
            Phase::Finished => return Err(self.invalid("finish")),
            Phase::Initialized | Phase::Aad => self.close_aad(),
            Phase::Data(_) => {}
        }

        let used = (self.data_len % BLOCK_SIZE as u64) as usize;
        if used != 0 {
            let mut block = [0u8; BLOCK_SIZE];
            block[..used].copy_from_slice(&self.data_carry[..used]);
            self.ghash.update_block(&block);
            block.zeroize();
        }
        self.ghash
            .update_lengths(bit_length(self.aad_len), bit_length(self.data_len));

        let mut bytes = self.cipher.encrypt_block(&self.j0);
        xor_in_place(&mut bytes, &self.ghash.value());

        self.phase = Phase::Finished;
        self.keystream.zeroize();
        self.data_carry.zeroize();
        self.ghash.zeroize();
        trace!(
            aad_len = self.aad_len,
            data_len = self.data_len,
            tag_len,
            "gcm finish"
        );

        Ok(Tag {
            bytes,
            len: tag_len,
        })
    }
}

/// Encrypts `plaintext` into `ciphertext` and returns a `tag_len`-byte tag.
pub fn seal_and_tag(
    key: &Sm4Key,
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
    ciphertext: &mut [u8],
    tag_len: usize,
) -> Result<Tag> {
    seal_and_tag_with(&BackendConfig::Auto, key, nonce, aad, plaintext, ciphertext, tag_len)
}

/// [`seal_and_tag`] with an explicit backend choice.
pub fn seal_and_tag_with(
    config: &BackendConfig,
    key: &Sm4Key,
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
    ciphertext: &mut [u8],
    tag_len: usize,
) -> Result<Tag> {
    check_tag_len(tag_len)?;
    check_output_len(plaintext.len(), ciphertext.len())?;
    let mut session = GcmSession::with_config(key, nonce, config)?;
    session.aad(aad)?;
    session.encrypt(plaintext, ciphertext)?;
    session.finish(tag_len)
}

/// Decrypts `ciphertext` into `plaintext` and checks `tag` over its full length.
///
/// On [`Error::AuthenticationFailed`] every byte of `plaintext` is zero.
pub fn open_and_verify(
    key: &Sm4Key,
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    plaintext: &mut [u8],
) -> Result<()> {
    open_and_verify_with(&BackendConfig::Auto, key, nonce, aad, ciphertext, tag, plaintext)
}

/// [`open_and_verify`] with an explicit backend choice.
pub fn open_and_verify_with(
    config: &BackendConfig,
    key: &Sm4Key,
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    plaintext: &mut [u8],
) -> Result<()> {
    check_tag_len(tag.len())?;
    check_output_len(ciphertext.len(), plaintext.len())?;
    let mut session = GcmSession::with_config(key, nonce, config)?;
    session.aad(aad)?;
    session.decrypt(ciphertext, plaintext)?;
    let expected = session.finish(tag.len())?;

    if !bool::from(expected.as_bytes().ct_eq(tag)) {
        plaintext.zeroize();
        debug!(len = ciphertext.len(), "gcm authentication failed");
        return Err(Error::AuthenticationFailed);
    }
    Ok(())
}
