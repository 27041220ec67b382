//! ECB and CBC over whole blocks, in place.
//!
//! Neither mode pads; callers must supply block-aligned buffers. Lengths are
//! validated before any byte is written, so a rejected call leaves the buffer
//! untouched.

use tracing::trace;

use crate::block::{xor_in_place, Block, BLOCK_SIZE};
use crate::cipher::{DecryptContext, EncryptContext};
use crate::error::{ensure_block_aligned, Result};

fn crypt_chunks(data: &mut [u8], f: impl Fn(&Block) -> Block) {
    for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(chunk);
        chunk.copy_from_slice(&f(&block));
    }
}

/// Encrypts every block of `data` independently.
pub fn ecb_encrypt(ctx: &EncryptContext, data: &mut [u8]) -> Result<()> {
    ensure_block_aligned("ECB input", data.len())?;
    trace!(len = data.len(), backend = %ctx.backend(), "ecb encrypt");
    crypt_chunks(data, |block| ctx.encrypt_block(block));
    Ok(())
}

/// Decrypts every block of `data` independently.
///
/// Only a [`DecryptContext`] is accepted:
///
/// ```compile_fail
/// use sm4_core::{ecb_decrypt, EncryptContext, Sm4Key};
///
/// let ctx = EncryptContext::new(&Sm4Key::from([7u8; 16]));
/// let mut data = [0u8; 16];
/// ecb_decrypt(&ctx, &mut data).unwrap();
/// ```
pub fn ecb_decrypt(ctx: &DecryptContext, data: &mut [u8]) -> Result<()> {
    ensure_block_aligned("ECB input", data.len())?;
    trace!(len = data.len(), backend = %ctx.backend(), "ecb decrypt");
    crypt_chunks(data, |block| ctx.decrypt_block(block));
    Ok(())
}

/// Encrypts a run of whole blocks.
pub fn encrypt_blocks(ctx: &EncryptContext, blocks: &mut [Block]) {
    for block in blocks {
        *block = ctx.encrypt_block(block);
    }
}

/// Decrypts a run of whole blocks.
pub fn decrypt_blocks(ctx: &DecryptContext, blocks: &mut [Block]) {
    for block in blocks {
        *block = ctx.decrypt_block(block);
    }
}

/// CBC-encrypts `data` in place.
///
/// On return `iv` holds the last ciphertext block, so consecutive calls
/// continue one chain.
pub fn cbc_encrypt(ctx: &EncryptContext, data: &mut [u8], iv: &mut Block) -> Result<()> {
    ensure_block_aligned("CBC input", data.len())?;
    trace!(len = data.len(), backend = %ctx.backend(), "cbc encrypt");

    for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
        let mut block = *iv;
        for (b, p) in block.iter_mut().zip(chunk.iter()) {
            *b ^= *p;
        }
        *iv = ctx.encrypt_block(&block);
        chunk.copy_from_slice(iv);
    }
    Ok(())
}

/// CBC-decrypts `data` in place.
///
/// On return `iv` holds the last ciphertext block that was consumed.
pub fn cbc_decrypt(ctx: &DecryptContext, data: &mut [u8], iv: &mut Block) -> Result<()> {
    ensure_block_aligned("CBC input", data.len())?;
    trace!(len = data.len(), backend = %ctx.backend(), "cbc decrypt");

    for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
        let mut ciphertext = [0u8; BLOCK_SIZE];
        ciphertext.copy_from_slice(chunk);
        let mut plain = ctx.decrypt_block(&ciphertext);
        xor_in_place(&mut plain, iv);
        chunk.copy_from_slice(&plain);
        *iv = ciphertext;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendConfig, BackendId};
    use crate::key::Sm4Key;
    use crate::Error;
    use rand::{Rng, RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    const KEY: [u8; 16] = [
        0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32,
        0x10,
    ];
    const IV: Block = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f,
    ];
    const PLAINTEXT: &str = "aaaaaaaabbbbbbbbccccccccddddddddeeeeeeeeffffffffaaaaaaaabbbbbbbb";
    const ECB_CIPHERTEXT: &str = "5ec8143de509cff7b5179f8f474b86192f1d305a7fb17df985f81c8482192304";
    const CBC_CIPHERTEXT: &str = "78ebb11cc40b0a48312aaeb2040244cb4cb7016951909226979b0d15dc6a8f6d";

    fn pair(backend: BackendId) -> (EncryptContext, DecryptContext) {
        let key = Sm4Key::from(KEY);
        let config = BackendConfig::Forced(backend);
        (
            EncryptContext::with_config(&key, &config),
            DecryptContext::with_config(&key, &config),
        )
    }

    #[test]
    fn ecb_matches_known_vector() {
        for backend in BackendId::ALL {
            let (enc, dec) = pair(backend);
            let mut data = hex::decode(PLAINTEXT).unwrap();
            ecb_encrypt(&enc, &mut data).unwrap();
            assert_eq!(hex::encode(&data), ECB_CIPHERTEXT, "{backend}");
            ecb_decrypt(&dec, &mut data).unwrap();
            assert_eq!(hex::encode(&data), PLAINTEXT, "{backend}");
        }
    }

    #[test]
    fn cbc_matches_known_vector_and_advances_iv() {
        let (enc, dec) = pair(BackendId::TableAccelerated);
        let mut data = hex::decode(PLAINTEXT).unwrap();
        let mut iv = IV;
        cbc_encrypt(&enc, &mut data, &mut iv).unwrap();
        assert_eq!(hex::encode(&data), CBC_CIPHERTEXT);
        assert_eq!(&iv[..], &data[16..]);

        let mut iv = IV;
        cbc_decrypt(&dec, &mut data, &mut iv).unwrap();
        assert_eq!(hex::encode(&data), PLAINTEXT);
        assert_eq!(hex::encode(iv), &CBC_CIPHERTEXT[32..]);
    }

    #[test]
    fn cbc_round_trips_random_ivs_and_lengths() {
        let mut rng = ChaCha20Rng::from_seed([11u8; 32]);
        for backend in BackendId::ALL {
            for round in 0..32 {
                let mut key_bytes = [0u8; 16];
                let mut iv = [0u8; BLOCK_SIZE];
                rng.fill_bytes(&mut key_bytes);
                rng.fill_bytes(&mut iv);
                let blocks = if round == 0 { 0 } else { rng.gen_range(0..=8) };
                let mut message = vec![0u8; BLOCK_SIZE * blocks];
                rng.fill_bytes(&mut message);

                let key = Sm4Key::from(key_bytes);
                let config = BackendConfig::Forced(backend);
                let enc = EncryptContext::with_config(&key, &config);
                let dec = DecryptContext::with_config(&key, &config);

                let mut data = message.clone();
                let mut enc_iv = iv;
                cbc_encrypt(&enc, &mut data, &mut enc_iv).unwrap();
                if !message.is_empty() {
                    assert_ne!(data, message, "{backend}");
                }

                let mut dec_iv = iv;
                cbc_decrypt(&dec, &mut data, &mut dec_iv).unwrap();
                assert_eq!(data, message, "{backend}");
                assert_eq!(dec_iv, enc_iv, "{backend}");
            }
        }
    }

    #[test]
    fn cbc_calls_chain_like_one_call() {
        let (enc, _) = pair(BackendId::Reference);
        let mut whole = hex::decode(PLAINTEXT).unwrap();
        let mut iv = IV;
        cbc_encrypt(&enc, &mut whole, &mut iv).unwrap();

        let mut split = hex::decode(PLAINTEXT).unwrap();
        let mut iv = IV;
        let (first, second) = split.split_at_mut(16);
        cbc_encrypt(&enc, first, &mut iv).unwrap();
        cbc_encrypt(&enc, second, &mut iv).unwrap();
        assert_eq!(split, whole);
    }

    #[test]
    fn misaligned_input_is_rejected_untouched() {
        let (enc, dec) = pair(BackendId::Reference);
        let mut data = [0x5au8; 17];
        let mut iv = IV;
        assert_eq!(
            ecb_encrypt(&enc, &mut data),
            Err(Error::InvalidLength {
                what: "ECB input",
                expected: "a multiple of 16 bytes",
                actual: 17,
            })
        );
        assert!(matches!(
            cbc_decrypt(&dec, &mut data, &mut iv),
            Err(Error::InvalidLength { actual: 17, .. })
        ));
        assert_eq!(data, [0x5au8; 17]);
        assert_eq!(iv, IV);
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let (enc, _) = pair(BackendId::VectorAccelerated);
        let mut iv = IV;
        assert!(ecb_encrypt(&enc, &mut []).is_ok());
        assert!(cbc_encrypt(&enc, &mut [], &mut iv).is_ok());
        assert_eq!(iv, IV);
    }

    #[test]
    fn block_runs_round_trip() {
        let mut rng = ChaCha20Rng::from_seed([3u8; 32]);
        let (enc, dec) = pair(BackendId::VectorAccelerated);
        let mut blocks = vec![[0u8; BLOCK_SIZE]; 8];
        for block in blocks.iter_mut() {
            rng.fill_bytes(block);
        }
        let original = blocks.clone();
        encrypt_blocks(&enc, &mut blocks);
        assert_ne!(blocks, original);

        let mut flat: Vec<u8> = original.concat();
        ecb_encrypt(&enc, &mut flat).unwrap();
        assert_eq!(flat, blocks.concat());

        decrypt_blocks(&dec, &mut blocks);
        assert_eq!(blocks, original);
    }
}
