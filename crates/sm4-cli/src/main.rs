//! Command-line interface for `sm4-core`.

#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sm4_core::gcm::{open_and_verify_with, seal_and_tag_with, TAG_SIZE};
use sm4_core::modes::{cbc_decrypt, cbc_encrypt, ecb_decrypt, ecb_encrypt};
use sm4_core::{
    best_backend, crypt_block_with, detect, expand_key, BackendConfig, BackendId, Block,
    DecryptContext, Direction, EncryptContext, Sm4Key,
};

/// SM4 block cipher and SM4-GCM.
#[derive(Parser)]
#[command(name = "sm4", version, about = "SM4 ECB/CBC and SM4-GCM")]
struct Cli {
    /// Force a round backend (reference, table, vector).
    #[arg(long, global = true, env = "SM4_BACKEND", value_name = "NAME")]
    backend: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Ecb,
    Cbc,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a block-aligned file with ECB or CBC.
    Enc {
        /// 16-byte key as 32 hex characters.
        #[arg(long, value_name = "HEX")]
        key_hex: String,
        /// Block mode.
        #[arg(long, value_enum, default_value_t = Mode::Cbc)]
        mode: Mode,
        /// CBC initialisation vector as 32 hex characters.
        #[arg(long, value_name = "HEX")]
        iv_hex: Option<String>,
        /// Input file (must be a multiple of 16 bytes).
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        /// Output ciphertext path.
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Decrypt a block-aligned file with ECB or CBC.
    Dec {
        /// 16-byte key as 32 hex characters.
        #[arg(long, value_name = "HEX")]
        key_hex: String,
        /// Block mode.
        #[arg(long, value_enum, default_value_t = Mode::Cbc)]
        mode: Mode,
        /// CBC initialisation vector as 32 hex characters.
        #[arg(long, value_name = "HEX")]
        iv_hex: Option<String>,
        /// Input file (ciphertext).
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        /// Output plaintext path.
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Encrypt and authenticate a file with GCM; prints the tag.
    Seal {
        /// 16-byte key as 32 hex characters.
        #[arg(long, value_name = "HEX")]
        key_hex: String,
        /// Nonce as hex (12 bytes recommended).
        #[arg(long, value_name = "HEX")]
        nonce_hex: String,
        /// Additional authenticated data as hex.
        #[arg(long, value_name = "HEX", default_value = "")]
        aad_hex: String,
        /// Tag length in bytes (1..=16).
        #[arg(long, default_value_t = TAG_SIZE)]
        tag_len: usize,
        /// Input plaintext.
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        /// Output ciphertext path.
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Verify and decrypt a GCM file; writes nothing if the tag does not match.
    Open {
        /// 16-byte key as 32 hex characters.
        #[arg(long, value_name = "HEX")]
        key_hex: String,
        /// Nonce as hex.
        #[arg(long, value_name = "HEX")]
        nonce_hex: String,
        /// Additional authenticated data as hex.
        #[arg(long, value_name = "HEX", default_value = "")]
        aad_hex: String,
        /// Expected tag as hex.
        #[arg(long, value_name = "HEX")]
        tag_hex: String,
        /// Input ciphertext.
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        /// Output plaintext path.
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Run known answers and compare every backend on random samples.
    Check {
        /// Number of random samples to test.
        #[arg(long, default_value_t = 256)]
        samples: usize,
        /// Optional RNG seed for reproducibility.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show detected CPU capabilities and the backend in use.
    Info,
    /// Run a local demo: random key and nonce, seal random data, open it back.
    Demo {
        /// Optional RNG seed for reproducibility.
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = match cli.backend.as_deref() {
        Some(name) => BackendConfig::force(name).context("select backend")?,
        None => BackendConfig::Auto,
    };

    match cli.command {
        Commands::Enc {
            key_hex,
            mode,
            iv_hex,
            input,
            output,
        } => cmd_block_mode(
            &config,
            Direction::Encrypt,
            &key_hex,
            mode,
            iv_hex.as_deref(),
            &input,
            &output,
        ),
        Commands::Dec {
            key_hex,
            mode,
            iv_hex,
            input,
            output,
        } => cmd_block_mode(
            &config,
            Direction::Decrypt,
            &key_hex,
            mode,
            iv_hex.as_deref(),
            &input,
            &output,
        ),
        Commands::Seal {
            key_hex,
            nonce_hex,
            aad_hex,
            tag_len,
            input,
            output,
        } => cmd_seal(
            &config, &key_hex, &nonce_hex, &aad_hex, tag_len, &input, &output,
        ),
        Commands::Open {
            key_hex,
            nonce_hex,
            aad_hex,
            tag_hex,
            input,
            output,
        } => cmd_open(
            &config, &key_hex, &nonce_hex, &aad_hex, &tag_hex, &input, &output,
        ),
        Commands::Check { samples, seed } => cmd_check(samples, seed),
        Commands::Info => cmd_info(&config),
        Commands::Demo { seed } => cmd_demo(&config, seed),
    }
}

fn cmd_block_mode(
    config: &BackendConfig,
    direction: Direction,
    key_hex: &str,
    mode: Mode,
    iv_hex: Option<&str>,
    input_path: &Path,
    output_path: &Path,
) -> Result<()> {
    let key = parse_key_hex(key_hex)?;
    let mut data =
        fs::read(input_path).with_context(|| format!("read {}", input_path.display()))?;
    let mut iv = match (mode, iv_hex) {
        (Mode::Ecb, _) => None,
        (Mode::Cbc, Some(iv_hex)) => Some(parse_block_hex(iv_hex, "IV")?),
        (Mode::Cbc, None) => bail!("CBC mode requires --iv-hex"),
    };

    match direction {
        Direction::Encrypt => {
            let ctx = EncryptContext::with_config(&key, config);
            match iv.as_mut() {
                Some(iv) => cbc_encrypt(&ctx, &mut data, iv)?,
                None => ecb_encrypt(&ctx, &mut data)?,
            }
        }
        Direction::Decrypt => {
            let ctx = DecryptContext::with_config(&key, config);
            match iv.as_mut() {
                Some(iv) => cbc_decrypt(&ctx, &mut data, iv)?,
                None => ecb_decrypt(&ctx, &mut data)?,
            }
        }
    }

    fs::write(output_path, data).with_context(|| format!("write {}", output_path.display()))?;
    Ok(())
}

fn cmd_seal(
    config: &BackendConfig,
    key_hex: &str,
    nonce_hex: &str,
    aad_hex: &str,
    tag_len: usize,
    input_path: &Path,
    output_path: &Path,
) -> Result<()> {
    let key = parse_key_hex(key_hex)?;
    let nonce = hex::decode(nonce_hex.trim()).context("decode nonce hex")?;
    let aad = hex::decode(aad_hex.trim()).context("decode AAD hex")?;
    let plaintext =
        fs::read(input_path).with_context(|| format!("read {}", input_path.display()))?;

    let mut ciphertext = vec![0u8; plaintext.len()];
    let tag = seal_and_tag_with(config, &key, &nonce, &aad, &plaintext, &mut ciphertext, tag_len)?;
    fs::write(output_path, ciphertext)
        .with_context(|| format!("write {}", output_path.display()))?;
    println!("{}", hex::encode(tag));
    Ok(())
}

fn cmd_open(
    config: &BackendConfig,
    key_hex: &str,
    nonce_hex: &str,
    aad_hex: &str,
    tag_hex: &str,
    input_path: &Path,
    output_path: &Path,
) -> Result<()> {
    let key = parse_key_hex(key_hex)?;
    let nonce = hex::decode(nonce_hex.trim()).context("decode nonce hex")?;
    let aad = hex::decode(aad_hex.trim()).context("decode AAD hex")?;
    let tag = hex::decode(tag_hex.trim()).context("decode tag hex")?;
    let ciphertext =
        fs::read(input_path).with_context(|| format!("read {}", input_path.display()))?;

    let mut plaintext = vec![0u8; ciphertext.len()];
    open_and_verify_with(config, &key, &nonce, &aad, &ciphertext, &tag, &mut plaintext)
        .context("open ciphertext")?;
    fs::write(output_path, plaintext).with_context(|| format!("write {}", output_path.display()))?;
    Ok(())
}

fn cmd_check(samples: usize, seed: Option<u64>) -> Result<()> {
    let key = parse_key_hex("0123456789abcdeffedcba9876543210")?;
    let expected = parse_block_hex("681edf34d206965e86b3e94f536e4246", "known answer")?;
    let plaintext = parse_block_hex("0123456789abcdeffedcba9876543210", "known answer")?;
    for backend in BackendId::ALL {
        let ctx = EncryptContext::with_config(&key, &BackendConfig::Forced(backend));
        if ctx.encrypt_block(&plaintext) != expected {
            bail!("{backend} backend fails the known-answer test");
        }
    }

    let mut rng = seeded_rng(seed);
    for _ in 0..samples {
        let mut key_bytes = [0u8; 16];
        let mut block: Block = [0u8; 16];
        rng.fill_bytes(&mut key_bytes);
        rng.fill_bytes(&mut block);
        let round_keys = expand_key(&Sm4Key::from(key_bytes));
        let reference = crypt_block_with(BackendId::Reference, &block, &round_keys);
        for backend in BackendId::ALL {
            if crypt_block_with(backend, &block, &round_keys) != reference {
                bail!("{backend} backend diverges from reference");
            }
        }
    }
    println!("ok: {} backends, {samples} samples", BackendId::ALL.len());
    Ok(())
}

fn cmd_info(config: &BackendConfig) -> Result<()> {
    let caps = detect();
    for (name, present) in caps.flags() {
        println!("{name:<12}{}", if present { "yes" } else { "no" });
    }
    println!("best backend: {}", best_backend());
    println!("in use:       {}", config.resolve());
    Ok(())
}

fn cmd_demo(config: &BackendConfig, seed: Option<u64>) -> Result<()> {
    let mut rng = seeded_rng(seed);
    let mut key_bytes = [0u8; 16];
    let mut nonce = [0u8; 12];
    let mut plaintext = [0u8; 48];
    rng.fill_bytes(&mut key_bytes);
    rng.fill_bytes(&mut nonce);
    rng.fill_bytes(&mut plaintext);
    let key = Sm4Key::from(key_bytes);
    let aad = b"sm4 demo";

    let mut ciphertext = [0u8; 48];
    let tag = seal_and_tag_with(config, &key, &nonce, aad, &plaintext, &mut ciphertext, TAG_SIZE)?;
    let mut decrypted = [0u8; 48];
    open_and_verify_with(config, &key, &nonce, aad, &ciphertext, tag.as_bytes(), &mut decrypted)?;

    println!("backend: {}", config.resolve());
    println!("demo key: {}", hex::encode(key_bytes));
    println!("nonce: {}", hex::encode(nonce));
    println!("plaintext: {}", hex::encode(plaintext));
    println!("ciphertext: {}", hex::encode(ciphertext));
    println!("tag: {}", hex::encode(tag));
    println!("decrypted: {}", hex::encode(decrypted));
    if decrypted != plaintext {
        bail!("demo roundtrip failed");
    }
    Ok(())
}

fn parse_key_hex(hex_str: &str) -> Result<Sm4Key> {
    let bytes = hex::decode(hex_str.trim()).context("decode key hex")?;
    Sm4Key::try_from(bytes.as_slice()).context("SM4 key must be 16 bytes (32 hex characters)")
}

fn parse_block_hex(hex_str: &str, what: &str) -> Result<Block> {
    let bytes = hex::decode(hex_str.trim()).with_context(|| format!("decode {what} hex"))?;
    if bytes.len() != 16 {
        bail!("{what} must be 16 bytes (32 hex characters)");
    }
    let mut block = [0u8; 16];
    block.copy_from_slice(&bytes);
    Ok(block)
}

fn seeded_rng(seed: Option<u64>) -> impl RngCore + CryptoRng {
    let mut seed_bytes = [0u8; 32];
    match seed {
        Some(value) => seed_bytes[..8].copy_from_slice(&value.to_le_bytes()),
        None => rand::rngs::OsRng.fill_bytes(&mut seed_bytes),
    }
    ChaCha20Rng::from_seed(seed_bytes)
}
