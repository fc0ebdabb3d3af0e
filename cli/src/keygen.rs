//! Key generation for the withdraw circuit.
//!
//! Keys are bound to the tree depth and must be regenerated whenever the
//! depth or the circuit changes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use obscura_config::ObscuraConfig;
use obscura_prover::{Groth16Backend, ProofBackend};
use rand::{SeedableRng, rngs::OsRng, rngs::StdRng};

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Path for proving key output
    #[arg(long, default_value = "./proving.key")]
    pk_out: PathBuf,

    /// Path for verifying key output
    #[arg(long, default_value = "./verifying.key")]
    vk_out: PathBuf,

    /// Overwrite existing keys
    #[arg(long, short)]
    force: bool,

    /// Seed the setup RNG (reproducible, public keys; testing only)
    #[arg(long)]
    seed: Option<u64>,
}

/// Run the setup, write both keys and return the verifying key hash (hex).
pub fn run(args: &KeygenArgs, config: &ObscuraConfig) -> Result<String> {
    if !args.force && (args.pk_out.exists() || args.vk_out.exists()) {
        bail!(
            "keys already exist at {} / {} (use --force to regenerate)",
            args.pk_out.display(),
            args.vk_out.display()
        );
    }

    let depth = config.tree.depth;
    tracing::info!(depth, "performing groth16 circuit-specific setup");
    let backend = match args.seed {
        Some(seed) => {
            tracing::warn!(seed, "seeded setup: keys are reproducible by anyone");
            Groth16Backend::setup(depth, &mut StdRng::seed_from_u64(seed))?
        }
        None => Groth16Backend::setup(depth, &mut OsRng)?,
    };

    let (pk_bytes, vk_bytes) = backend.to_bytes()?;
    write_key(&args.pk_out, &pk_bytes).context("Failed to write proving key")?;
    write_key(&args.vk_out, &vk_bytes).context("Failed to write verifying key")?;
    tracing::info!(
        proving_key = %args.pk_out.display(),
        proving_key_bytes = pk_bytes.len(),
        verifying_key = %args.vk_out.display(),
        verifying_key_bytes = vk_bytes.len(),
        "keys written"
    );

    Ok(hex::encode(backend.verification_key_hash()))
}

fn write_key(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
