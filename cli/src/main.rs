//! Obscura CLI
//!
//! Usage:
//!   obscura commitment
//!   obscura prove <nullifier> <secret> <recipient> [leaves...]
//!   obscura verify <payload | ->
//!   obscura keygen --pk-out <PATH> --vk-out <PATH> [--depth <D>] [--force]
//!   obscura sample-config
//!
//! Payloads are written to stdout as 0x-prefixed hex. Logs and diagnostics go
//! to stderr; on failure nothing is written to stdout and the exit code is 1.

mod keygen;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use obscura_config::{ObscuraConfig, TranscriptHashToml};
use obscura_privacy::{CommitmentScheme, PoseidonHasher};
use obscura_prover::constants::DEV_SETUP_SEED;
use obscura_prover::{
    Groth16Backend, PipelineError, ProofOptions, ProofPipeline, ProofRequest, ProverError,
    R1csExecutor, TranscriptHash, verify_payload,
};
use rand::{SeedableRng, rngs::StdRng};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Parser, Debug)]
#[command(name = "obscura")]
#[command(about = "Deposit commitments and withdrawal proofs for the Obscura mixer")]
struct Args {
    /// Config file (default: OBSCURA_CONFIG, ./obscura.toml, ~/.obscura/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tree depth (overrides config)
    #[arg(long, global = true)]
    depth: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a fresh secret pair and print abi.encode(commitment, nullifier, secret)
    Commitment,

    /// Prove a withdrawal and print abi.encode(proof, publicInputs)
    Prove {
        /// Nullifier (decimal or 0x hex)
        nullifier: String,
        /// Secret (decimal or 0x hex)
        secret: String,
        /// Recipient address (0x + 40 hex digits) or field element
        recipient: String,
        /// All commitments in insertion order
        leaves: Vec<String>,
    },

    /// Verify a proof payload (hex, or "-" to read it from stdin)
    Verify { payload: String },

    /// Generate Groth16 proving and verifying keys
    Keygen(keygen::KeygenArgs),

    /// Print a sample config file
    SampleConfig,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // logging settings come from the config itself; until it is loaded RUST_LOG applies
    let loading = bootstrap_subscriber(bootstrap_filter(), std::io::stderr);
    let config = match tracing::subscriber::with_default(loading, || load_config(&args)) {
        Ok(config) => config,
        Err(err) => return report(err),
    };
    init_tracing(&config);

    match run(args.command, &config) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => report(err),
    }
}

fn load_config(args: &Args) -> Result<ObscuraConfig> {
    let mut config = match &args.config {
        Some(path) => ObscuraConfig::load_from(path)?,
        None => ObscuraConfig::load()?,
    };
    if let Some(depth) = args.depth {
        config.tree.depth = depth;
        config.validate()?;
    }
    Ok(config)
}

fn bootstrap_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn bootstrap_subscriber<W>(filter: EnvFilter, writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

fn init_tracing(config: &ObscuraConfig) {
    let filter =
        EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command, config: &ObscuraConfig) -> Result<String> {
    match command {
        Command::Commitment => {
            let deposit = CommitmentScheme::new(PoseidonHasher::new()).new_deposit();
            Ok(to_hex(&deposit.encode()))
        }
        Command::Prove {
            nullifier,
            secret,
            recipient,
            leaves,
        } => {
            let backend = load_backend(config)?;
            let pipeline = ProofPipeline::new(
                PoseidonHasher::new(),
                R1csExecutor::new(config.tree.depth),
                backend,
            )
            .with_options(proof_options(config));

            let request = ProofRequest::new(nullifier, secret, recipient, leaves);
            let payload = pipeline.run_encoded(&request)?;
            Ok(to_hex(&payload))
        }
        Command::Verify { payload } => {
            let payload = read_payload(&payload)?;
            let backend = load_backend(config)?;
            if !verify_payload(&backend, &payload)? {
                return Err(ProverError::VerificationFailed.into());
            }
            Ok("ok".into())
        }
        Command::Keygen(args) => keygen::run(&args, config),
        Command::SampleConfig => Ok(ObscuraConfig::generate_sample()),
    }
}

fn proof_options(config: &ObscuraConfig) -> ProofOptions {
    ProofOptions {
        transcript_hash: match config.prover.transcript_hash {
            TranscriptHashToml::Keccak256 => TranscriptHash::Keccak256,
            TranscriptHashToml::Sha256 => TranscriptHash::Sha256,
        },
        deterministic: config.prover.deterministic,
    }
}

fn load_backend(config: &ObscuraConfig) -> Result<Groth16Backend> {
    let depth = config.tree.depth;
    match (
        &config.prover.proving_key_path,
        &config.prover.verifying_key_path,
    ) {
        (Some(pk), Some(vk)) => Ok(Groth16Backend::from_files(depth, pk, vk)?),
        _ if config.prover.dev_setup => {
            tracing::warn!(
                depth,
                "using publicly seeded development keys; proofs are NOT sound"
            );
            Ok(Groth16Backend::setup(
                depth,
                &mut StdRng::seed_from_u64(DEV_SETUP_SEED),
            )?)
        }
        _ => bail!(
            "no proving keys configured: set OBSCURA_PROVING_KEY and OBSCURA_VERIFYING_KEY \
             (see `obscura keygen`)"
        ),
    }
}

fn read_payload(arg: &str) -> Result<Vec<u8>> {
    let text = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read payload from stdin")?;
        buf
    } else {
        arg.to_string()
    };

    let text = text.trim();
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| ProverError::InvalidPayload(format!("bad hex: {e}")).into())
}

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Print `error[<code>]: <message>` and fail.
fn report(err: anyhow::Error) -> ExitCode {
    eprintln!("error[{}]: {err:#}", error_code(&err));
    ExitCode::FAILURE
}

fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(err) = err.downcast_ref::<PipelineError>() {
        return err.code();
    }
    if let Some(err) = err.downcast_ref::<ProverError>() {
        return err.code();
    }
    "error"
}
