//! ElGamal CLI
//!
//! Command-line interface for file signatures:
//! - Key pair generation
//! - Signing a file in place
//! - Verifying a signed file
//! - Inspecting a key file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use elgamal_core::files::{self, KeyPaths};
use elgamal_core::keygen::validate_parameters;
use elgamal_core::wire::to_magnitude;
use elgamal_core::{EngineConfig, KeyFile, SignatureEngine};
use rand::rngs::OsRng;
use sha2::Sha256;
use sha3::Sha3_256;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, Level};

/// ElGamal - sign and verify files
#[derive(Parser)]
#[command(name = "elgamal")]
#[command(about = "ElGamal digital signatures over safe-prime groups")]
#[command(version)]
struct Cli {
    /// JSON engine configuration
    #[arg(short, long, env = "ELGAMAL_CONFIG")]
    config: Option<PathBuf>,

    /// Modulus size in bits (overrides the configuration file)
    #[arg(long, env = "ELGAMAL_BITS")]
    bits: Option<usize>,

    /// Miller-Rabin rounds for the safe prime (overrides the configuration file)
    #[arg(long, env = "ELGAMAL_ROUNDS")]
    rounds: Option<usize>,

    /// Message digest
    #[arg(long, value_enum, default_value_t = DigestKind::Sha256)]
    digest: DigestKind,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DigestKind {
    Sha256,
    #[value(name = "sha3-256")]
    Sha3_256,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate `elgamal.pub` and `elgamal`
    GenerateKeys {
        /// Directory for the key files
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,
    },

    /// Sign a file in place
    Sign {
        /// File to sign
        #[arg(short, long)]
        message: PathBuf,

        /// Private key file
        #[arg(short, long)]
        signing_key: PathBuf,
    },

    /// Verify a signed file
    Verify {
        /// Signed file
        #[arg(short, long)]
        message: PathBuf,

        /// Public key file
        #[arg(short, long)]
        public_key: PathBuf,
    },

    /// Show key file info
    Info {
        /// Key file of either kind
        #[arg(short, long)]
        key: PathBuf,

        /// Also re-check primality of the domain parameters
        #[arg(long)]
        check: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    debug!(?config, "Engine configuration");

    match cli.digest {
        DigestKind::Sha256 => dispatch(cli, SignatureEngine::<Sha256>::with_digest(config)?),
        DigestKind::Sha3_256 => dispatch(cli, SignatureEngine::<Sha3_256>::with_digest(config)?),
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Cannot load configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(bits) = cli.bits {
        config.prime_bits = bits;
    }
    if let Some(rounds) = cli.rounds {
        config.rounds = rounds;
    }
    config.validate()?;
    Ok(config)
}

fn dispatch<D: sha2::Digest>(cli: &Cli, engine: SignatureEngine<D>) -> Result<()> {
    match &cli.command {
        Commands::GenerateKeys { dest } => run_generate(&engine, dest),
        Commands::Sign {
            message,
            signing_key,
        } => run_sign(&engine, message, signing_key),
        Commands::Verify {
            message,
            public_key,
        } => run_verify(&engine, message, public_key),
        Commands::Info { key, check } => show_info(&engine, key, *check),
    }
}

fn run_generate<D: sha2::Digest>(engine: &SignatureEngine<D>, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)
        .with_context(|| format!("Cannot create {}", dest.display()))?;

    let KeyPaths { public, private } = files::generate_key_files(engine, dest, &mut OsRng)?;

    println!("Private and public keys are generated!");
    println!("  Public key:  {}", public.display());
    println!("  Private key: {}", private.display());
    Ok(())
}

fn run_sign<D: sha2::Digest>(
    engine: &SignatureEngine<D>,
    message: &Path,
    signing_key: &Path,
) -> Result<()> {
    files::sign_file(engine, message, signing_key, &mut OsRng)
        .with_context(|| format!("Cannot sign {}", message.display()))?;

    println!("File signed!");
    Ok(())
}

fn run_verify<D: sha2::Digest>(
    engine: &SignatureEngine<D>,
    message: &Path,
    public_key: &Path,
) -> Result<()> {
    files::verify_file(engine, message, public_key)
        .with_context(|| format!("Cannot verify {}", message.display()))?;

    println!("Signature valid!");
    Ok(())
}

fn show_info<D: sha2::Digest>(
    engine: &SignatureEngine<D>,
    path: &Path,
    check: bool,
) -> Result<()> {
    let key = files::read_key_file(engine, path)
        .with_context(|| format!("Cannot read key {}", path.display()))?;
    let params = key.params();

    println!("Key File Info:");
    match &key {
        KeyFile::Public(public) => {
            println!("  Kind: public");
            println!("  Bits: {}", params.bits());
            println!("  P: {}", hex::encode(to_magnitude(&params.p)));
            println!("  G: {}", hex::encode(to_magnitude(&params.g)));
            println!("  Y: {}", hex::encode(to_magnitude(&public.y)));
        }
        KeyFile::Private(_) => {
            println!("  Kind: private");
            println!("  Bits: {}", params.bits());
            println!("  P: {}", hex::encode(to_magnitude(&params.p)));
            println!("  G: {}", hex::encode(to_magnitude(&params.g)));
        }
    }

    if check {
        validate_parameters(params, engine.config().rounds, &mut OsRng)?;
        println!("  Parameters: valid safe-prime group");
    }

    Ok(())
}
