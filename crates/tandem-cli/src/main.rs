//! Tandem CLI
//!
//! Offline tooling for hybrid (ECDSA + post-quantum) transactions: key
//! generation, building and signing, inspection and verification.
//!
//! `tandem pq ...` speaks the external signer protocol, so the binary can
//! itself be configured as the signer command of another `tandem`.

mod config;
mod view;

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use num_traits::{Num, Zero};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tandem_core::prelude::*;
use tandem_crypto::{
    load_ecdsa_key, load_pq_public_key, load_pq_secret_key, save_ecdsa_key, save_pq_keypair,
    CommandPqSigner, DilithiumSigner, DilithiumVerifier, EcdsaSecretKey, PqAlgorithm, PqKeyFiles,
    Secp256k1,
};

use crate::config::{ChainConfig, CliConfig, SignerMode};
use crate::view::TransactionView;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(version)]
#[command(about = "Hybrid post-quantum transaction tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "tandem.toml")]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Post-quantum keys and signatures (external signer protocol)
    Pq {
        #[command(subcommand)]
        command: PqCommands,
    },

    /// secp256k1 keys
    Ecdsa {
        #[command(subcommand)]
        command: EcdsaCommands,
    },

    /// Build, hash, inspect and verify transactions
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
}

#[derive(Subcommand)]
enum PqCommands {
    /// Generate a keypair; prints the private and public key paths last
    GenerateKeypair {
        /// Output directory (defaults to keys.pq_key_dir)
        dir: Option<PathBuf>,

        /// dilithium2, dilithium3 or dilithium5
        #[arg(short, long)]
        algorithm: Option<PqAlgorithm>,
    },

    /// Sign a 32-byte hash; prints the tagged signature as hex
    Sign {
        private_key: PathBuf,
        hash: String,
    },

    /// Verify a tagged signature; prints true or false
    Verify {
        public_key: PathBuf,
        hash: String,
        signature: String,
    },

    /// Print a public key file as hex
    GetPublicKey {
        public_key: PathBuf,
    },
}

#[derive(Subcommand)]
enum EcdsaCommands {
    /// Generate a secp256k1 key and print its address
    Keygen {
        /// Key file (defaults to keys.ecdsa_key)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Print the address of a key file
    Address {
        /// Key file (defaults to keys.ecdsa_key)
        #[arg(short, long)]
        key: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TxCommands {
    /// Print the signing hash of an unsigned transaction
    Hash {
        #[command(flatten)]
        fields: TxArgs,

        /// Also print the hash preimage
        #[arg(long)]
        payload: bool,
    },

    /// Sign a transaction and print its raw encoding
    Build {
        #[command(flatten)]
        fields: TxArgs,

        /// ECDSA key file (defaults to keys.ecdsa_key)
        #[arg(long)]
        key: Option<PathBuf>,

        /// PQ private key file (defaults to keys.pq_key_dir)
        #[arg(long)]
        pq_key: Option<PathBuf>,

        /// PQ public key file (defaults to keys.pq_key_dir)
        #[arg(long)]
        pq_public_key: Option<PathBuf>,

        /// Algorithm used to locate default PQ key files
        #[arg(long)]
        algorithm: Option<PqAlgorithm>,

        /// Classical signature only
        #[arg(long, conflicts_with = "require_pq")]
        no_pq: bool,

        /// Fail instead of falling back when PQ keys are missing
        #[arg(long)]
        require_pq: bool,
    },

    /// Decode a raw transaction and print it as JSON
    Inspect {
        raw: String,
    },

    /// Verify both signatures of a raw transaction
    Verify {
        raw: String,

        /// Address the transaction must be signed by
        #[arg(long)]
        sender: String,
    },
}

/// Unsigned transaction fields. Scalars accept decimal or 0x-hex.
#[derive(Args, Debug)]
struct TxArgs {
    /// Defaults to chain.chain_id
    #[arg(long)]
    chain_id: Option<String>,

    #[arg(long, default_value_t = 0)]
    nonce: u64,

    /// Defaults to chain.max_priority_fee_per_gas
    #[arg(long)]
    max_priority_fee: Option<String>,

    /// Defaults to chain.max_fee_per_gas
    #[arg(long)]
    max_fee: Option<String>,

    /// Defaults to chain.gas_limit
    #[arg(long)]
    gas_limit: Option<u64>,

    /// Recipient; omit for contract creation
    #[arg(long)]
    to: Option<String>,

    #[arg(long, default_value = "0")]
    value: String,

    /// Call data as hex
    #[arg(long, default_value = "")]
    data: String,

    /// Access-list entry `ADDRESS[:KEY,KEY...]`, repeatable
    #[arg(long = "access")]
    access_list: Vec<String>,
}

impl TxArgs {
    fn to_unsigned(&self, chain: &ChainConfig) -> anyhow::Result<UnsignedTransaction> {
        let chain_id = match &self.chain_id {
            Some(s) => parse_scalar("chain-id", s)?,
            None => Scalar::from(chain.chain_id),
        };
        let max_priority_fee_per_gas = parse_scalar(
            "max-priority-fee",
            self.max_priority_fee.as_deref().unwrap_or(&chain.max_priority_fee_per_gas),
        )?;
        let max_fee_per_gas = parse_scalar(
            "max-fee",
            self.max_fee.as_deref().unwrap_or(&chain.max_fee_per_gas),
        )?;

        let to = self
            .to
            .as_deref()
            .map(Address::from_hex)
            .transpose()
            .context("invalid --to")?;

        let access_list = self
            .access_list
            .iter()
            .map(|entry| parse_access_entry(entry))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(UnsignedTransaction {
            chain_id,
            nonce: self.nonce,
            max_priority_fee_per_gas,
            max_fee_per_gas,
            gas_limit: self.gas_limit.unwrap_or(chain.gas_limit),
            to,
            value: parse_scalar("value", &self.value)?,
            data: parse_hex("data", &self.data)?,
            access_list,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries protocol output only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false),
        )
        .init();
}

fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

fn parse_scalar(name: &str, s: &str) -> anyhow::Result<Scalar> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x") {
        Some("") => Ok(Scalar::zero()),
        Some(digits) => Scalar::from_str_radix(digits, 16),
        None => Scalar::from_str_radix(s, 10),
    };
    parsed.with_context(|| format!("invalid {}: {:?}", name, s))
}

fn parse_hex(name: &str, s: &str) -> anyhow::Result<Vec<u8>> {
    let s = s.trim();
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).with_context(|| format!("invalid {} hex", name))
}

/// Storage keys shorter than 32 bytes are left-padded
fn parse_storage_key(s: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = parse_hex("storage key", s)?;
    if bytes.len() > 32 {
        bail!("storage key {} is longer than 32 bytes", s);
    }
    let mut key = [0u8; 32];
    key[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(key)
}

fn parse_access_entry(s: &str) -> anyhow::Result<AccessListEntry> {
    let (address, keys) = match s.split_once(':') {
        Some((address, keys)) => (address, keys),
        None => (s, ""),
    };
    let address = Address::from_hex(address).with_context(|| format!("invalid access entry {}", s))?;
    let storage_keys = keys
        .split(',')
        .filter(|k| !k.trim().is_empty())
        .map(parse_storage_key)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(AccessListEntry::new(address, storage_keys))
}

fn command_signer(config: &CliConfig) -> anyhow::Result<CommandPqSigner> {
    let program = config
        .signer
        .command
        .as_deref()
        .context("signer.mode = \"command\" requires signer.command")?;
    Ok(
        CommandPqSigner::new(expand_path(Path::new(program)), expand_path(Path::new(&config.keys.pq_key_dir)))
            .with_base_args(config.signer.args.iter().cloned()),
    )
}

fn pq_verifier(config: &CliConfig) -> anyhow::Result<Box<dyn PqVerifier>> {
    Ok(match config.signer.mode {
        SignerMode::InProcess => Box::new(DilithiumVerifier),
        SignerMode::Command => Box::new(command_signer(config)?),
    })
}

fn ecdsa_key_path(config: &CliConfig, key: Option<PathBuf>) -> PathBuf {
    expand_path(&key.unwrap_or_else(|| PathBuf::from(&config.keys.ecdsa_key)))
}

fn decode_raw(raw: &str) -> anyhow::Result<SignedTransaction> {
    let bytes = parse_hex("raw transaction", raw)?;
    Ok(SignedTransaction::decode(&bytes)?)
}

// ============================================================================
// Commands
// ============================================================================

fn run_pq(config: &CliConfig, command: PqCommands) -> anyhow::Result<()> {
    match command {
        PqCommands::GenerateKeypair { dir, algorithm } => {
            let algorithm = match algorithm {
                Some(algorithm) => algorithm,
                None => config.signer.algorithm.parse()?,
            };
            let dir = expand_path(&dir.unwrap_or_else(|| PathBuf::from(&config.keys.pq_key_dir)));

            let (secret_key, public_key) = DilithiumSigner::new(algorithm)?.generate()?;
            let files = save_pq_keypair(&dir, &secret_key, &public_key)?;

            println!("{}", files.private_key.display());
            println!("{}", files.public_key.display());
        }

        PqCommands::Sign { private_key, hash } => {
            let secret_key = load_pq_secret_key(&private_key)?;
            let digest = TxHash::from_hex(&hash)?;
            let signature = secret_key.sign(digest.as_bytes())?;

            tracing::debug!(algorithm = %signature.algorithm, %digest, "Signed hash");
            println!("{}", hex::encode(signature.to_bytes()));
        }

        PqCommands::Verify {
            public_key,
            hash,
            signature,
        } => {
            let public_key = fs::read(&public_key)
                .with_context(|| format!("reading {}", public_key.display()))?;
            let digest = TxHash::from_hex(&hash)?;
            let signature = parse_hex("signature", &signature)?;

            let valid = DilithiumVerifier::verify_message(&public_key, digest.as_bytes(), &signature)?;
            println!("{}", valid);
        }

        PqCommands::GetPublicKey { public_key } => {
            let (algorithm, bytes) = load_pq_public_key(&public_key)?;
            tracing::debug!(%algorithm, len = bytes.len(), "Loaded public key");
            println!("{}", hex::encode(bytes));
        }
    }
    Ok(())
}

fn run_ecdsa(config: &CliConfig, command: EcdsaCommands) -> anyhow::Result<()> {
    match command {
        EcdsaCommands::Keygen { output, force } => {
            let path = ecdsa_key_path(config, output);
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }

            let key = EcdsaSecretKey::generate();
            save_ecdsa_key(&path, &key)?;
            tracing::info!(path = %path.display(), "Saved ECDSA key");
            println!("{}", key.address());
        }

        EcdsaCommands::Address { key } => {
            let key = load_ecdsa_key(ecdsa_key_path(config, key))?;
            println!("{}", key.address());
        }
    }
    Ok(())
}

/// Post-quantum half of `tx build`
struct PqOptions {
    pq_key: Option<PathBuf>,
    pq_public_key: Option<PathBuf>,
    algorithm: Option<PqAlgorithm>,
    no_pq: bool,
    require_pq: bool,
}

fn attach_pq(
    config: &CliConfig,
    classical: ClassicallySigned,
    options: PqOptions,
) -> anyhow::Result<SignedTransaction> {
    if options.no_pq {
        return Ok(classical.fallback());
    }

    let algorithm = match options.algorithm {
        Some(algorithm) => algorithm,
        None => config.signer.algorithm.parse()?,
    };
    let defaults = PqKeyFiles::in_dir(expand_path(Path::new(&config.keys.pq_key_dir)), algorithm);
    let private_key = options.pq_key.map(|p| expand_path(&p)).unwrap_or(defaults.private_key);
    let public_key = options.pq_public_key.map(|p| expand_path(&p)).unwrap_or(defaults.public_key);

    if !private_key.exists() || !public_key.exists() {
        if options.require_pq {
            bail!(
                "post-quantum keys not found ({}, {})",
                private_key.display(),
                public_key.display()
            );
        }
        tracing::warn!(
            private_key = %private_key.display(),
            public_key = %public_key.display(),
            "Post-quantum keys not found, signing classical-only"
        );
        return Ok(classical.fallback());
    }

    let public_key_bytes =
        fs::read(&public_key).with_context(|| format!("reading {}", public_key.display()))?;

    let signed = match config.signer.mode {
        SignerMode::InProcess => {
            let secret_key = load_pq_secret_key(&private_key)?;
            let signer = DilithiumSigner::new(secret_key.algorithm())?;
            classical.attach_pq(&signer, &secret_key, public_key_bytes)?
        }
        SignerMode::Command => {
            let signer = command_signer(config)?;
            classical.attach_pq(&signer, &private_key, public_key_bytes)?
        }
    };
    Ok(signed)
}

fn run_tx(config: &CliConfig, command: TxCommands) -> anyhow::Result<()> {
    match command {
        TxCommands::Hash { fields, payload } => {
            let tx = fields.to_unsigned(&config.chain)?;
            if payload {
                println!("0x{}", hex::encode(tx.signing_payload()));
            }
            println!("{}", tx.hash());
        }

        TxCommands::Build {
            fields,
            key,
            pq_key,
            pq_public_key,
            algorithm,
            no_pq,
            require_pq,
        } => {
            let tx = fields.to_unsigned(&config.chain)?;
            let ecdsa_key = load_ecdsa_key(ecdsa_key_path(config, key))?;
            let sender = ecdsa_key.address();

            let classical = tx.sign_classical(&Secp256k1, &ecdsa_key)?;
            let options = PqOptions {
                pq_key,
                pq_public_key,
                algorithm,
                no_pq,
                require_pq,
            };
            let signed = attach_pq(config, classical, options)?;

            // Check locally before handing the bytes out
            let pq = pq_verifier(config)?;
            let verdict = HybridVerifier::new(&Secp256k1, &*pq, sender).verify(&signed)?;
            if let Verdict::Rejected(reason) = verdict {
                bail!("freshly signed transaction failed verification: {}", reason);
            }

            tracing::info!(
                hash = %signed.signing_hash(),
                %sender,
                mode = %signed.mode(),
                "Built transaction"
            );
            println!("0x{}", hex::encode(signed.encode()));
        }

        TxCommands::Inspect { raw } => {
            let tx = decode_raw(&raw)?;
            println!("{}", serde_json::to_string_pretty(&TransactionView::from(&tx))?);
        }

        TxCommands::Verify { raw, sender } => {
            let tx = decode_raw(&raw)?;
            let sender = Address::from_hex(&sender).context("invalid --sender")?;
            let pq = pq_verifier(config)?;

            match HybridVerifier::new(&Secp256k1, &*pq, sender).verify(&tx)? {
                Verdict::Accepted { sender, mode } => {
                    println!("accepted sender={} mode={}", sender, mode);
                }
                Verdict::Rejected(reason) => {
                    println!("rejected: {}", reason);
                    bail!("transaction {} rejected", tx.signing_hash());
                }
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = CliConfig::load(&expand_path(&cli.config))?;

    let result = match cli.command {
        Commands::Pq { command } => run_pq(&config, command),
        Commands::Ecdsa { command } => run_ecdsa(&config, command),
        Commands::Tx { command } => run_tx(&config, command),
    };

    if let Some(err) = result.as_ref().err().and_then(|e| e.downcast_ref::<TxError>()) {
        tracing::error!(code = err.code(), error = %err, "Transaction error");
    }
    result
}
