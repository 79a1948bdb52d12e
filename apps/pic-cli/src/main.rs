//! # pic-cli
//!
//! Command-line interface for the Provenance & Intent Contract (PIC).
//!
//! - `pic schema <file>` validate a proposal's structure
//! - `pic verify <file>` run a proposal through the full pipeline
//! - `pic evidence-verify <file>` check each evidence entry
//! - `pic keys` / `pic policy` inspect the trusted keyring and impact policy
//! - `pic keygen` / `pic sign` produce Ed25519 keys and signatures
//! - `pic serve` start the loopback HTTP bridge
//!
//! Exit codes: 0 ok, 1 bootstrap error, 2 schema invalid, 3 blocked.

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use commands::Bootstrap;
use config::PicConfig;

/// PIC CLI: validate, verify, sign and serve Action Proposals.
#[derive(Parser)]
#[command(name = "pic", version, about)]
struct Cli {
    /// Project root directory (holds pic.toml, pic_keys.json, pic_policy.json).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Keyring file (overrides PIC_KEYS_PATH and pic.toml).
    #[arg(long, global = true)]
    keys: Option<PathBuf>,

    /// Policy file (overrides PIC_POLICY_PATH and pic.toml).
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Include diagnostic details in blocked decisions.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a proposal against the schema.
    Schema { file: PathBuf },
    /// Validate and verify a proposal through the full pipeline.
    Verify {
        file: PathBuf,
        /// The tool the proposal must be bound to.
        #[arg(long)]
        tool: Option<String>,
        /// Verify attached evidence (hash and signature).
        #[arg(long)]
        verify_evidence: bool,
    },
    /// Verify only the evidence entries of a proposal.
    EvidenceVerify { file: PathBuf },
    /// Show the trusted keyring and key statuses.
    Keys {
        /// Print an example keyring instead.
        #[arg(long)]
        write_example: bool,
    },
    /// Show the effective impact policy.
    Policy,
    /// Generate an Ed25519 signing key.
    Keygen {
        #[arg(long, default_value = "my_signer_v1")]
        key_id: String,
    },
    /// Sign a payload file with an Ed25519 private key.
    Sign {
        /// Base64 PKCS#8 private key (as printed by `pic keygen`).
        #[arg(long, env = "PIC_SIGNING_KEY", hide_env_values = true)]
        private_key: String,
        file: PathBuf,
    },
    /// Start the HTTP bridge on localhost.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Verify attached evidence.
        #[arg(long)]
        verify_evidence: bool,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr so they don't interfere with decisions on stdout.
    let filter = EnvFilter::from_default_env();
    let filter = [
        "pic_keyring=info",
        "pic_policy=info",
        "pic_evidence=info",
        "pic_verifier=info",
        "pic_bridge=info",
        "pic=info",
    ]
    .iter()
    .filter_map(|d| d.parse::<Directive>().ok())
    .fold(filter, |f, d| f.add_directive(d));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(commands::EXIT_BOOTSTRAP)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);

    let mut config = PicConfig::load(&project_root)?;
    config.apply_env();
    if let Some(keys) = cli.keys {
        config.keys_path = Some(keys);
    }
    if let Some(policy) = cli.policy {
        config.policy_path = Some(policy);
    }
    config.debug |= cli.debug;
    config.unify_debug();

    let ok = || ExitCode::from(commands::EXIT_OK);

    match cli.command {
        Commands::Schema { file } => commands::schema::execute(&file),
        Commands::Verify {
            file,
            tool,
            verify_evidence,
        } => {
            config.verify_evidence |= verify_evidence;
            let boot = Bootstrap::new(project_root, config);
            commands::verify::execute(&boot, &file, tool.as_deref())
        }
        Commands::EvidenceVerify { file } => {
            commands::evidence::execute(&Bootstrap::new(project_root, config), &file)
        }
        Commands::Keys { write_example } => {
            commands::keys::execute(&Bootstrap::new(project_root, config), write_example)
                .map(|_| ok())
        }
        Commands::Policy => {
            commands::policy::execute(&Bootstrap::new(project_root, config)).map(|_| ok())
        }
        Commands::Keygen { key_id } => commands::signing::execute_keygen(&key_id).map(|_| ok()),
        Commands::Sign { private_key, file } => {
            commands::signing::execute_sign(&private_key, &file).map(|_| ok())
        }
        Commands::Serve {
            host,
            port,
            verify_evidence,
        } => {
            if let Some(host) = host {
                config.bridge.host = host;
            }
            if let Some(port) = port {
                config.bridge.port = port;
            }
            config.verify_evidence |= verify_evidence;
            commands::serve::execute(&Bootstrap::new(project_root, config)).map(|_| ok())
        }
    }
}
