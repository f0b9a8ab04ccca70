//! sshca - SSH certificate client

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use sshca_auth::{CertificateFlags, TokenSource};
use sshca_cli::agent::SshAgent;
use sshca_cli::ca::HttpAuthority;
use sshca_cli::commands::{issue_certificate, plan_issuance, Collaborators, IssueTarget};
use sshca_cli::config::CliConfig;
use sshca_cli::provisioner::JwkProvisioner;
use sshca_cli::secret::TerminalPrompt;
use sshca_cli::utils::render_report;

/// sshca - SSH user and host certificates from your certificate authority
#[derive(Parser)]
#[command(name = "sshca", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate or sign a key and get an SSH certificate for it
    #[command(name = "ssh-certificate")]
    SshCertificate(CertificateArgs),
}

#[derive(Args)]
struct CertificateArgs {
    /// Certificate identity: key ID, token subject and file comment
    key_id: String,

    /// Private key to create, or public key to certify with --sign
    key_file: PathBuf,

    /// One-time token authorizing the request
    #[arg(long)]
    token: Option<String>,

    /// Principal to include (repeatable); defaults to the key ID
    #[arg(short = 'n', long = "principal", value_name = "NAME")]
    principals: Vec<String>,

    /// Request a host certificate instead of a user certificate
    #[arg(long)]
    host: bool,

    /// Certify the existing public key at <KEY_FILE>
    #[arg(long)]
    sign: bool,

    /// Start of validity: RFC 3339 time or duration from now (e.g. 5m, -1h)
    #[arg(long, value_name = "TIME|DURATION")]
    not_before: Option<String>,

    /// End of validity: RFC 3339 time or duration from now (e.g. 24h)
    #[arg(long, value_name = "TIME|DURATION")]
    not_after: Option<String>,

    /// File with the password to encrypt the private key
    #[arg(long, value_name = "FILE")]
    password_file: Option<PathBuf>,

    /// Provisioner name used to mint the token
    #[arg(short = 'p', long)]
    provisioner: Option<String>,

    /// OpenSSH Ed25519 private key of the provisioner
    #[arg(long, value_name = "FILE")]
    provisioner_key: Option<PathBuf>,

    /// File with the password to decrypt the provisioner key
    #[arg(long, value_name = "FILE")]
    provisioner_password_file: Option<PathBuf>,

    /// Also create a provisioner identity that can add new users
    #[arg(long)]
    add_user: bool,

    /// Certificate authority URL
    #[arg(long, value_name = "URL")]
    ca_url: Option<String>,

    /// PEM root certificate of the certificate authority
    #[arg(long, value_name = "FILE")]
    root: Option<PathBuf>,

    /// Write the private key unencrypted (requires --insecure)
    #[arg(long)]
    no_password: bool,

    /// Allow insecure operations
    #[arg(long)]
    insecure: bool,
}

impl CertificateArgs {
    fn into_parts(self) -> (CertificateFlags, CliConfig, IssueTarget) {
        let flags = CertificateFlags {
            token: self.token,
            principals: self.principals,
            host: self.host,
            sign: self.sign,
            add_user: self.add_user,
            not_before: self.not_before,
            not_after: self.not_after,
            password_file: self.password_file,
            provisioner_password_file: self.provisioner_password_file,
            no_password: self.no_password,
            insecure: self.insecure,
        };
        let overrides = CliConfig {
            ca_url: self.ca_url,
            root: self.root,
            provisioner: self.provisioner,
            provisioner_key: self.provisioner_key,
        };
        let target = IssueTarget {
            subject: self.key_id,
            key_file: self.key_file,
        };
        (flags, overrides, target)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli).await;

    if let Err(e) = &result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("sshca=debug,sshca_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::SshCertificate(args) => cmd_ssh_certificate(cli.config.as_deref(), args).await,
    }
}

async fn cmd_ssh_certificate(config_path: Option<&Path>, args: CertificateArgs) -> Result<()> {
    let (flags, overrides, target) = args.into_parts();

    // Flag conflicts are reported before anything is read or written
    let plan = plan_issuance(flags, Utc::now())?;

    let config = CliConfig::load(config_path)
        .context("Failed to load configuration")?
        .with_env()
        .with_overrides(overrides);
    let ca_url = config.ca_url()?;

    let authority = HttpAuthority::new(ca_url, config.root.as_deref())?;
    let provisioner_password_file = match &plan.token {
        TokenSource::Mint {
            provisioner_password_file,
        } => provisioner_password_file.clone(),
        TokenSource::Provided(_) => None,
    };
    let minter = JwkProvisioner::new(
        config.provisioner.clone(),
        config.provisioner_key.clone(),
        ca_url,
        provisioner_password_file,
        Box::new(TerminalPrompt),
    );
    let agent = SshAgent::from_env();

    let deps = Collaborators {
        authority: &authority,
        minter: &minter,
        prompt: &TerminalPrompt,
        agent: &agent,
    };
    let report = issue_certificate(&plan, &target, &deps).await?;

    for line in render_report(&report) {
        eprintln!("{line}");
    }

    Ok(())
}
