use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Tessera credential core CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Signing key management
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Mint and verify tickets, session tokens and testing tokens
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },

    /// Claim template tooling
    Template {
        #[command(subcommand)]
        cmd: TemplateCommand,
    },

    /// Configuration tooling
    Config {
        #[command(subcommand)]
        cmd: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a new Ed25519 signing key
    Generate {
        /// Directory to write `<name>.key` and `<name>.pub` into. Prints to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Base file name for the key pair
        #[arg(long, default_value = "signing")]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Mint a ticket for a source record
    Ticket {
        /// Private key: a file path or a hex string
        #[arg(long, env = "TESSERA_PRIVATE_KEY")]
        key: Option<String>,

        #[arg(long)]
        tenant: String,

        /// Source type, e.g. sign_in, invitation, organization_invitation
        #[arg(long)]
        source_type: String,

        #[arg(long)]
        source_id: String,

        #[arg(long)]
        purpose: String,

        #[arg(long)]
        subject: Option<String>,

        #[arg(long)]
        redirect_url: Option<String>,

        /// Requested lifetime, e.g. 30m, 1h, 7d (clamped to the tenant maximum)
        #[arg(long)]
        ttl: Option<String>,

        /// Configuration file providing tenant token limits
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Verify a ticket or session token against a public key
    Verify {
        token: String,

        /// Public key: a file path or a hex string
        #[arg(long, env = "TESSERA_PUBLIC_KEY")]
        public_key: Option<String>,

        /// Token type: ticket or session
        #[arg(long = "type", default_value = "ticket")]
        kind: String,
    },

    /// Issue (or check) the deterministic testing token for a domain
    Testing {
        #[arg(long)]
        domain: String,

        #[arg(long, env = "TESSERA_TESTING_SECRET", hide_env_values = true)]
        secret: String,

        /// Window length in seconds
        #[arg(long, default_value_t = 600)]
        window: u64,

        /// Verify this token instead of issuing one
        #[arg(long)]
        verify: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// Validate a claim template file (JSON or YAML)
    Check {
        file: PathBuf,

        /// Resolve the template against a subject snapshot file and print the claims
        #[arg(long)]
        subject: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a tessera.yaml file
    Check { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { output, name } => {
                println!("{}", commands::keys::generate(output, &name)?)
            }
        },

        Command::Token { cmd } => match cmd {
            TokenCommand::Ticket {
                key,
                tenant,
                source_type,
                source_id,
                purpose,
                subject,
                redirect_url,
                ttl,
                config,
            } => {
                let args = commands::token::TicketArgs {
                    key,
                    tenant,
                    source_type,
                    source_id,
                    purpose,
                    subject,
                    redirect_url,
                    ttl,
                    config,
                };
                println!("{}", commands::token::ticket(args)?);
            }
            TokenCommand::Verify {
                token,
                public_key,
                kind,
            } => println!("{}", commands::token::verify(&token, public_key, &kind)?),
            TokenCommand::Testing {
                domain,
                secret,
                window,
                verify,
            } => println!(
                "{}",
                commands::token::testing(&domain, &secret, window, verify.as_deref())?
            ),
        },

        Command::Template { cmd } => match cmd {
            TemplateCommand::Check { file, subject } => {
                println!("{}", commands::template::check(&file, subject.as_deref())?)
            }
        },

        Command::Config { cmd } => match cmd {
            ConfigCommand::Check { file } => println!("{}", commands::config::check(&file)?),
        },
    }

    Ok(())
}
