mod commands;
mod config;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{CommandError, Context};
use config::Config;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "compdesc",
    version,
    about = "Normalise, hash, compare, convert and resolve component descriptors."
)]
struct Cli {
    /// Config file (default: ~/.config/compdesc/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the canonical signing bytes of a descriptor.
    Normalize {
        /// Descriptor file, or `-` for stdin.
        file: PathBuf,
        /// Normalisation algorithm (default from config).
        #[arg(long)]
        algorithm: Option<String>,
    },
    /// Print the digest of a descriptor's canonical bytes.
    Hash {
        file: PathBuf,
        #[arg(long)]
        algorithm: Option<String>,
        /// Hash algorithm: SHA-256, SHA-512 or BLAKE3.
        #[arg(long)]
        hash: Option<String>,
    },
    /// Check a descriptor against its schema version.
    Validate {
        file: PathBuf,
        /// Reject fields the schema version does not define.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Re-encode a descriptor in another schema version.
    Convert {
        file: PathBuf,
        /// Target version, e.g. `v2` or `ocm.software/v3alpha1`.
        #[arg(long)]
        to: Option<String>,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare two descriptors; exits 0 only when they are equivalent.
    Equivalent { a: PathBuf, b: PathBuf },
    /// Follow references from a root descriptor.
    Resolve {
        /// Root descriptor file.
        root: PathBuf,
        /// Reference identity per hop, as `name[,key=value...]`.
        #[arg(long = "path", value_name = "IDENTITY")]
        path: Vec<String>,
        /// Resource identity to pick in the reached component version.
        #[arg(long, value_name = "IDENTITY")]
        resource: Option<String>,
        /// Additional descriptor store, searched before the configured ones.
        #[arg(long, value_name = "DIR")]
        lookup: Vec<PathBuf>,
    },
    /// Write a config file with default settings.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("COMPDESC_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.code)
        }
    }
}

fn run(cli: Cli) -> Result<u8, CommandError> {
    let config_path = cli.config.as_deref().map(config::expand_tilde);
    match cli.command {
        Commands::Completions { shell } => return commands::completions::run::<Cli>(shell),
        Commands::InitConfig { force } => {
            return commands::init_config::run(config_path.as_deref(), force)
        }
        _ => {}
    }

    let config = Config::load_or_default(config_path.as_deref())?;
    let ctx = Context::new(config, cli.json)?;

    match cli.command {
        Commands::Normalize { file, algorithm } => {
            commands::normalize::run(&ctx, &file, algorithm.as_deref())
        }
        Commands::Hash {
            file,
            algorithm,
            hash,
        } => commands::hash::run(&ctx, &file, algorithm.as_deref(), hash.as_deref()),
        Commands::Validate { file, strict } => commands::validate::run(&ctx, &file, strict),
        Commands::Convert { file, to, output } => {
            commands::convert::run(&ctx, &file, to.as_deref(), output.as_deref())
        }
        Commands::Equivalent { a, b } => commands::equivalent::run(&ctx, &a, &b),
        Commands::Resolve {
            root,
            path,
            resource,
            lookup,
        } => commands::resolve::run(&ctx, &root, &path, resource.as_deref(), &lookup),
        Commands::InitConfig { .. } | Commands::Completions { .. } => {
            Ok(commands::EXIT_SUCCESS)
        }
    }
}
