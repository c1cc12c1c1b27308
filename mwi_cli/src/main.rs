//! mingw-installer CLI - resolve, download and unpack MinGW-w64 toolchains.

use clap::{Args, Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mwi_core::{Error, ReleaseOptions};
use mwi_io::{Config, create_installer};

mod commands;
mod display;

#[derive(Parser)]
#[command(name = "mwi")]
#[command(about = "Install prebuilt MinGW-w64 toolchains from the mingw-builds release matrix")]
#[command(version)]
struct Cli {
    /// Root directory for downloaded archives and installed toolchains
    #[arg(long, env = "MWI_ROOT", default_value = "/opt/mingw-installer")]
    root: PathBuf,

    /// JSON release table to use instead of the built-in one
    #[arg(long, env = "MWI_MATRIX")]
    matrix: Option<PathBuf>,

    /// Base URL of a SourceForge mirror to download from
    #[arg(long, env = "MWI_MIRROR")]
    mirror: Option<String>,

    /// Path of the 7-Zip executable (default: 7z, 7za or 7zr from PATH)
    #[arg(long, env = "MWI_SEVEN_ZIP")]
    seven_zip: Option<PathBuf>,

    /// Download timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Show debug logging (or set MWI_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Toolchain selection shared by every command that targets one release.
#[derive(Args, Clone, Debug, Default)]
struct ToolchainArgs {
    /// GCC version, e.g. 6.3 [default: 4.9]
    #[arg(long = "gcc-version")]
    gcc_version: Option<String>,

    /// Target architecture: x86 or x86_64 [default: x86_64]
    #[arg(long)]
    arch: Option<String>,

    /// Exception model: sjlj, seh or dwarf2 [default: sjlj]
    #[arg(long)]
    exception: Option<String>,

    /// Threading model: posix or win32 [default: posix]
    #[arg(long)]
    threads: Option<String>,
}

impl ToolchainArgs {
    fn options(&self) -> Result<ReleaseOptions, Error> {
        let defaults = ReleaseOptions::default();
        let arch = defaults.architecture.to_string();
        let exception = defaults.exception_model.to_string();
        let threads = defaults.threading_model.to_string();

        ReleaseOptions::parse(
            self.gcc_version.as_deref().unwrap_or(&defaults.version),
            self.arch.as_deref().unwrap_or(&arch),
            self.exception.as_deref().unwrap_or(&exception),
            self.threads.as_deref().unwrap_or(&threads),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the values each option accepts
    Options {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every release in the matrix
    Releases {
        /// Only show releases of this GCC version
        #[arg(long = "gcc-version")]
        gcc_version: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a combination and show the release it maps to
    Resolve {
        #[command(flatten)]
        toolchain: ToolchainArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the download URL of a combination
    Url {
        #[command(flatten)]
        toolchain: ToolchainArgs,
    },

    /// Download and unpack a toolchain
    Install {
        #[command(flatten)]
        toolchain: ToolchainArgs,
    },

    /// Remove an installed toolchain
    Uninstall {
        #[command(flatten)]
        toolchain: ToolchainArgs,
    },

    /// List installed toolchains
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print shell commands exposing an installed toolchain (PATH, CC, CXX)
    Env {
        #[command(flatten)]
        toolchain: ToolchainArgs,

        /// Shell type (bash, zsh, fish, csh). Auto-detected if not specified.
        #[arg(long, short)]
        shell: Option<String>,
    },

    /// Remove downloaded archives
    Cleanup {
        /// Show what would be removed without doing it
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("MWI_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "warn" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let overrides = Config {
        mirror: cli.mirror,
        seven_zip: cli.seven_zip,
        matrix_file: cli.matrix,
        timeout_secs: cli.timeout,
    };
    let root = cli.root;
    let config = Config::load(&root)?.merged(overrides);
    debug!(root = %root.display(), ?config, "loaded configuration");

    // Matrix queries read the config but never create the root
    let installer = || create_installer(&root, &config);

    match cli.command {
        Commands::Options { json } => commands::query::run_options(&config.load_matrix()?, json),

        Commands::Releases { gcc_version, json } => commands::query::run_releases(
            &config.load_matrix()?,
            gcc_version.as_deref(),
            json,
        ),

        Commands::Resolve { toolchain, json } => {
            commands::query::run_resolve(&config.load_matrix()?, &toolchain.options()?, json)
        }

        Commands::Url { toolchain } => {
            commands::query::run_url(&config.load_matrix()?, &toolchain.options()?)
        }

        Commands::Install { toolchain } => {
            let options = toolchain.options()?;
            commands::install::run(&installer()?, &options).await
        }

        Commands::Uninstall { toolchain } => {
            let options = toolchain.options()?;
            commands::packages::run_uninstall(&installer()?, &options)
        }

        Commands::List { json } => commands::packages::run_list(&installer()?, json),

        Commands::Env { toolchain, shell } => {
            let options = toolchain.options()?;
            commands::packages::run_env(&installer()?, &options, shell.as_deref())
        }

        Commands::Cleanup { dry_run } => commands::packages::run_cleanup(&installer()?, dry_run),
    }
}
