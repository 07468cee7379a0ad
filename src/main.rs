// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use hapm::manager::PackageManager;
use hapm::manifest::{Manifest, PackageLocation};
use hapm::packages::PackageKind;
use hapm::report;
use hapm::repository::{GitHubClient, TOKEN_VAR};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

/// Default storage directory for payloads and the lock record
const DEFAULT_STORAGE: &str = ".hapm";

#[derive(Parser)]
#[command(name = "hapm")]
#[command(author, version, about = "Home Assistant package manager", long_about = None)]
struct Cli {
    /// Manifest path
    #[arg(short, long, global = true, default_value = hapm::manifest::DEFAULT_PATH)]
    manifest: PathBuf,

    /// Storage directory
    #[arg(short, long, global = true, default_value = DEFAULT_STORAGE)]
    storage: PathBuf,

    /// Only show what would change
    #[arg(short, long, global = true)]
    dry: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty manifest
    Init,
    /// Synchronize storage with the manifest
    Sync {
        /// Allow pre-release versions when resolving `latest`
        #[arg(short = 'u', long)]
        allow_unstable: bool,
    },
    /// Add packages to the manifest and synchronize
    Install {
        /// Package locations (owner/repo[@version] or GitHub URL)
        #[arg(required = true)]
        locations: Vec<String>,
        /// Kind of the new packages (integrations, plugins)
        #[arg(short = 't', long = "type")]
        kind: Option<PackageKind>,
        /// Allow pre-release versions when resolving `latest`
        #[arg(short = 'u', long)]
        allow_unstable: bool,
    },
    /// Show packages that have newer versions
    Updates {
        /// Include pre-release versions
        #[arg(short = 'u', long)]
        allow_unstable: bool,
    },
    /// List upstream versions of a package
    Versions {
        /// Package location
        location: String,
    },
    /// List installed packages
    List,
    /// Copy installed packages into a Home Assistant config directory
    Export {
        /// Target directory (emptied first)
        path: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error while {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Init => cmd_init(cli),
        Commands::Sync { allow_unstable } => {
            let client = open_client()?;
            let mut manager = open_manager(cli, &client)?;
            let mut manifest = Manifest::new(&cli.manifest);
            manifest.load().context("parsing manifest")?;
            synchronize(cli, &client, &mut manager, &manifest, !allow_unstable)
        }
        Commands::Install {
            locations,
            kind,
            allow_unstable,
        } => cmd_install(cli, locations, *kind, !allow_unstable),
        Commands::Updates { allow_unstable } => cmd_updates(cli, !allow_unstable),
        Commands::Versions { location } => cmd_versions(cli, location),
        Commands::List => {
            let client = open_client()?;
            let manager = open_manager(cli, &client)?;
            print!("{}", report::format_packages(&manager.descriptions()));
            Ok(())
        }
        Commands::Export { path } => cmd_export(cli, path),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "hapm", &mut io::stdout());
            Ok(())
        }
    }
}

fn open_client() -> Result<Arc<GitHubClient>> {
    let client = GitHubClient::new().context("creating GitHub client")?;
    Ok(Arc::new(client))
}

fn open_manager(cli: &Cli, client: &Arc<GitHubClient>) -> Result<PackageManager> {
    debug!("Opening storage {}", cli.storage.display());
    let source = Arc::clone(client);
    PackageManager::open(&cli.storage, source).context("creating package manager")
}

fn cmd_init(cli: &Cli) -> Result<()> {
    if cli.manifest.exists() {
        anyhow::bail!(
            "initializing manifest: {} already exists",
            cli.manifest.display()
        );
    }
    let client = open_client()?;
    let manager = open_manager(cli, &client)?;
    let manifest = Manifest::new(&cli.manifest);
    manifest
        .init(manager.supported_kinds())
        .context("initializing manifest")?;
    println!("Created {}", cli.manifest.display());
    Ok(())
}

fn cmd_install(
    cli: &Cli,
    locations: &[String],
    kind: Option<PackageKind>,
    stable_only: bool,
) -> Result<()> {
    let client = open_client()?;
    let mut manager = open_manager(cli, &client)?;
    let mut manifest = Manifest::new(&cli.manifest);
    manifest.load().context("parsing manifest")?;

    for raw in locations {
        let location = match PackageLocation::parse(raw) {
            Ok(location) => location,
            Err(e) => {
                eprintln!("Error while installing package: {}", e);
                eprintln!("{}", report::wrong_location_hint());
                continue;
            }
        };
        if let Err(e) = manifest.set(&location.full_name, &location.version, kind) {
            eprintln!("Error while installing package: {}", e);
            if kind.is_none() {
                eprintln!(
                    "--type parameter is not specified.\nThis option is required when installing new packages"
                );
            }
        }
    }

    synchronize(cli, &client, &mut manager, &manifest, stable_only)?;
    if !cli.dry {
        manifest.dump().context("writing manifest")?;
        info!("Updated {}", manifest.path().display());
    }
    Ok(())
}

fn synchronize(
    cli: &Cli,
    client: &GitHubClient,
    manager: &mut PackageManager,
    manifest: &Manifest,
    stable_only: bool,
) -> Result<()> {
    let latest = manifest.has_latest();
    if !latest.is_empty() {
        eprintln!("{}", report::latest_notice(&latest));
    }

    let plan = manager
        .plan(&manifest.values, stable_only)
        .context("calculating changes")?;
    print!("{}", report::format_diff(&plan, false));
    if cli.dry {
        return Ok(());
    }

    if !plan.is_empty() {
        if !client.has_token() {
            eprintln!("{}", report::no_token_warning(TOKEN_VAR));
        }
        manager
            .apply(&plan)
            .context("synchronizing the changes")?;
    }
    println!("\n{}", report::summary(&plan));
    Ok(())
}

fn cmd_updates(cli: &Cli, stable_only: bool) -> Result<()> {
    let client = open_client()?;
    let manager = open_manager(cli, &client)?;
    if !stable_only {
        eprintln!("Search includes unstable versions");
    }

    let scan = manager
        .updates(stable_only)
        .context("looking for package updates")?;
    for name in &scan.unresolved {
        eprintln!("No eligible version found for {}", name);
    }
    if scan.is_empty() {
        println!("All packages are up to date");
    } else {
        print!("{}", report::format_updates(&scan.updates));
    }
    Ok(())
}

fn cmd_versions(cli: &Cli, raw: &str) -> Result<()> {
    let location = match PackageLocation::parse(raw) {
        Ok(location) => location,
        Err(e) => {
            eprintln!("{}", report::wrong_location_hint());
            return Err(anyhow::Error::new(e).context("parsing package location"));
        }
    };

    let client = open_client()?;
    let manager = open_manager(cli, &client)?;
    let versions = manager
        .versions(&location.full_name)
        .context("looking for package versions")?;
    print!("{}", report::format_versions(&location.full_name, &versions));
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let client = open_client()?;
    let manager = open_manager(cli, &client)?;
    let summary = manager.export(path).context("exporting packages")?;
    println!("Exported {} package(s) to {}", summary.exported, path.display());
    if !summary.plugin_resources.is_empty() {
        println!("{}", report::plugin_hint(&summary.plugin_resources));
    }
    Ok(())
}
