use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use log::debug;
use tokio_util::sync::CancellationToken;

use pipmgr::config::Config;
use pipmgr::error::{ProcessError, is_cancelled, is_no_result};
use pipmgr::manager::RemoveOutcome;
use pipmgr::output::Notifier;
use pipmgr::package::PackageRecord;
use pipmgr::registry::SearchPage;
use pipmgr::services::{DefaultManager, build_default_manager};

/// pipmgr - manage the packages of a Python interpreter
///
/// Lists, installs, upgrades and removes packages by driving `python -m pip`,
/// and searches the package index.
///
/// Examples:
///   pipmgr list                       # Installed packages
///   pipmgr install requests==2.31.0   # Install an exact version
///   pipmgr -m tsinghua install numpy  # Install through a mirror
///   pipmgr search http --page 2       # Second page of search results
#[derive(Parser, Debug)]
#[command(author, version = env!("PIPMGR_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Python interpreter to drive (defaults to ~/.pipmgr/python)
    #[arg(
        long = "python",
        short = 'p',
        env = "PIPMGR_PYTHON",
        value_name = "PATH",
        global = true
    )]
    pub python: Option<PathBuf>,

    /// Package index mirror: pypi, tsinghua, aliyun, ustc, douban, tencent or a URL
    #[arg(
        long = "mirror",
        short = 'm',
        env = "PIPMGR_MIRROR",
        value_name = "MIRROR",
        global = true
    )]
    pub mirror: Option<String>,

    /// Search page URL (defaults to https://pypi.org/search/)
    #[arg(
        long = "search-url",
        env = "PIPMGR_SEARCH_URL",
        value_name = "URL",
        global = true
    )]
    pub search_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Show debug logging, including the tool's own output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List installed packages
    List(ListArgs),

    /// List installed packages that have a newer version
    Outdated,

    /// Install a package, or every package in a requirements file
    Install(InstallArgs),

    /// Upgrade a package to the newest (or given) version
    Upgrade(SpecArgs),

    /// Uninstall a package
    Remove(SpecArgs),

    /// Show versions available on the index, newest first
    Versions(SpecArgs),

    /// Search the package index
    Search(SearchArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Also check for newer versions
    #[arg(long = "outdated-check")]
    pub outdated_check: bool,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Package as "name" or "name==version"
    #[arg(
        value_name = "SPEC",
        required_unless_present = "requirement",
        conflicts_with = "requirement"
    )]
    pub spec: Option<String>,

    /// Install from a requirements file
    #[arg(long = "requirement", short = 'r', value_name = "FILE")]
    pub requirement: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct SpecArgs {
    /// Package as "name" or "name==version"
    #[arg(value_name = "SPEC")]
    pub spec: String,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Search keyword; omit to browse Python 3 packages
    #[arg(value_name = "KEYWORD", default_value = "")]
    pub keyword: String,

    /// Result page, starting at 1
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,
}

/// Prints failures to stderr and remembers that it did.
#[derive(Default)]
struct ConsoleNotifier {
    notified: AtomicBool,
}

impl ConsoleNotifier {
    fn was_notified(&self) -> bool {
        self.notified.load(Ordering::SeqCst)
    }
}

impl Notifier for ConsoleNotifier {
    fn notify_error(&self, message: &str) {
        self.notified.store(true, Ordering::SeqCst);
        eprintln!("Error: {}", message.trim_end());
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let notifier = Arc::new(ConsoleNotifier::default());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let ctrl_c_handler = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cancelling...");
            trigger.cancel();
        }
    });

    let result = run(cli, notifier.clone(), &cancel).await;
    ctrl_c_handler.abort();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(report_error(&e, notifier.was_notified())),
    }
}

/// Print a failed run's error, unless the notifier already did, and return
/// the process exit status.
fn report_error(err: &anyhow::Error, notified: bool) -> u8 {
    if is_cancelled(err) {
        eprintln!("Cancelled");
        return 130;
    }
    if is_no_result(err) {
        println!("{}", err);
        return 0;
    }
    if let Some(process_error) = err.downcast_ref::<ProcessError>() {
        if !notified {
            eprintln!("Error: {}", process_error);
        }
        let code = process_error
            .exit_code
            .and_then(|c| u8::try_from(c).ok())
            .filter(|c| *c != 0)
            .unwrap_or(1);
        return code;
    }

    eprintln!("Error: {:#}", err);
    1
}

async fn run(cli: Cli, notifier: Arc<ConsoleNotifier>, cancel: &CancellationToken) -> Result<()> {
    let config = Config::new(cli.python, cli.mirror.as_deref(), cli.search_url)?;
    let manager = build_default_manager(&config, notifier)?;
    debug!("Using interpreter {}", manager.python_path().display());

    match cli.command {
        Commands::List(args) => {
            let records = if args.outdated_check {
                manager.list_installed_with_upgrades().await?
            } else {
                manager.list_installed().await?
            };
            print_records(&records, cli.json)?;
        }
        Commands::Outdated => {
            let records = manager.list_upgradable().await?;
            print_records(&records, cli.json)?;
        }
        Commands::Install(args) => install(&manager, args, cancel).await?,
        Commands::Upgrade(args) => {
            manager.upgrade(&args.spec, cancel).await?;
            println!("Upgraded {}", args.spec);
        }
        Commands::Remove(args) => match manager.remove(&args.spec, cancel).await? {
            RemoveOutcome::Removed => println!("Removed {}", args.spec),
            RemoveOutcome::Protected => {
                println!("{} is required by pip and was not removed", args.spec)
            }
        },
        Commands::Versions(args) => {
            let versions = manager.list_versions(&args.spec, cancel).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&versions)?);
            } else if versions.is_empty() {
                println!("No versions found for {}", args.spec);
            } else {
                for version in versions {
                    println!("{}", version);
                }
            }
        }
        Commands::Search(args) => {
            let page = manager.search(&args.keyword, args.page, cancel).await?;
            if page.items.is_empty() && !cli.json {
                println!("No results found for '{}'", args.keyword);
                return Ok(());
            }
            print_search_page(&page, args.page, cli.json)?;
        }
    }

    Ok(())
}

async fn install(
    manager: &DefaultManager,
    args: InstallArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    match (args.requirement, args.spec) {
        (Some(path), _) => {
            manager.install_from_manifest(&path, cancel).await?;
            println!("Installed requirements from {}", path.display());
        }
        (None, Some(spec)) => {
            manager.install(&spec, cancel).await?;
            println!("Installed {}", spec);
        }
        (None, None) => anyhow::bail!("Nothing to install"),
    }
    Ok(())
}

fn print_records(records: &[PackageRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    let width = records.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for record in records {
        match &record.latest_version {
            Some(latest) => println!(
                "{:<width$}  {} -> {}",
                record.name,
                record.version,
                latest,
                width = width
            ),
            None => println!("{:<width$}  {}", record.name, record.version, width = width),
        }
    }
    Ok(())
}

fn print_search_page(page: &SearchPage, current: u32, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(page)?);
        return Ok(());
    }

    for item in &page.items {
        println!("{} {}", item.name, item.version);
        if !item.description.is_empty() {
            println!("    {}", item.description);
        }
    }
    println!("Page {} of {}", current, page.total_pages);
    Ok(())
}
