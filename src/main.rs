use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::Colorize;
use humansize::{format_size, BINARY};
use std::env;
use std::path::PathBuf;
use std::time::SystemTime;

use ttl_cache::{
    logging, parse_date, post_build, pre_build, DirCache, FileConfig, Overrides, PostBuildOutcome,
    PreBuildOutcome, PruneEngine, PruneReport, Settings, TtlPolicy,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Keep a build output cached across runs: prune stale files by TTL, merge cached files back without overwriting fresh ones",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to ./ttl-cache.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show per-file log output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Restore the cache, prune expired and excluded files, and stash the result
    PreBuild {
        #[command(flatten)]
        policy: PolicyArgs,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Merge the stash into the fresh build output and save the cache
    PostBuild {
        /// Build output directory
        #[arg(long)]
        path: Option<PathBuf>,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Prune a directory in place, without touching the cache or the stash
    Prune {
        #[command(flatten)]
        policy: PolicyArgs,

        /// Show what would be removed, but don't remove anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(ClapArgs, Debug)]
struct PolicyArgs {
    /// Build output directory
    #[arg(long)]
    path: Option<PathBuf>,

    /// Maximum file age: days, or a number with h/d/w/m suffix (e.g. 15, 48h, 2w)
    #[arg(long)]
    ttl: Option<String>,

    /// Regular expression over full file paths; matching files are always removed.
    /// An empty pattern excludes nothing
    #[arg(long, short = 'x')]
    exclude: Option<String>,

    /// Reference date for age checks in YYYY-MM-DD format (defaults to now)
    #[arg(long)]
    now: Option<String>,

    /// Maximum number of files evaluated concurrently (defaults to CPU count)
    #[arg(long, short)]
    jobs: Option<usize>,
}

#[derive(ClapArgs, Debug)]
struct StorageArgs {
    /// Staging directory holding the pruned tree between phases
    #[arg(long)]
    stash_dir: Option<PathBuf>,

    /// Directory backing the cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

impl PolicyArgs {
    fn reference_time(&self) -> Result<SystemTime> {
        match &self.now {
            Some(date) => Ok(parse_date(date)?),
            None => Ok(SystemTime::now()),
        }
    }
}

fn load_settings(config: Option<&PathBuf>, overrides: Overrides) -> Result<Settings> {
    let cwd = env::current_dir().context("Failed to determine working directory")?;
    let file = FileConfig::discover(config.map(PathBuf::as_path), &cwd)
        .context("Failed to load configuration file")?;
    Ok(Settings::resolve(file, overrides)?)
}

fn policy_overrides(policy: &PolicyArgs) -> Overrides {
    Overrides {
        path: policy.path.clone(),
        ttl: policy.ttl.clone(),
        exclude: policy.exclude.clone(),
        jobs: policy.jobs,
        ..Overrides::default()
    }
}

fn print_prune_summary(report: &PruneReport) {
    let verb = if report.dry_run { "Would remove" } else { "Removed" };
    println!(
        "{} {} of {} files ({} expired, {} excluded), {}",
        verb,
        report.removed.len(),
        report.scanned,
        report.expired,
        report.excluded,
        format_size(report.bytes_removed, BINARY).bold()
    );
}

fn run_pre_build(args: &Args, policy: &PolicyArgs, storage: &StorageArgs) -> Result<()> {
    let overrides = Overrides {
        stash_dir: storage.stash_dir.clone(),
        cache_dir: storage.cache_dir.clone(),
        ..policy_overrides(policy)
    };
    let settings = load_settings(args.config.as_ref(), overrides)?;
    settings.validate_storage()?;
    let now = policy.reference_time()?;
    let cache = DirCache::new(&settings.cache_dir);

    let outcome = pre_build(&cache, &settings.hook, now).context("Pre-build phase failed")?;
    match outcome {
        PreBuildOutcome::NoCache => {
            println!(
                "No cache found for {}; nothing to prune.",
                settings.hook.path.display()
            );
        }
        PreBuildOutcome::Stashed { prune, stash } => {
            print_prune_summary(&prune);
            println!(
                "{}",
                format!(
                    "Stashed {} files in {}",
                    stash.copied,
                    settings.hook.stash.path().display()
                )
                .green()
            );
        }
    }
    Ok(())
}

fn run_post_build(args: &Args, path: Option<&PathBuf>, storage: &StorageArgs) -> Result<()> {
    let overrides = Overrides {
        path: path.cloned(),
        stash_dir: storage.stash_dir.clone(),
        cache_dir: storage.cache_dir.clone(),
        ..Overrides::default()
    };
    let settings = load_settings(args.config.as_ref(), overrides)?;
    settings.validate_storage()?;
    let cache = DirCache::new(&settings.cache_dir);

    let PostBuildOutcome { merge } =
        post_build(&cache, &settings.hook).context("Post-build phase failed")?;
    match merge {
        Some(report) => println!(
            "Merged {} cached files ({} kept from fresh build)",
            report.copied, report.skipped
        ),
        None => println!("No stash to merge."),
    }
    println!(
        "{}",
        format!("Saved cache for {}", settings.hook.path.display())
            .green()
            .bold()
    );
    Ok(())
}

fn run_prune(args: &Args, policy: &PolicyArgs, dry_run: bool) -> Result<()> {
    let settings = load_settings(args.config.as_ref(), policy_overrides(policy))?;
    let now = policy.reference_time()?;
    let hook = &settings.hook;

    let report = PruneEngine::new(TtlPolicy::new(hook.ttl_days, now), hook.exclude.clone())
        .jobs(hook.jobs)
        .dry_run(dry_run)
        .prune(&hook.path)
        .with_context(|| format!("Failed to prune {}", hook.path.display()))?;

    if dry_run {
        for path in &report.removed {
            println!("Would remove: {}", path.display());
        }
    }
    print_prune_summary(&report);
    if dry_run {
        println!("Dry run mode: No files were deleted.");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    match &args.command {
        Command::PreBuild { policy, storage } => run_pre_build(&args, policy, storage),
        Command::PostBuild { path, storage } => run_post_build(&args, path.as_ref(), storage),
        Command::Prune { policy, dry_run } => run_prune(&args, policy, *dry_run),
    }
}
