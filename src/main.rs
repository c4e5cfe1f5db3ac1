use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use version_sync::config::{self, Config};
use version_sync::git::Git2Repository;
use version_sync::orchestration::Reconciler;
use version_sync::scheduler::{Scheduler, ShutdownSignal};
use version_sync::{logging, ui};

#[derive(clap::Parser)]
#[command(
    name = "version-sync",
    version,
    about = "Keep version marker files in sync with the tip of a reference branch"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Seconds between passes (overrides the config file)")]
    interval: Option<u64>,

    #[arg(long, help = "Run a single pass and exit")]
    once: bool,

    #[arg(long, help = "Preview what would happen without making changes")]
    dry_run: bool,

    #[arg(short, long, help = "Show diagnostic output")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = match load(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {:#}", e));
            std::process::exit(1);
        }
    };

    let reconciler = match open(config) {
        Ok(reconciler) => reconciler,
        Err(e) => {
            ui::display_error(&format!("Git repository error: {:#}", e));
            std::process::exit(1);
        }
    };

    if args.dry_run {
        let preview = reconciler.preview()?;
        ui::display_preview(&preview);
        return Ok(());
    }

    if args.once {
        return match reconciler.run_pass() {
            Ok(report) => {
                ui::display_pass_report(&report);
                Ok(())
            }
            Err(e) => {
                ui::display_error(&e.to_string());
                std::process::exit(1);
            }
        };
    }

    let shutdown = ShutdownSignal::new();
    shutdown
        .install()
        .context("failed to install signal handlers")?;

    let scheduler = Scheduler::new(reconciler.config().interval());
    ui::display_banner(reconciler.config());

    let passes = scheduler.run(&shutdown, |pass| {
        ui::display_pass_start(pass);
        match reconciler.run_pass() {
            Ok(report) => ui::display_pass_report(&report),
            Err(e) => {
                error!(pass, error = %e, "pass failed");
                ui::display_error(&e.to_string());
            }
        }
    });

    info!(passes, "stopped");
    ui::display_shutdown();
    Ok(())
}

fn load(args: &Args) -> Result<Config> {
    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(secs) = args.interval {
        config.interval_secs = secs;
        config.validate()?;
    }
    Ok(config)
}

fn open(config: Config) -> Result<Reconciler<Git2Repository, Git2Repository>> {
    let source = Git2Repository::open(&config.source.repo_path).with_context(|| {
        format!(
            "cannot open monitored repository {}",
            config.source.repo_path.display()
        )
    })?;
    let work = Git2Repository::open(&config.workdir).with_context(|| {
        format!(
            "cannot open working repository {}",
            config.workdir.display()
        )
    })?;
    Ok(Reconciler::new(config, source, work))
}
