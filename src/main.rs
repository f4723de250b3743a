use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use rust_photo_slideshow::config::Configuration;
use rust_photo_slideshow::events::{NavCommand, NavDirection, RefreshSignal};
use rust_photo_slideshow::slideshow::{CandidateSource, Slideshow, SlideshowState, selection};
use rust_photo_slideshow::tasks::files::{self, DirectorySource, FileResolver};
use rust_photo_slideshow::tasks::viewer::{HeadlessSurface, LogNavControls};

#[derive(Debug, Parser)]
#[command(
    name = "photo-slideshow",
    version,
    about = "Slideshow navigation engine with a headless display"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
    /// Print the planned selection order without running the slideshow
    #[arg(long = "dry-run", value_name = "ITERATIONS")]
    dry_run: Option<usize>,
    /// Deterministic RNG seed for random ordering and picks
    #[arg(long = "seed", value_name = "SEED")]
    seed: Option<u64>,
}

fn init_tracing(verbose: u8, debug_logs_enabled: bool) {
    let level = match (verbose, debug_logs_enabled) {
        (0, false) => "info",
        (0, true) | (1, _) => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .compact()
        .init();
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        verbose,
        dry_run,
        seed,
    } = Args::parse();

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?;
    init_tracing(verbose, cfg.debug_logs_enabled);
    let cfg = cfg.validated().context("invalid configuration values")?;
    tracing::info!(
        "Loaded configuration from {}:\n{:#?}",
        config.display(),
        cfg
    );

    if let Some(iterations) = dry_run {
        return run_dry_run(&cfg, iterations, seed).await;
    }

    let options = cfg.slideshow_options();
    tracing::info!(
        root = %cfg.images_source.display(),
        mode = %options.mode,
        interval = %humantime::format_duration(options.interval),
        fade = %humantime::format_duration(options.fade),
        "starting slideshow"
    );

    let (signal_tx, signal_rx) = mpsc::channel::<RefreshSignal>(1); // Ticker -> Slideshow
    let (command_tx, command_rx) = mpsc::channel::<NavCommand>(16); // Console/signals -> Slideshow

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    #[cfg(unix)]
    {
        for (kind, direction) in [
            (SignalKind::user_defined1(), NavDirection::Previous),
            (SignalKind::user_defined2(), NavDirection::Next),
        ] {
            let cancel = cancel.clone();
            let commands = command_tx.clone();
            tokio::spawn(async move {
                match signal(kind) {
                    Ok(mut stream) => loop {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            received = stream.recv() => {
                                if received.is_none() {
                                    break;
                                }
                                tracing::info!(?direction, "signal received; navigating");
                                if commands.send(NavCommand::Navigate(direction)).await.is_err() {
                                    break;
                                }
                            }
                        }
                    },
                    Err(err) => tracing::warn!("failed to register navigation signal handler: {err}"),
                }
            });
        }
    }

    if io::stdin().is_terminal() {
        spawn_console(command_tx.clone(), cancel.clone());
    } else {
        tracing::debug!("stdin is not a terminal; skipping console commands");
    }
    drop(command_tx);

    let source = DirectorySource::new(&cfg.images_source);
    let generation = source.generation();
    let slideshow = Slideshow::new(
        options,
        source,
        FileResolver::new(&cfg.images_source),
        HeadlessSurface::new(),
        LogNavControls::default(),
        make_rng(seed),
    );

    let mut tasks = JoinSet::new();

    // Directory watcher
    tasks.spawn({
        let root = cfg.images_source.clone();
        let cancel = cancel.clone();
        async move {
            if let Err(err) = files::watch(root, generation, cancel).await {
                tracing::warn!("image root is not watched; changes need a restart: {err:#}");
            }
            Ok(())
        }
    });

    // Refresh signal ticker
    tasks.spawn({
        let period = cfg.refresh_signal_interval;
        let cancel = cancel.clone();
        async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => match signal_tx.try_send(RefreshSignal) {
                        Ok(()) | Err(TrySendError::Full(_)) => {}
                        Err(TrySendError::Closed(_)) => break,
                    },
                }
            }
            Ok(())
        }
    });

    // Slideshow
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            slideshow
                .run(signal_rx, command_rx, cancel)
                .await
                .context("slideshow task failed")
        }
    });

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("task error: {e:?}");
                cancel.cancel();
            }
            Err(e) => {
                tracing::error!("join error: {e}");
                cancel.cancel();
            }
        }
    }

    Ok(())
}

/// Read navigation commands from the terminal, one per line.
fn spawn_console(commands: mpsc::Sender<NavCommand>, cancel: CancellationToken) {
    // A plain thread: a blocked stdin read must not hold up runtime shutdown.
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!("console reader failed: {err}");
                    break;
                }
            };
            if cancel.is_cancelled() {
                return;
            }
            match line.trim() {
                "" => continue,
                "q" | "quit" => break,
                raw => match NavCommand::parse(raw) {
                    Some(cmd) => {
                        if commands.blocking_send(cmd).is_err() {
                            return;
                        }
                    }
                    None => tracing::warn!(input = raw, "unknown command (p, n, enter, leave, touch, q)"),
                },
            }
        }
        tracing::info!("console closed; initiating shutdown");
        cancel.cancel();
    });
}

async fn run_dry_run(cfg: &Configuration, iterations: usize, seed: Option<u64>) -> Result<()> {
    let options = cfg.slideshow_options();
    let listing = DirectorySource::new(&cfg.images_source)
        .read_candidates()
        .await
        .context("failed to read the image root")?;
    let mut rng = make_rng(seed);
    let mut state = selection::refresh(
        SlideshowState::default(),
        listing,
        &options.file_filter,
        options.mode,
        &mut rng,
    );

    println!(
        "# slideshow dry run\n# images: {}\n# mode: {}\n# history: {}\n# iterations: {}\n# seed: {}\n",
        state.candidate_count(),
        options.mode,
        options.max_history,
        iterations,
        seed.map_or_else(|| "(random)".to_string(), |s| s.to_string())
    );

    if state.candidate_count() == 0 {
        println!(
            "(no {} images under {})",
            options.file_filter.extensions().join(","),
            cfg.images_source.display()
        );
        return Ok(());
    }

    println!("# planned order:");
    let candidate_count = state.candidate_count();
    for step in 1..=iterations {
        selection::pick_next(
            &mut state.ledger,
            candidate_count,
            options.mode,
            options.max_history,
            &mut rng,
        )?;
        let identifier = state.current_id().unwrap_or("(none)");
        println!("  {step:>4}: {identifier}");
    }

    Ok(())
}
