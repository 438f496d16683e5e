//! Practica entrypoint: startup (logging, config, catalog, terminal),
//! the central event loop, and task spawning for execution round-trips
//! and the highlight grammar load.

use anyhow::{Context, Result};
use clap::Parser;
use core_catalog::Catalog;
use core_events::{
    CHANNEL_SEND_FAILURES, EVENT_CHANNEL_CAP, Event, EventSourceRegistry, ExecCompletion,
    HighlightEvent, TickEventSource,
};
use core_model::{App, Effect};
use core_render::CrosstermBackend;
use core_render::emit::draw_frame;
use core_session::{ExecutionBackend, LanguageTarget, PistonBackend, outcome_from_result};
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// Tick period: fast enough for a fluid running-indicator, slow enough to
/// stay invisible in the log and the CPU profile.
const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "practica", version, about = "Terminal lab record viewer with live execution")]
struct Args {
    /// Exercise id to open directly instead of starting at the index.
    #[arg(long)]
    exercise: Option<u32>,
    /// Catalog JSON file (defaults to the embedded exercise set).
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Configuration file path (overrides discovery of `practica.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

struct AppStartup {
    backend: CrosstermBackend,
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self {
            backend: CrosstermBackend::new(),
            log_guard: None,
        }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("practica.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "practica.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .with_ansi(false)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_) => {
                // A global subscriber is already installed (test harness);
                // drop the guard so the writer shuts down.
            }
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: std::sync::Once = std::sync::Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = core_config::load_from(args.config.clone())?;
    let catalog =
        Catalog::load(args.catalog.as_deref()).context("loading exercise catalog")?;
    info!(
        target: "runtime.startup",
        exercises = catalog.len(),
        endpoint = %config.file.executor.endpoint,
        catalog_override = args.catalog.is_some(),
        config_override = args.config.is_some(),
        "bootstrap_complete"
    );

    let target = LanguageTarget {
        language: config.file.executor.language.clone(),
        version: config.file.executor.version.clone(),
    };
    let exec_backend: Arc<dyn ExecutionBackend> =
        Arc::new(PistonBackend::new(config.file.executor.endpoint.clone()));

    let term = crossterm::terminal::size().unwrap_or((100, 40));
    let mut app = App::new(catalog, target, config.effective_items_per_page, term);

    startup.backend.set_title("Practica")?;
    let guard = startup.backend.enter_guard()?;
    let result = run_loop(&mut app, exec_backend, args.exercise).await;
    drop(guard);
    result
}

async fn run_loop(
    app: &mut App,
    exec_backend: Arc<dyn ExecutionBackend>,
    open_exercise: Option<u32>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);

    let mut registry = EventSourceRegistry::new();
    registry.register(TickEventSource::new(TICK_INTERVAL));
    let source_handles = registry.spawn_all(&tx);
    let (input_handle, input_shutdown) = core_input::spawn_input_task(tx.clone());

    if let Some(id) = open_exercise {
        let update = app.open(id);
        if app.exercise_view().is_none() {
            warn!(target: "runtime", exercise = id, "unknown_exercise_id_starting_at_index");
        }
        perform_effects(update.effects, &exec_backend, &tx);
    }
    draw_frame(&mut stdout(), &app.render())?;

    while let Some(event) = rx.recv().await {
        let update = app.handle_event(event);
        let quit = update
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Quit));
        perform_effects(update.effects, &exec_backend, &tx);
        if quit {
            break;
        }
        if update.repaint {
            draw_frame(&mut stdout(), &app.render())?;
        }
    }

    // Cooperative shutdown: stop the input task, close the channel, then
    // give every source a moment to observe the closure.
    info!(target: "runtime", "shutdown");
    input_shutdown.signal();
    drop(tx);
    drop(rx);
    let _ = tokio::time::timeout(Duration::from_millis(250), input_handle).await;
    for handle in source_handles {
        let _ = tokio::time::timeout(Duration::from_millis(250), handle).await;
    }
    Ok(())
}

fn perform_effects(
    effects: Vec<Effect>,
    exec_backend: &Arc<dyn ExecutionBackend>,
    tx: &mpsc::Sender<Event>,
) {
    for effect in effects {
        match effect {
            Effect::SpawnRun(ticket) => {
                let backend = exec_backend.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = backend.execute(&ticket.request).await;
                    let completion = ExecCompletion {
                        ticket: ticket.id,
                        outcome: outcome_from_result(result),
                    };
                    if tx.send(Event::Exec(completion)).await.is_err() {
                        CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
            Effect::EnsureHighlight => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let event = if core_highlight::ensure_ready().await {
                        HighlightEvent::Ready
                    } else {
                        HighlightEvent::Failed
                    };
                    let _ = tx.send(Event::Highlight(event)).await;
                });
            }
            Effect::Quit => {}
        }
    }
}
