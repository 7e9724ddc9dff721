mod app;
mod cli;
mod config;
mod context;
mod input;
mod k8s;
mod model;
mod session;
mod ui;
mod workspace;

use anyhow::{Context, Result};
use app::{App, AppCommand};
use chrono::Local;
use clap::Parser;
use cli::CliArgs;
use config::{RuntimeConfigSnapshot, RuntimeConfigWatcher};
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use k8s::{ClusterSnapshot, ClusterSnapshotGateway, ContextCatalog};
use model::ResourceKind;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use session::{PtyBackend, SessionCoordinator, SessionEvent};
use std::io::{self, Stdout};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval, timeout};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const DETAIL_REFRESH_TIMEOUT: Duration = Duration::from_secs(4);
const STATS_REFRESH_TIMEOUT: Duration = Duration::from_secs(2);
// Kubeconfig contexts change rarely; the tree is rebuilt every Nth tick.
const TREE_REBUILD_EVERY: u64 = 15;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter)?;

    let catalog = ContextCatalog::load(args.kubeconfig.as_deref())?;
    let gateway = ClusterSnapshotGateway::new(catalog.kubeconfig());

    let mut config_watcher = RuntimeConfigWatcher::discover();
    let config = match config_watcher.load_current() {
        Ok(config) => config,
        Err(error) => {
            warn!("runtime config ignored: {error:#}");
            RuntimeConfigSnapshot::default()
        }
    };

    let shell = resolve_shell(&args, &config);
    let history_limit = args.history_limit.unwrap_or(config.history_limit).max(1);

    let (session_tx, session_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let backend = Arc::new(PtyBackend::new(session_tx.clone()));
    let coordinator = SessionCoordinator::new(backend, session_tx, shell);

    let mut app = App::new(
        coordinator,
        &catalog.context_names(),
        config.tags,
        history_limit,
    );

    run(
        &mut app,
        &gateway,
        &args,
        catalog,
        config_watcher,
        session_rx,
    )
    .await
}

fn init_tracing(level_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::sink)
        .try_init();

    Ok(())
}

fn resolve_shell(args: &CliArgs, config: &RuntimeConfigSnapshot) -> String {
    args.shell
        .clone()
        .or_else(|| config.shell.clone())
        .or_else(|| std::env::var("SHELL").ok().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| "/bin/sh".to_string())
}

async fn run(
    app: &mut App,
    gateway: &ClusterSnapshotGateway,
    args: &CliArgs,
    catalog: ContextCatalog,
    config_watcher: RuntimeConfigWatcher,
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    let mut terminal = init_terminal()?;
    let run_result = run_loop(
        &mut terminal,
        app,
        gateway,
        args.refresh_ms.max(500),
        args.kubeconfig.as_deref(),
        catalog,
        config_watcher,
        session_rx,
    )
    .await;
    let restore_result = restore_terminal(&mut terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: &ClusterSnapshotGateway,
    refresh_ms: u64,
    kubeconfig: Option<&str>,
    catalog: ContextCatalog,
    mut config_watcher: RuntimeConfigWatcher,
    mut session_rx: mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    let mut reader = EventStream::new();
    let mut ticker = interval(Duration::from_millis(refresh_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut known_names = catalog.context_names();
    let mut tick: u64 = 0;

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            if let AppCommand::RefreshDetail { context_id, context_name, kind } = command {
                                terminal
                                    .draw(|frame| ui::render(frame, app))
                                    .context("failed to render terminal frame")?;
                                refresh_detail(app, gateway, context_id, &context_name, kind).await;
                            }
                        }
                    }
                    Some(Ok(Event::Resize(cols, rows))) => {
                        let (rows, cols) = session_grid(app, rows, cols);
                        app.resize_sessions(rows, cols);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => break,
                }
            }
            maybe_event = session_rx.recv() => {
                if let Some(event) = maybe_event {
                    app.handle_session_event(event);
                }
            }
            _ = ticker.tick() => {
                tick += 1;
                refresh_active_detail(app, gateway).await;
                reload_runtime_config(app, &mut config_watcher);
                if tick % TREE_REBUILD_EVERY == 0 {
                    rebuild_tree_if_changed(app, kubeconfig, &mut known_names);
                }
            }
        }
    }

    Ok(())
}

async fn refresh_active_detail(app: &mut App, gateway: &ClusterSnapshotGateway) {
    let Some(tab) = app.active_tab_id() else {
        return;
    };
    let Some((_, tab_ref)) = app.state().find_tab(tab) else {
        return;
    };
    let context_id = tab_ref.context.id.clone();
    let context_name = tab_ref.context.raw_name.clone();
    let kind = app
        .coordinator()
        .view(tab)
        .map(|view| view.resource_kind)
        .unwrap_or_default();
    refresh_detail(app, gateway, context_id, &context_name, kind).await;
}

async fn refresh_detail(
    app: &mut App,
    gateway: &ClusterSnapshotGateway,
    context_id: String,
    context_name: &str,
    kind: ResourceKind,
) {
    let rows = timeout(DETAIL_REFRESH_TIMEOUT, gateway.fetch_rows(context_name, kind)).await;
    let stats = timeout(STATS_REFRESH_TIMEOUT, gateway.fetch_stats(context_name)).await;

    let mut snapshot = ClusterSnapshot {
        refreshed_at: Some(Local::now()),
        ..Default::default()
    };
    match rows {
        Ok(Ok(rows)) => snapshot.rows = rows,
        Ok(Err(error)) => snapshot.error = Some(format!("{error:#}")),
        Err(_) => snapshot.error = Some(format!("{} refresh timed out", kind.title())),
    }
    match stats {
        Ok(Ok(stats)) => snapshot.stats = stats,
        Ok(Err(error)) => {
            if snapshot.error.is_none() {
                snapshot.error = Some(format!("{error:#}"));
            }
        }
        Err(_) => debug!("stats refresh timed out for {context_name}"),
    }

    app.record_snapshot(context_id, snapshot);
}

fn reload_runtime_config(app: &mut App, watcher: &mut RuntimeConfigWatcher) {
    match watcher.reload_if_changed() {
        Ok(Some(config)) => {
            app.set_tags(config.tags);
            app.set_status("Runtime config reloaded");
        }
        Ok(None) => {}
        Err(error) => warn!("runtime config reload failed: {error:#}"),
    }
}

fn rebuild_tree_if_changed(app: &mut App, kubeconfig: Option<&str>, known_names: &mut Vec<String>) {
    let names = match ContextCatalog::load(kubeconfig) {
        Ok(catalog) => catalog.context_names(),
        Err(error) => {
            debug!("kubeconfig reload failed: {error:#}");
            return;
        }
    };
    if names != *known_names {
        app.rebuild_tree(&names);
        *known_names = names;
    }
}

/// Approximate interior of one panel's terminal area for PTY resizes: the
/// sidebar takes a fixed width and the panels share the rest evenly.
fn session_grid(app: &App, rows: u16, cols: u16) -> (u16, u16) {
    let panels = app.state().panels.len().max(1) as u16;
    let grid_rows = rows.saturating_sub(12).max(4);
    let grid_cols = (cols.saturating_sub(36) / panels).saturating_sub(2).max(20);
    (grid_rows, grid_cols)
}
