//! Side-resource coordination: one terminal session slot and one view-state
//! cache per live tab, kept in lockstep with the panel state machine's
//! effects. Session creation is asynchronous; completions are committed in
//! the main loop and orphans (tab closed before the session came up) are torn
//! down instead of registered.

use crate::context::ClusterContext;
use crate::model::{TabId, TabViewState};
use crate::workspace::ResourceEffect;
use anyhow::{Context as _, Result};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

pub const SCREEN_ROWS: u16 = 24;
pub const SCREEN_COLS: u16 = 80;
const SCROLLBACK_LINES: usize = 2_000;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Narrow backend surface for terminal sessions. Implementations must
/// tolerate context identities that no longer exist in the tree and close
/// calls for sessions that are already gone.
pub trait TerminalBackend: Send + Sync {
    fn create(&self, shell: &str, context: &ClusterContext) -> Result<SessionId>;
    fn write(&self, session: SessionId, bytes: &[u8]) -> Result<()>;
    fn resize(&self, session: SessionId, rows: u16, cols: u16) -> Result<()>;
    fn close(&self, session: SessionId) -> Result<()>;
}

#[derive(Debug)]
pub enum SessionEvent {
    Created {
        tab: TabId,
        session: SessionId,
        epoch: u64,
    },
    CreateFailed {
        tab: TabId,
        epoch: u64,
        error: String,
    },
    Output {
        session: SessionId,
        bytes: Vec<u8>,
    },
    Exited {
        session: SessionId,
    },
}

pub struct TerminalSession {
    pub id: SessionId,
    pub screen: vt100::Parser,
}

pub enum SessionSlot {
    Connecting,
    Ready(TerminalSession),
    Failed(String),
}

pub struct SessionCoordinator {
    backend: Arc<dyn TerminalBackend>,
    events: mpsc::UnboundedSender<SessionEvent>,
    shell: String,
    sessions: HashMap<TabId, SessionSlot>,
    views: HashMap<TabId, TabViewState>,
    by_session: HashMap<SessionId, TabId>,
    // Provisioning generation per tab; stale completions are torn down
    // instead of registered.
    epochs: HashMap<TabId, u64>,
    next_epoch: u64,
}

impl SessionCoordinator {
    pub fn new(
        backend: Arc<dyn TerminalBackend>,
        events: mpsc::UnboundedSender<SessionEvent>,
        shell: String,
    ) -> Self {
        Self {
            backend,
            events,
            shell,
            sessions: HashMap::new(),
            views: HashMap::new(),
            by_session: HashMap::new(),
            epochs: HashMap::new(),
            next_epoch: 0,
        }
    }

    /// Execute the effect list a state transition produced, in order.
    pub fn apply_effects(&mut self, effects: &[ResourceEffect]) {
        for effect in effects {
            match effect {
                ResourceEffect::Provision { tab, context } => {
                    self.provision(*tab, context.clone());
                }
                ResourceEffect::SeedView { source, tab } => {
                    let seeded = self.views.get(source).cloned().unwrap_or_default();
                    self.views.insert(*tab, seeded);
                }
                ResourceEffect::Teardown { tab } => self.teardown(*tab),
            }
        }
    }

    /// Issue asynchronous session creation for a tab and synthesize its
    /// default view state. The slot renders as connecting until the
    /// completion event is committed.
    pub fn provision(&mut self, tab: TabId, context: ClusterContext) {
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        self.epochs.insert(tab, epoch);
        self.sessions.insert(tab, SessionSlot::Connecting);
        self.views.entry(tab).or_default();

        let backend = self.backend.clone();
        let events = self.events.clone();
        let shell = self.shell.clone();
        tokio::task::spawn_blocking(move || {
            let event = match backend.create(&shell, &context) {
                Ok(session) => SessionEvent::Created {
                    tab,
                    session,
                    epoch,
                },
                Err(error) => SessionEvent::CreateFailed {
                    tab,
                    epoch,
                    error: format!("{error:#}"),
                },
            };
            let _ = events.send(event);
        });
    }

    /// Commit an asynchronous completion. `live_tabs` is the current panel
    /// state's tab set: a completion for a tab that no longer exists (or a
    /// superseded provisioning round) closes the fresh session instead of
    /// registering it.
    pub fn complete(&mut self, event: SessionEvent, live_tabs: &HashSet<TabId>) {
        match event {
            SessionEvent::Created {
                tab,
                session,
                epoch,
            } => {
                let current = self.epochs.get(&tab).copied();
                if !live_tabs.contains(&tab) || current != Some(epoch) {
                    debug!("closing orphaned session {session} for tab {tab}");
                    if let Err(error) = self.backend.close(session) {
                        warn!("orphaned session close failed for {session}: {error:#}");
                    }
                    return;
                }
                self.by_session.insert(session, tab);
                self.sessions.insert(
                    tab,
                    SessionSlot::Ready(TerminalSession {
                        id: session,
                        screen: vt100::Parser::new(SCREEN_ROWS, SCREEN_COLS, SCROLLBACK_LINES),
                    }),
                );
            }
            SessionEvent::CreateFailed { tab, epoch, error } => {
                if self.epochs.get(&tab).copied() == Some(epoch)
                    && self.sessions.contains_key(&tab)
                {
                    warn!("session creation failed for tab {tab}: {error}");
                    self.sessions.insert(tab, SessionSlot::Failed(error));
                }
            }
            SessionEvent::Output { session, bytes } => {
                if let Some(tab) = self.by_session.get(&session)
                    && let Some(SessionSlot::Ready(live)) = self.sessions.get_mut(tab)
                {
                    live.screen.process(&bytes);
                }
            }
            SessionEvent::Exited { session } => {
                if let Some(tab) = self.by_session.remove(&session)
                    && matches!(self.sessions.get(&tab), Some(SessionSlot::Ready(_)))
                {
                    self.sessions
                        .insert(tab, SessionSlot::Failed("terminal session exited".to_string()));
                }
            }
        }
    }

    /// Synchronous teardown: backend disposal is requested immediately and a
    /// failure never blocks removal of the map entries.
    pub fn teardown(&mut self, tab: TabId) {
        self.epochs.remove(&tab);
        if let Some(SessionSlot::Ready(session)) = self.sessions.remove(&tab) {
            self.by_session.remove(&session.id);
            if let Err(error) = self.backend.close(session.id) {
                warn!("session teardown failed for tab {tab}: {error:#}");
            }
        }
        self.views.remove(&tab);
    }

    /// Teardown plus re-provision under the same tab id; the view state is
    /// reset to default, discarding prior scroll/expansion/selection.
    pub fn reload(&mut self, tab: TabId, context: ClusterContext) {
        self.teardown(tab);
        self.provision(tab, context);
    }

    pub fn write(&self, tab: TabId, bytes: &[u8]) -> Result<()> {
        match self.sessions.get(&tab) {
            Some(SessionSlot::Ready(session)) => self.backend.write(session.id, bytes),
            _ => Ok(()),
        }
    }

    pub fn resize(&mut self, tab: TabId, rows: u16, cols: u16) -> Result<()> {
        if let Some(SessionSlot::Ready(session)) = self.sessions.get_mut(&tab) {
            session.screen.screen_mut().set_size(rows, cols);
            return self.backend.resize(session.id, rows, cols);
        }
        Ok(())
    }

    pub fn slot(&self, tab: TabId) -> Option<&SessionSlot> {
        self.sessions.get(&tab)
    }

    pub fn view(&self, tab: TabId) -> Option<&TabViewState> {
        self.views.get(&tab)
    }

    pub fn view_mut(&mut self, tab: TabId) -> Option<&mut TabViewState> {
        self.views.get_mut(&tab)
    }
}

struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
}

/// Production backend: one PTY-hosted shell per session, scoped to a cluster
/// context through the child environment. Output is pumped from a reader
/// thread into the coordinator's event channel.
pub struct PtyBackend {
    events: mpsc::UnboundedSender<SessionEvent>,
    live: Mutex<HashMap<SessionId, PtyHandle>>,
}

impl PtyBackend {
    pub fn new(events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            events,
            live: Mutex::new(HashMap::new()),
        }
    }
}

impl TerminalBackend for PtyBackend {
    fn create(&self, shell: &str, context: &ClusterContext) -> Result<SessionId> {
        let pty = native_pty_system()
            .openpty(PtySize {
                rows: SCREEN_ROWS,
                cols: SCREEN_COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("failed to open pty")?;

        let mut command = CommandBuilder::new(shell);
        // The context may no longer exist in the tree; sessions outlive
        // rebuilds, so the name is passed through without validation.
        command.env("KUBECTL_CONTEXT", &context.raw_name);
        command.env("MANTA_CONTEXT_ID", &context.id);
        let child = pty
            .slave
            .spawn_command(command)
            .with_context(|| format!("failed to spawn shell for context {}", context.id))?;
        drop(pty.slave);

        let writer = pty
            .master
            .take_writer()
            .context("failed to take pty writer")?;
        let mut reader = pty
            .master
            .try_clone_reader()
            .context("failed to clone pty reader")?;

        let id = SessionId::new();
        let events = self.events.clone();
        std::thread::spawn(move || {
            let mut buffer = [0u8; 4096];
            loop {
                match reader.read(&mut buffer) {
                    Ok(0) | Err(_) => {
                        let _ = events.send(SessionEvent::Exited { session: id });
                        break;
                    }
                    Ok(read) => {
                        let _ = events.send(SessionEvent::Output {
                            session: id,
                            bytes: buffer[..read].to_vec(),
                        });
                    }
                }
            }
        });

        let handle = PtyHandle {
            master: pty.master,
            writer,
            child,
        };
        if let Ok(mut live) = self.live.lock() {
            live.insert(id, handle);
        }
        Ok(id)
    }

    fn write(&self, session: SessionId, bytes: &[u8]) -> Result<()> {
        let mut live = self
            .live
            .lock()
            .map_err(|_| anyhow::anyhow!("pty registry poisoned"))?;
        let Some(handle) = live.get_mut(&session) else {
            return Ok(());
        };
        handle
            .writer
            .write_all(bytes)
            .with_context(|| format!("failed to write to session {session}"))
    }

    fn resize(&self, session: SessionId, rows: u16, cols: u16) -> Result<()> {
        let live = self
            .live
            .lock()
            .map_err(|_| anyhow::anyhow!("pty registry poisoned"))?;
        let Some(handle) = live.get(&session) else {
            return Ok(());
        };
        handle
            .master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .with_context(|| format!("failed to resize session {session}"))
    }

    fn close(&self, session: SessionId) -> Result<()> {
        let mut live = self
            .live
            .lock()
            .map_err(|_| anyhow::anyhow!("pty registry poisoned"))?;
        let Some(mut handle) = live.remove(&session) else {
            return Ok(());
        };
        handle
            .child
            .kill()
            .with_context(|| format!("failed to kill session {session}"))
    }
}
