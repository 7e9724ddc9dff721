use crate::context::{ContextNode, NodeKind, build_context_tree, flatten_visible, set_expanded};
use crate::input::Action;
use crate::k8s::ClusterSnapshot;
use crate::model::{ActivationHistory, ResourceKind, TabId, WorkspaceState};
use crate::session::{SessionCoordinator, SessionEvent};
use crate::workspace::{self, Outcome};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Jump,
    Terminal,
}

/// Asynchronous follow-up work an action requests from the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    RefreshDetail {
        context_id: String,
        context_name: String,
        kind: ResourceKind,
    },
}

pub struct App {
    running: bool,
    mode: InputMode,
    state: WorkspaceState,
    history: ActivationHistory,
    coordinator: SessionCoordinator,
    tree: Vec<ContextNode>,
    cursor: usize,
    input: String,
    status: String,
    show_help: bool,
    snapshots: HashMap<String, ClusterSnapshot>,
    tags: HashMap<String, Vec<String>>,
}

impl App {
    pub fn new(
        coordinator: SessionCoordinator,
        context_names: &[String],
        tags: HashMap<String, Vec<String>>,
        history_limit: usize,
    ) -> Self {
        Self {
            running: true,
            mode: InputMode::Normal,
            state: WorkspaceState::new(),
            history: ActivationHistory::new(history_limit),
            coordinator,
            tree: build_context_tree(context_names),
            cursor: 0,
            input: String::new(),
            status: "Press ? for help".to_string(),
            show_help: false,
            snapshots: HashMap::new(),
            tags,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    pub fn history(&self) -> &ActivationHistory {
        &self.history
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    pub fn tree(&self) -> &[ContextNode] {
        &self.tree
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn snapshot_for(&self, context_id: &str) -> Option<&ClusterSnapshot> {
        self.snapshots.get(context_id)
    }

    pub fn tags_for(&self, context_id: &str) -> &[String] {
        self.tags
            .get(context_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn set_tags(&mut self, tags: HashMap<String, Vec<String>>) {
        self.tags = tags;
    }

    pub fn record_snapshot(&mut self, context_id: String, snapshot: ClusterSnapshot) {
        self.snapshots.insert(context_id, snapshot);
    }

    /// Rebuild the context tree from fresh kubeconfig names. Open tabs are
    /// untouched; their contexts may no longer appear in the tree.
    pub fn rebuild_tree(&mut self, context_names: &[String]) {
        self.tree = build_context_tree(context_names);
        let visible = flatten_visible(&self.tree).len();
        self.cursor = self.cursor.min(visible.saturating_sub(1));
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.state
            .active_panel()
            .and_then(|panel| panel.active_tab())
            .map(|tab| tab.id)
    }

    fn active_context(&self) -> Option<crate::context::ClusterContext> {
        self.state
            .active_panel()
            .and_then(|panel| panel.active_tab())
            .map(|tab| tab.context.clone())
    }

    /// Commit a transition outcome: replace the state and history and hand the
    /// effect list to the coordinator. Rejections only touch the status line.
    fn commit(&mut self, outcome: Outcome, rejected: &str) -> bool {
        match outcome {
            Outcome::Applied(applied) => {
                self.state = applied.state;
                self.history = applied.history;
                self.coordinator.apply_effects(&applied.effects);
                true
            }
            Outcome::Rejected => {
                debug!("transition rejected: {rejected}");
                self.status = rejected.to_string();
                false
            }
        }
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        let live = self.state.live_tab_ids();
        self.coordinator.complete(event, &live);
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if self.show_help && !matches!(action, Action::ToggleHelp) {
            self.show_help = false;
        }

        match action {
            Action::Quit => {
                self.running = false;
                AppCommand::None
            }
            Action::Down => {
                self.move_cursor(1);
                AppCommand::None
            }
            Action::Up => {
                self.move_cursor(-1);
                AppCommand::None
            }
            Action::ToggleExpand => {
                self.toggle_cursor_expansion();
                AppCommand::None
            }
            Action::SelectNode => self.select_cursor_node(),
            Action::NextTab => self.cycle_tab(1),
            Action::PrevTab => self.cycle_tab(-1),
            Action::NextPanel => {
                self.cycle_panel(1);
                AppCommand::None
            }
            Action::PrevPanel => {
                self.cycle_panel(-1);
                AppCommand::None
            }
            Action::CloseActiveTab => {
                let Some(tab) = self.active_tab_id() else {
                    self.status = "No tab to close".to_string();
                    return AppCommand::None;
                };
                self.commit(
                    workspace::close(&self.state, &self.history, tab),
                    "Close rejected",
                );
                AppCommand::None
            }
            Action::SplitActiveTab => {
                let Some(tab) = self.active_tab_id() else {
                    self.status = "No tab to split".to_string();
                    return AppCommand::None;
                };
                if self.commit(
                    workspace::split_right(&self.state, &self.history, tab),
                    "Panel limit reached",
                ) {
                    self.status = "Panel split right".to_string();
                }
                AppCommand::None
            }
            Action::ReloadActiveTab => {
                let Some(tab) = self.active_tab_id() else {
                    self.status = "No tab to reload".to_string();
                    return AppCommand::None;
                };
                let Some(context) = self.active_context() else {
                    return AppCommand::None;
                };
                let name = context.raw_name.clone();
                let id = context.id.clone();
                self.coordinator.reload(tab, context);
                self.status = format!("Reloading {name}");
                AppCommand::RefreshDetail {
                    context_id: id,
                    context_name: name,
                    kind: ResourceKind::default(),
                }
            }
            Action::ReorderLeft => {
                self.reorder_active(-1);
                AppCommand::None
            }
            Action::ReorderRight => {
                self.reorder_active(1);
                AppCommand::None
            }
            Action::MoveTabToPrevPanel => {
                self.move_active(-1);
                AppCommand::None
            }
            Action::MoveTabToNextPanel => {
                self.move_active(1);
                AppCommand::None
            }
            Action::FocusTerminal => {
                if self.active_tab_id().is_some() {
                    self.mode = InputMode::Terminal;
                    self.status = "Terminal focus (Ctrl-t to leave)".to_string();
                } else {
                    self.status = "No terminal session in focus".to_string();
                }
                AppCommand::None
            }
            Action::LeaveTerminal => {
                self.mode = InputMode::Normal;
                self.status.clear();
                AppCommand::None
            }
            Action::TerminalInput(bytes) => {
                if let Some(tab) = self.active_tab_id()
                    && let Err(error) = self.coordinator.write(tab, &bytes)
                {
                    warn!("terminal write failed: {error:#}");
                    self.status = "Terminal write failed".to_string();
                }
                AppCommand::None
            }
            Action::StartJump => {
                self.mode = InputMode::Jump;
                self.input.clear();
                self.status = "Jump to resource (po, no, deploy, svc, ev)".to_string();
                AppCommand::None
            }
            Action::InputChar(c) => {
                self.input.push(c);
                AppCommand::None
            }
            Action::Backspace => {
                self.input.pop();
                AppCommand::None
            }
            Action::CancelInput => {
                self.mode = InputMode::Normal;
                self.input.clear();
                self.status.clear();
                AppCommand::None
            }
            Action::SubmitInput => self.submit_jump(),
            Action::DetailPageUp => {
                self.scroll_detail(-10);
                AppCommand::None
            }
            Action::DetailPageDown => {
                self.scroll_detail(10);
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let visible = flatten_visible(&self.tree).len();
        if visible == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, visible as isize - 1) as usize;
    }

    fn toggle_cursor_expansion(&mut self) {
        let target = flatten_visible(&self.tree)
            .get(self.cursor)
            .map(|node| (node.id.clone(), node.expanded));
        if let Some((id, expanded)) = target {
            set_expanded(&mut self.tree, &id, !expanded);
        }
    }

    fn select_cursor_node(&mut self) -> AppCommand {
        let Some(node) = flatten_visible(&self.tree)
            .get(self.cursor)
            .map(|node| (*node).clone())
        else {
            return AppCommand::None;
        };

        if node.kind == NodeKind::Folder {
            // Folders expand on Enter; the selection still moves.
            set_expanded(&mut self.tree, &node.id, !node.expanded);
        }
        self.commit(
            workspace::select(&self.state, &self.history, &node),
            "Select rejected",
        );
        match node.cluster_context {
            Some(context) => {
                self.status = format!("Opened {}", context.cluster_name);
                AppCommand::RefreshDetail {
                    context_id: context.id,
                    context_name: context.raw_name,
                    kind: self.active_resource_kind(),
                }
            }
            None => AppCommand::None,
        }
    }

    fn active_resource_kind(&self) -> ResourceKind {
        self.active_tab_id()
            .and_then(|tab| self.coordinator.view(tab))
            .map(|view| view.resource_kind)
            .unwrap_or_default()
    }

    /// Cycling to a neighboring tab is a plain activation of its context, so
    /// it flows through the same transition as picking it from the tree.
    fn cycle_tab(&mut self, delta: isize) -> AppCommand {
        let Some(panel) = self.state.active_panel() else {
            return AppCommand::None;
        };
        if panel.tabs.len() < 2 {
            return AppCommand::None;
        }
        let current = panel
            .tabs
            .iter()
            .position(|tab| Some(tab.context.id.as_str()) == panel.active_context_id.as_deref())
            .unwrap_or(0);
        let len = panel.tabs.len() as isize;
        let next = (current as isize + delta).rem_euclid(len) as usize;
        let node = ContextNode::leaf(panel.tabs[next].context.clone());

        self.commit(
            workspace::select(&self.state, &self.history, &node),
            "Select rejected",
        );
        match node.cluster_context {
            Some(context) => AppCommand::RefreshDetail {
                context_id: context.id,
                context_name: context.raw_name,
                kind: self.active_resource_kind(),
            },
            None => AppCommand::None,
        }
    }

    /// Panel focus is presentation state, but moving it still counts as an
    /// activation of the newly focused panel's active tab.
    fn cycle_panel(&mut self, delta: isize) {
        if self.state.panels.len() < 2 {
            return;
        }
        let current = self
            .state
            .panels
            .iter()
            .position(|panel| panel.id == self.state.active_panel_id)
            .unwrap_or(0);
        let len = self.state.panels.len() as isize;
        let next = (current as isize + delta).rem_euclid(len) as usize;
        self.state.active_panel_id = self.state.panels[next].id;
        if let Some(tab) = self.state.panels[next].active_tab() {
            self.history.record(tab.id);
        }
    }

    fn reorder_active(&mut self, delta: isize) {
        let Some(panel) = self.state.active_panel() else {
            return;
        };
        let panel_id = panel.id;
        let Some(current) = panel
            .tabs
            .iter()
            .position(|tab| Some(tab.context.id.as_str()) == panel.active_context_id.as_deref())
        else {
            return;
        };
        let target = current as isize + delta;
        if target < 0 || target >= panel.tabs.len() as isize {
            return;
        }
        let mut ordered: Vec<TabId> = panel.tabs.iter().map(|tab| tab.id).collect();
        ordered.swap(current, target as usize);

        self.commit(
            workspace::reorder(&self.state, &self.history, panel_id, &ordered),
            "Reorder rejected",
        );
    }

    fn move_active(&mut self, delta: isize) {
        let Some(tab) = self.active_tab_id() else {
            self.status = "No tab to move".to_string();
            return;
        };
        if self.state.panels.len() < 2 {
            self.status = "No other panel".to_string();
            return;
        }
        let Some(current) = self
            .state
            .panels
            .iter()
            .position(|panel| panel.id == self.state.active_panel_id)
        else {
            return;
        };
        let len = self.state.panels.len() as isize;
        let target = &self.state.panels[(current as isize + delta).rem_euclid(len) as usize];
        let target_id = target.id;
        let append_at = target.tabs.len();

        if self.commit(
            workspace::move_tab(&self.state, &self.history, tab, target_id, append_at),
            "Move rejected: context already open in target panel",
        ) {
            self.status = "Tab moved".to_string();
        }
    }

    fn submit_jump(&mut self) -> AppCommand {
        let token = std::mem::take(&mut self.input);
        self.mode = InputMode::Normal;
        let Some(kind) = ResourceKind::from_token(token.trim()) else {
            self.status = format!("Unknown resource: {token}");
            return AppCommand::None;
        };
        let Some(tab) = self.active_tab_id() else {
            self.status = "No tab in focus".to_string();
            return AppCommand::None;
        };
        if let Some(view) = self.coordinator.view_mut(tab) {
            view.resource_kind = kind;
            view.selected_row = 0;
            view.scroll = 0;
        }
        self.status = format!("Showing {}", kind.title());
        match self.active_context() {
            Some(context) => AppCommand::RefreshDetail {
                context_id: context.id,
                context_name: context.raw_name,
                kind,
            },
            None => AppCommand::None,
        }
    }

    fn scroll_detail(&mut self, delta: i32) {
        let Some(tab) = self.active_tab_id() else {
            return;
        };
        if let Some(view) = self.coordinator.view_mut(tab) {
            let next = view.scroll as i32 + delta;
            view.scroll = next.max(0) as u16;
        }
    }

    /// Propagate a terminal resize to every live session.
    pub fn resize_sessions(&mut self, rows: u16, cols: u16) {
        let tabs: Vec<TabId> = self.state.live_tab_ids().into_iter().collect();
        for tab in tabs {
            if let Err(error) = self.coordinator.resize(tab, rows, cols) {
                warn!("resize failed for tab {tab}: {error:#}");
            }
        }
    }
}
