use crate::context::{ClusterContext, ContextNode};
use std::collections::{HashSet, VecDeque};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Freestanding tab identity, independent of the owning panel so a tab can be
/// re-homed across panels without re-keying its side-resources.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct TabId(Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TabId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct PanelId(Uuid);

impl PanelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PanelId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PanelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterContextTab {
    pub id: TabId,
    pub panel_id: PanelId,
    pub context: ClusterContext,
}

impl ClusterContextTab {
    pub fn new(panel_id: PanelId, context: ClusterContext) -> Self {
        Self {
            id: TabId::new(),
            panel_id,
            context,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOperationPanel {
    pub id: PanelId,
    pub tabs: Vec<ClusterContextTab>,
    pub active_context_id: Option<String>,
}

impl ClusterOperationPanel {
    pub fn new_default() -> Self {
        Self {
            id: PanelId::new(),
            tabs: Vec::new(),
            active_context_id: None,
        }
    }

    pub fn tab_for_context(&self, context_id: &str) -> Option<&ClusterContextTab> {
        self.tabs.iter().find(|tab| tab.context.id == context_id)
    }

    pub fn tab_by_id(&self, tab_id: TabId) -> Option<&ClusterContextTab> {
        self.tabs.iter().find(|tab| tab.id == tab_id)
    }

    pub fn active_tab(&self) -> Option<&ClusterContextTab> {
        let active = self.active_context_id.as_deref()?;
        self.tab_for_context(active)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceState {
    pub panels: Vec<ClusterOperationPanel>,
    pub active_panel_id: PanelId,
    pub selected_context: Option<ContextNode>,
}

impl WorkspaceState {
    /// Startup invariant: exactly one empty default panel, nothing selected.
    pub fn new() -> Self {
        let panel = ClusterOperationPanel::new_default();
        let active_panel_id = panel.id;
        Self {
            panels: vec![panel],
            active_panel_id,
            selected_context: None,
        }
    }

    pub fn panel(&self, panel_id: PanelId) -> Option<&ClusterOperationPanel> {
        self.panels.iter().find(|panel| panel.id == panel_id)
    }

    pub fn active_panel(&self) -> Option<&ClusterOperationPanel> {
        self.panel(self.active_panel_id)
    }

    pub fn find_tab(&self, tab_id: TabId) -> Option<(&ClusterOperationPanel, &ClusterContextTab)> {
        self.panels
            .iter()
            .find_map(|panel| panel.tab_by_id(tab_id).map(|tab| (panel, tab)))
    }

    pub fn live_tab_ids(&self) -> HashSet<TabId> {
        self.panels
            .iter()
            .flat_map(|panel| panel.tabs.iter().map(|tab| tab.id))
            .collect()
    }
}

impl Default for WorkspaceState {
    fn default() -> Self {
        Self::new()
    }
}

pub const DEFAULT_HISTORY_LIMIT: usize = 32;

/// Bounded recency list of tab activations. Advisory only: entries may refer
/// to tabs that no longer exist and are skipped by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationHistory {
    entries: VecDeque<TabId>,
    limit: usize,
}

impl ActivationHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn record(&mut self, tab_id: TabId) {
        self.entries.push_back(tab_id);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    pub fn prune(&mut self, tab_id: TabId) {
        self.entries.retain(|entry| *entry != tab_id);
    }

    pub fn most_recent_first(&self) -> impl Iterator<Item = TabId> + '_ {
        self.entries.iter().rev().copied()
    }

    pub fn cleared(&self) -> Self {
        Self::new(self.limit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ActivationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum ResourceKind {
    #[default]
    Pods,
    Nodes,
    Deployments,
    Services,
    Events,
}

impl ResourceKind {
    pub const ALL: [Self; 5] = [
        Self::Pods,
        Self::Nodes,
        Self::Deployments,
        Self::Services,
        Self::Events,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Pods => "Pods",
            Self::Nodes => "Nodes",
            Self::Deployments => "Deployments",
            Self::Services => "Services",
            Self::Events => "Events",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "po" | "pod" | "pods" => Some(Self::Pods),
            "no" | "node" | "nodes" => Some(Self::Nodes),
            "deploy" | "dp" | "deployment" | "deployments" => Some(Self::Deployments),
            "svc" | "service" | "services" => Some(Self::Services),
            "ev" | "event" | "events" => Some(Self::Events),
            _ => None,
        }
    }
}

/// Per-tab resource-inspection cache. Deep copy is `Clone`; `Default` is the
/// state a freshly provisioned tab starts from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabViewState {
    pub resource_kind: ResourceKind,
    pub selected_row: usize,
    pub scroll: u16,
    pub filter: String,
    pub expanded: HashSet<String>,
}

#[cfg(test)]
mod tests {
    use super::{ActivationHistory, ClusterOperationPanel, ResourceKind, TabId, WorkspaceState};

    #[test]
    fn history_evicts_oldest_past_limit() {
        let mut history = ActivationHistory::new(3);
        let tabs: Vec<TabId> = (0..5).map(|_| TabId::new()).collect();
        for tab in &tabs {
            history.record(*tab);
        }
        assert_eq!(history.len(), 3);
        let recent: Vec<TabId> = history.most_recent_first().collect();
        assert_eq!(recent, vec![tabs[4], tabs[3], tabs[2]]);
    }

    #[test]
    fn history_prune_removes_every_occurrence() {
        let mut history = ActivationHistory::new(8);
        let a = TabId::new();
        let b = TabId::new();
        history.record(a);
        history.record(b);
        history.record(a);
        history.prune(a);
        let recent: Vec<TabId> = history.most_recent_first().collect();
        assert_eq!(recent, vec![b]);
    }

    #[test]
    fn cleared_history_keeps_its_limit() {
        let mut history = ActivationHistory::new(2);
        history.record(TabId::new());
        let cleared = history.cleared();
        assert!(cleared.is_empty());
        assert_eq!(cleared.limit, 2);
    }

    #[test]
    fn default_workspace_has_one_empty_active_panel() {
        let state = WorkspaceState::new();
        assert_eq!(state.panels.len(), 1);
        assert_eq!(state.panels[0].id, state.active_panel_id);
        assert!(state.panels[0].tabs.is_empty());
        assert!(state.panels[0].active_context_id.is_none());
        assert!(state.selected_context.is_none());
    }

    #[test]
    fn empty_panel_has_no_active_tab() {
        let panel = ClusterOperationPanel::new_default();
        assert!(panel.active_tab().is_none());
    }

    #[test]
    fn resource_aliases_map_to_expected_kinds() {
        assert_eq!(ResourceKind::from_token("po"), Some(ResourceKind::Pods));
        assert_eq!(ResourceKind::from_token("no"), Some(ResourceKind::Nodes));
        assert_eq!(
            ResourceKind::from_token("deploy"),
            Some(ResourceKind::Deployments)
        );
        assert_eq!(
            ResourceKind::from_token("svc"),
            Some(ResourceKind::Services)
        );
        assert_eq!(ResourceKind::from_token("unknown"), None);
    }
}
