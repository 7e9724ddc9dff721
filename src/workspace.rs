//! Panel/tab transition functions. Every operation is pure: it takes the
//! current workspace state plus the activation history and returns the next
//! state, the next history, and the side-resource effects the caller must
//! apply. Nothing here mutates shared state or performs IO.

use crate::context::{ClusterContext, ContextNode};
use crate::model::{
    ActivationHistory, ClusterContextTab, ClusterOperationPanel, PanelId, TabId, WorkspaceState,
};

pub const MAX_PANELS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEffect {
    /// A new tab needs a terminal session and a default view state.
    Provision { tab: TabId, context: ClusterContext },
    /// A split tab starts from a deep copy of its source tab's view state.
    SeedView { source: TabId, tab: TabId },
    /// A closed tab's session and view state must be disposed.
    Teardown { tab: TabId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub state: WorkspaceState,
    pub history: ActivationHistory,
    pub effects: Vec<ResourceEffect>,
}

/// Transitions that cannot proceed reject instead of panicking; the caller
/// must not assume a rejected action took effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(Applied),
    Rejected,
}

impl Outcome {
    fn applied(
        state: WorkspaceState,
        history: ActivationHistory,
        effects: Vec<ResourceEffect>,
    ) -> Self {
        Self::Applied(Applied {
            state,
            history,
            effects,
        })
    }
}

/// Select a tree node. Folders only move the selection; contexts activate an
/// existing tab (the active panel's match wins, then the leftmost panel's) or
/// open a new tab in the active panel.
pub fn select(state: &WorkspaceState, history: &ActivationHistory, node: &ContextNode) -> Outcome {
    let mut next = state.clone();
    let mut history = history.clone();
    next.selected_context = Some(node.clone());

    let Some(context) = node.cluster_context.clone() else {
        // Folders are navigable but not openable.
        return Outcome::applied(next, history, Vec::new());
    };

    let active_index = next
        .panels
        .iter()
        .position(|panel| panel.id == next.active_panel_id);
    let found = active_index
        .filter(|index| next.panels[*index].tab_for_context(&context.id).is_some())
        .or_else(|| {
            next.panels
                .iter()
                .position(|panel| panel.tab_for_context(&context.id).is_some())
        });

    if let Some(index) = found {
        let panel = &mut next.panels[index];
        let tab_id = panel.tab_for_context(&context.id).map(|tab| tab.id);
        panel.active_context_id = Some(context.id.clone());
        next.active_panel_id = panel.id;
        if let Some(tab_id) = tab_id {
            history.record(tab_id);
        }
        return Outcome::applied(next, history, Vec::new());
    }

    let Some(index) = active_index.or(if next.panels.is_empty() { None } else { Some(0) }) else {
        return Outcome::Rejected;
    };
    let panel = &mut next.panels[index];
    let tab = ClusterContextTab::new(panel.id, context.clone());
    let tab_id = tab.id;
    panel.active_context_id = Some(context.id.clone());
    panel.tabs.push(tab);
    next.active_panel_id = panel.id;
    history.record(tab_id);

    Outcome::applied(
        next,
        history,
        vec![ResourceEffect::Provision {
            tab: tab_id,
            context,
        }],
    )
}

/// Close a tab. Closing the panel's active tab triggers history-driven
/// re-activation; closing the last tab anywhere restores the startup state of
/// one empty default panel.
pub fn close(state: &WorkspaceState, history: &ActivationHistory, tab_id: TabId) -> Outcome {
    let Some((owner, tab)) = state.find_tab(tab_id) else {
        return Outcome::Rejected;
    };
    let owner_id = owner.id;
    let was_active = owner.active_context_id.as_deref() == Some(tab.context.id.as_str());

    let mut next = state.clone();
    let mut history = history.clone();
    history.prune(tab_id);
    let effects = vec![ResourceEffect::Teardown { tab: tab_id }];

    if !was_active {
        // Plain filter; there is no active tab to replace.
        let Some(panel) = next.panels.iter_mut().find(|panel| panel.id == owner_id) else {
            return Outcome::Rejected;
        };
        panel.tabs.retain(|tab| tab.id != tab_id);
        if panel.tabs.is_empty() {
            if next.panels.len() == 1 {
                return Outcome::Applied(reset_to_default(history, effects));
            }
            next.panels.retain(|panel| panel.id != owner_id);
        }
        return Outcome::applied(next, history, effects);
    }

    for panel in &mut next.panels {
        if panel.id == owner_id {
            panel.tabs.retain(|tab| tab.id != tab_id);
            panel.active_context_id = None;
        }
    }
    next.panels.retain(|panel| !panel.tabs.is_empty());

    if next.panels.is_empty() {
        return Outcome::Applied(reset_to_default(history, effects));
    }

    let survivor = history.most_recent_first().find_map(|candidate| {
        next.find_tab(candidate)
            .map(|(panel, tab)| (panel.id, tab.context.id.clone()))
    });
    match survivor {
        Some((panel_id, context_id)) => {
            next.active_panel_id = panel_id;
            if let Some(panel) = next.panels.iter_mut().find(|panel| panel.id == panel_id) {
                panel.active_context_id = Some(context_id);
            }
        }
        None => {
            // Arbitrary but preserved source behavior: first tab of the first
            // surviving panel becomes globally active.
            let first_panel_id = next.panels[0].id;
            next.active_panel_id = first_panel_id;
            let first_tab = next.panels[0].tabs.first().cloned();
            match first_tab {
                Some(tab) => {
                    next.panels[0].active_context_id = Some(tab.context.id.clone());
                    next.selected_context = Some(ContextNode::leaf(tab.context));
                }
                None => next.selected_context = None,
            }
        }
    }

    // The panel that lost its active tab re-activates independently from its
    // own slice of history, falling back to its last tab.
    if next.active_panel_id != owner_id
        && let Some(panel) = next.panels.iter_mut().find(|panel| panel.id == owner_id)
    {
        reactivate_from_history(panel, &history);
    }

    Outcome::applied(next, history, effects)
}

fn reset_to_default(history: ActivationHistory, effects: Vec<ResourceEffect>) -> Applied {
    let state = WorkspaceState::new();
    Applied {
        state,
        history: history.cleared(),
        effects,
    }
}

fn reactivate_from_history(panel: &mut ClusterOperationPanel, history: &ActivationHistory) {
    let chosen = history
        .most_recent_first()
        .find_map(|candidate| {
            panel
                .tab_by_id(candidate)
                .map(|tab| tab.context.id.clone())
        })
        .or_else(|| panel.tabs.last().map(|tab| tab.context.id.clone()));
    panel.active_context_id = chosen;
}

/// Open a new panel to the right holding one fresh tab bound to the source
/// tab's context. Rejected at the panel cap or for an unknown tab.
pub fn split_right(state: &WorkspaceState, history: &ActivationHistory, tab_id: TabId) -> Outcome {
    if state.panels.len() >= MAX_PANELS {
        return Outcome::Rejected;
    }
    let Some((_, source)) = state.find_tab(tab_id) else {
        return Outcome::Rejected;
    };
    let context = source.context.clone();

    let mut next = state.clone();
    let mut history = history.clone();
    let mut panel = ClusterOperationPanel::new_default();
    let tab = ClusterContextTab::new(panel.id, context.clone());
    let new_tab_id = tab.id;
    panel.active_context_id = Some(context.id.clone());
    panel.tabs.push(tab);
    next.active_panel_id = panel.id;
    next.panels.push(panel);
    history.record(new_tab_id);

    Outcome::applied(
        next,
        history,
        vec![
            ResourceEffect::Provision {
                tab: new_tab_id,
                context,
            },
            ResourceEffect::SeedView {
                source: tab_id,
                tab: new_tab_id,
            },
        ],
    )
}

/// Replace a panel's tab ordering. Ids that no longer resolve are dropped;
/// surviving tabs missing from the requested order keep their relative order
/// at the end so no tab is lost to a racing close. Activation recency is
/// untouched.
pub fn reorder(
    state: &WorkspaceState,
    history: &ActivationHistory,
    panel_id: PanelId,
    ordered: &[TabId],
) -> Outcome {
    let Some(index) = state.panels.iter().position(|panel| panel.id == panel_id) else {
        return Outcome::Rejected;
    };

    let mut next = state.clone();
    let panel = &mut next.panels[index];
    let mut reordered: Vec<ClusterContextTab> = Vec::with_capacity(panel.tabs.len());
    for id in ordered {
        if reordered.iter().any(|tab| tab.id == *id) {
            continue;
        }
        if let Some(tab) = panel.tab_by_id(*id) {
            reordered.push(tab.clone());
        }
    }
    for tab in &panel.tabs {
        if !reordered.iter().any(|kept| kept.id == tab.id) {
            reordered.push(tab.clone());
        }
    }
    panel.tabs = reordered;

    Outcome::applied(next, history.clone(), Vec::new())
}

/// Re-home a tab into another panel at the given position. The tab id is
/// stable across the move, so side-resources follow it without re-keying.
pub fn move_tab(
    state: &WorkspaceState,
    history: &ActivationHistory,
    tab_id: TabId,
    target_panel_id: PanelId,
    target_index: usize,
) -> Outcome {
    let Some((source_panel, tab)) = state.find_tab(tab_id) else {
        return Outcome::Rejected;
    };
    let source_id = source_panel.id;
    if source_id == target_panel_id {
        return Outcome::Rejected;
    }
    let Some(target) = state.panel(target_panel_id) else {
        return Outcome::Rejected;
    };
    // One tab per context per panel.
    if target.tab_for_context(&tab.context.id).is_some() {
        return Outcome::Rejected;
    }

    let mut next = state.clone();
    let mut history = history.clone();

    let mut moved = None;
    for panel in &mut next.panels {
        if panel.id != source_id {
            continue;
        }
        if let Some(position) = panel.tabs.iter().position(|tab| tab.id == tab_id) {
            let tab = panel.tabs.remove(position);
            if panel.active_context_id.as_deref() == Some(tab.context.id.as_str()) {
                panel.active_context_id = None;
            }
            moved = Some(tab);
        }
    }
    let Some(mut moved) = moved else {
        return Outcome::Rejected;
    };
    moved.panel_id = target_panel_id;
    let context_id = moved.context.id.clone();

    let Some(panel) = next
        .panels
        .iter_mut()
        .find(|panel| panel.id == target_panel_id)
    else {
        return Outcome::Rejected;
    };
    let index = target_index.min(panel.tabs.len());
    panel.tabs.insert(index, moved);
    panel.active_context_id = Some(context_id);
    next.active_panel_id = target_panel_id;

    next.panels
        .retain(|panel| panel.id != source_id || !panel.tabs.is_empty());
    history.record(tab_id);

    Outcome::applied(next, history, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::{
        Applied, MAX_PANELS, Outcome, ResourceEffect, close, move_tab, reorder, select,
        split_right,
    };
    use crate::context::{ContextNode, Provider};
    use crate::model::{ActivationHistory, PanelId, TabId, WorkspaceState};

    fn node(name: &str) -> ContextNode {
        ContextNode::leaf(Provider::classify(name))
    }

    fn ctx_id(name: &str) -> String {
        Provider::classify(name).id
    }

    fn applied(outcome: Outcome) -> Applied {
        match outcome {
            Outcome::Applied(applied) => applied,
            Outcome::Rejected => panic!("expected the transition to apply"),
        }
    }

    fn select_all(names: &[&str]) -> Applied {
        select_all_with_history(names, ActivationHistory::default())
    }

    fn select_all_with_history(names: &[&str], history: ActivationHistory) -> Applied {
        let mut current = Applied {
            state: WorkspaceState::new(),
            history,
            effects: Vec::new(),
        };
        for name in names {
            let step = applied(select(&current.state, &current.history, &node(name)));
            current.state = step.state;
            current.history = step.history;
            current.effects.extend(step.effects);
        }
        current
    }

    fn tab_for(state: &WorkspaceState, name: &str) -> TabId {
        let wanted = ctx_id(name);
        state
            .panels
            .iter()
            .find_map(|panel| panel.tab_for_context(&wanted))
            .map(|tab| tab.id)
            .unwrap_or_else(|| panic!("no tab for {name}"))
    }

    fn active_context(state: &WorkspaceState) -> Option<String> {
        state
            .active_panel()
            .and_then(|panel| panel.active_context_id.clone())
    }

    #[test]
    fn selecting_a_folder_only_moves_the_selection() {
        let state = WorkspaceState::new();
        let history = ActivationHistory::default();
        let folder = {
            let roots = crate::context::build_context_tree(&[
                "gke_acme_europe-west1_payments".to_string(),
            ]);
            roots[0].clone()
        };

        let step = applied(select(&state, &history, &folder));
        assert_eq!(step.state.selected_context.as_ref().map(|n| n.id.clone()),
            Some(folder.id));
        assert_eq!(step.state.panels, state.panels);
        assert!(step.effects.is_empty());
    }

    #[test]
    fn selecting_distinct_contexts_appends_tabs_to_active_panel() {
        let result = select_all(&["ctx1", "ctx2", "ctx3"]);
        assert_eq!(result.state.panels.len(), 1);
        assert_eq!(result.state.panels[0].tabs.len(), 3);
        assert_eq!(active_context(&result.state), Some(ctx_id("ctx3")));
        let provisions = result
            .effects
            .iter()
            .filter(|effect| matches!(effect, ResourceEffect::Provision { .. }))
            .count();
        assert_eq!(provisions, 3);
    }

    #[test]
    fn reselecting_an_open_context_creates_no_duplicate() {
        let opened = select_all(&["ctx1", "ctx2"]);
        let step = applied(select(&opened.state, &opened.history, &node("ctx1")));
        assert_eq!(step.state.panels[0].tabs.len(), 2);
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx1")));
        assert!(step.effects.is_empty());
    }

    #[test]
    fn reselecting_the_active_context_is_idempotent() {
        let opened = select_all(&["ctx1"]);
        let step = applied(select(&opened.state, &opened.history, &node("ctx1")));
        assert_eq!(step.state, opened.state);
        assert!(step.effects.is_empty());
    }

    #[test]
    fn select_prefers_a_match_in_the_active_panel() {
        let opened = select_all(&["ctx1"]);
        let t1 = tab_for(&opened.state, "ctx1");
        let split = applied(split_right(&opened.state, &opened.history, t1));
        let with_ctx2 = applied(select(&split.state, &split.history, &node("ctx2")));
        // Active panel is the split panel holding ctx1 and ctx2.
        let step = applied(select(&with_ctx2.state, &with_ctx2.history, &node("ctx1")));
        assert_eq!(step.state.active_panel_id, with_ctx2.state.active_panel_id);
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx1")));
    }

    #[test]
    fn select_falls_back_to_the_leftmost_panel_match() {
        let opened = select_all(&["ctx1", "ctx2"]);
        let t2 = tab_for(&opened.state, "ctx2");
        let split = applied(split_right(&opened.state, &opened.history, t2));
        // Active panel only holds ctx2; ctx1 lives in the leftmost panel.
        let step = applied(select(&split.state, &split.history, &node("ctx1")));
        assert_eq!(step.state.active_panel_id, step.state.panels[0].id);
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx1")));
        let total_tabs: usize = step.state.panels.iter().map(|p| p.tabs.len()).sum();
        assert_eq!(total_tabs, 3);
    }

    #[test]
    fn scenario_a_closing_inactive_tab_keeps_active_tab() {
        let opened = select_all(&["ctx1", "ctx2", "ctx3"]);
        let t1 = tab_for(&opened.state, "ctx1");
        let step = applied(close(&opened.state, &opened.history, t1));
        assert_eq!(step.state.panels.len(), 1);
        assert_eq!(step.state.panels[0].tabs.len(), 2);
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx3")));
        assert_eq!(step.effects, vec![ResourceEffect::Teardown { tab: t1 }]);
    }

    #[test]
    fn scenario_b_closing_non_active_tab_changes_nothing_else() {
        let opened = select_all(&["ctx1", "ctx2"]);
        let active_panel_before = opened.state.active_panel_id;
        let t1 = tab_for(&opened.state, "ctx1");
        let step = applied(close(&opened.state, &opened.history, t1));
        assert_eq!(step.state.panels.len(), 1);
        assert_eq!(step.state.panels[0].tabs.len(), 1);
        assert_eq!(step.state.active_panel_id, active_panel_before);
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx2")));
    }

    #[test]
    fn scenario_c_closing_the_last_tab_restores_the_default_panel() {
        let opened = select_all(&["ctx1"]);
        let t1 = tab_for(&opened.state, "ctx1");
        let step = applied(close(&opened.state, &opened.history, t1));
        assert_eq!(step.state.panels.len(), 1);
        assert!(step.state.panels[0].tabs.is_empty());
        assert!(step.state.panels[0].active_context_id.is_none());
        assert_eq!(step.state.active_panel_id, step.state.panels[0].id);
        assert!(step.state.selected_context.is_none());
        assert!(step.history.is_empty());
    }

    #[test]
    fn scenario_d_split_right_duplicates_the_binding_into_a_new_panel() {
        let opened = select_all(&["ctx1"]);
        let t1 = tab_for(&opened.state, "ctx1");
        let step = applied(split_right(&opened.state, &opened.history, t1));
        assert_eq!(step.state.panels.len(), 2);
        assert_eq!(step.state.panels[0].tabs.len(), 1);
        assert_eq!(step.state.panels[1].tabs.len(), 1);
        assert_eq!(step.state.panels[1].tabs[0].context.id, ctx_id("ctx1"));
        assert_ne!(step.state.panels[1].tabs[0].id, t1);
        assert_eq!(step.state.active_panel_id, step.state.panels[1].id);
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx1")));
        let new_tab = step.state.panels[1].tabs[0].id;
        assert_eq!(
            step.effects,
            vec![
                ResourceEffect::Provision {
                    tab: new_tab,
                    context: step.state.panels[1].tabs[0].context.clone(),
                },
                ResourceEffect::SeedView {
                    source: t1,
                    tab: new_tab,
                },
            ]
        );
    }

    #[test]
    fn scenario_e_closing_the_split_tab_reactivates_from_history() {
        let opened = select_all(&["ctx1", "ctx2", "ctx3"]);
        let t2 = tab_for(&opened.state, "ctx2");
        let split = applied(split_right(&opened.state, &opened.history, t2));
        let split_tab = split.state.panels[1].tabs[0].id;
        let step = applied(close(&split.state, &split.history, split_tab));
        assert_eq!(step.state.panels.len(), 1);
        assert_eq!(step.state.panels[0].tabs.len(), 3);
        assert_eq!(step.state.active_panel_id, step.state.panels[0].id);
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx3")));
    }

    #[test]
    fn closing_the_active_tab_picks_the_most_recent_survivor() {
        let opened = select_all(&["ctx1", "ctx2", "ctx3"]);
        let t3 = tab_for(&opened.state, "ctx3");
        let step = applied(close(&opened.state, &opened.history, t3));
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx2")));
        assert!(step.history.most_recent_first().all(|id| id != t3));
    }

    #[test]
    fn close_without_history_survivor_falls_back_to_first_tab() {
        let opened = select_all_with_history(&["ctx1", "ctx2"], ActivationHistory::new(1));
        let t2 = tab_for(&opened.state, "ctx2");
        let step = applied(close(&opened.state, &opened.history, t2));
        assert_eq!(step.state.panels.len(), 1);
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx1")));
        assert_eq!(
            step.state.selected_context.as_ref().map(|n| n.id.clone()),
            Some(ctx_id("ctx1"))
        );
    }

    #[test]
    fn orphaned_panel_reactivates_from_its_own_history_slice() {
        let opened = select_all(&["ctx1", "ctx2"]);
        let t1 = tab_for(&opened.state, "ctx1");
        let t2 = tab_for(&opened.state, "ctx2");
        let split = applied(split_right(&opened.state, &opened.history, t1));
        let split_panel = split.state.active_panel_id;

        // ctx2 is the left panel's active tab; the global survivor lives in
        // the split panel, so the left panel re-activates independently.
        let step = applied(close(&split.state, &split.history, t2));
        assert_eq!(step.state.active_panel_id, split_panel);
        assert_eq!(
            step.state.panels[0].active_context_id,
            Some(ctx_id("ctx1"))
        );
    }

    #[test]
    fn orphaned_panel_falls_back_to_its_last_tab() {
        let opened = select_all_with_history(&["ctx1", "ctx2", "ctx3"], ActivationHistory::new(1));
        let t3 = tab_for(&opened.state, "ctx3");
        let split = applied(split_right(&opened.state, &opened.history, t3));
        let step = applied(close(&split.state, &split.history, t3));
        // History only remembers the split tab; the left panel falls back to
        // its last remaining tab.
        assert_eq!(
            step.state.panels[0].active_context_id,
            Some(ctx_id("ctx2"))
        );
    }

    #[test]
    fn closing_an_unknown_tab_is_rejected() {
        let opened = select_all(&["ctx1"]);
        assert_eq!(
            close(&opened.state, &opened.history, TabId::new()),
            Outcome::Rejected
        );
    }

    #[test]
    fn split_is_rejected_at_the_panel_cap() {
        let mut current = select_all(&["ctx1"]);
        while current.state.panels.len() < MAX_PANELS {
            let source = current
                .state
                .active_panel()
                .and_then(|panel| panel.active_tab())
                .map(|tab| tab.id)
                .expect("active tab");
            let step = applied(split_right(&current.state, &current.history, source));
            current.state = step.state;
            current.history = step.history;
        }
        assert_eq!(current.state.panels.len(), MAX_PANELS);
        let source = tab_for(&current.state, "ctx1");
        assert_eq!(
            split_right(&current.state, &current.history, source),
            Outcome::Rejected
        );
        assert_eq!(current.state.panels.len(), MAX_PANELS);
    }

    #[test]
    fn split_of_an_unknown_tab_is_rejected() {
        let opened = select_all(&["ctx1"]);
        assert_eq!(
            split_right(&opened.state, &opened.history, TabId::new()),
            Outcome::Rejected
        );
    }

    #[test]
    fn reorder_applies_permutation_and_keeps_activation() {
        let opened = select_all(&["ctx1", "ctx2", "ctx3"]);
        let panel_id = opened.state.panels[0].id;
        let t1 = tab_for(&opened.state, "ctx1");
        let t2 = tab_for(&opened.state, "ctx2");
        let t3 = tab_for(&opened.state, "ctx3");
        let step = applied(reorder(
            &opened.state,
            &opened.history,
            panel_id,
            &[t3, t1, t2],
        ));
        let order: Vec<TabId> = step.state.panels[0].tabs.iter().map(|tab| tab.id).collect();
        assert_eq!(order, vec![t3, t1, t2]);
        assert_eq!(step.state.active_panel_id, opened.state.active_panel_id);
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx3")));
        assert!(step.effects.is_empty());
    }

    #[test]
    fn reorder_drops_stale_ids_and_keeps_unlisted_tabs() {
        let opened = select_all(&["ctx1", "ctx2", "ctx3"]);
        let panel_id = opened.state.panels[0].id;
        let t1 = tab_for(&opened.state, "ctx1");
        let t3 = tab_for(&opened.state, "ctx3");
        let stale = TabId::new();
        let step = applied(reorder(
            &opened.state,
            &opened.history,
            panel_id,
            &[t3, stale, t1],
        ));
        let order: Vec<TabId> = step.state.panels[0].tabs.iter().map(|tab| tab.id).collect();
        assert_eq!(order[0], t3);
        assert_eq!(order[1], t1);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn reorder_of_an_unknown_panel_is_rejected() {
        let opened = select_all(&["ctx1"]);
        assert_eq!(
            reorder(&opened.state, &opened.history, PanelId::new(), &[]),
            Outcome::Rejected
        );
    }

    #[test]
    fn move_tab_re_homes_and_activates_in_the_target() {
        let opened = select_all(&["ctx1", "ctx2"]);
        let t1 = tab_for(&opened.state, "ctx1");
        let t2 = tab_for(&opened.state, "ctx2");
        let split = applied(split_right(&opened.state, &opened.history, t1));
        let target = split.state.panels[1].id;

        let step = applied(move_tab(&split.state, &split.history, t2, target, 0));
        assert_eq!(step.state.panels.len(), 2);
        assert_eq!(step.state.panels[0].tabs.len(), 1);
        assert_eq!(step.state.panels[1].tabs.len(), 2);
        assert_eq!(step.state.panels[1].tabs[0].id, t2);
        assert_eq!(step.state.panels[1].tabs[0].panel_id, target);
        assert_eq!(step.state.active_panel_id, target);
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx2")));
        // Source lost its active pointer to the moved tab.
        assert!(step.state.panels[0].active_context_id.is_none());
        assert!(step.effects.is_empty());
    }

    #[test]
    fn moving_the_last_tab_drops_the_source_panel() {
        let opened = select_all(&["ctx1"]);
        let t1 = tab_for(&opened.state, "ctx1");
        let split = applied(split_right(&opened.state, &opened.history, t1));
        let with_ctx3 = applied(select(&split.state, &split.history, &node("ctx3")));
        let split_tab = with_ctx3.state.panels[1]
            .tab_for_context(&ctx_id("ctx1"))
            .map(|tab| tab.id)
            .expect("split tab");
        let closed = applied(close(&with_ctx3.state, &with_ctx3.history, split_tab));
        // Right panel now holds only ctx3; move it into the left panel.
        let t3 = tab_for(&closed.state, "ctx3");
        let target = closed.state.panels[0].id;
        let step = applied(move_tab(&closed.state, &closed.history, t3, target, 9));
        assert_eq!(step.state.panels.len(), 1);
        assert_eq!(step.state.panels[0].tabs.len(), 2);
        assert_eq!(step.state.active_panel_id, target);
        assert_eq!(active_context(&step.state), Some(ctx_id("ctx3")));
    }

    #[test]
    fn move_tab_rejections_leave_state_untouched() {
        let opened = select_all(&["ctx1", "ctx2"]);
        let t1 = tab_for(&opened.state, "ctx1");
        let source = opened.state.panels[0].id;
        // Same panel.
        assert_eq!(
            move_tab(&opened.state, &opened.history, t1, source, 0),
            Outcome::Rejected
        );
        // Unknown target.
        assert_eq!(
            move_tab(&opened.state, &opened.history, t1, PanelId::new(), 0),
            Outcome::Rejected
        );
        // Unknown tab.
        let split = applied(split_right(&opened.state, &opened.history, t1));
        let target = split.state.panels[1].id;
        assert_eq!(
            move_tab(&split.state, &split.history, TabId::new(), target, 0),
            Outcome::Rejected
        );
        // Duplicate context in the target panel.
        assert_eq!(
            move_tab(&split.state, &split.history, t1, target, 0),
            Outcome::Rejected
        );
    }
}
