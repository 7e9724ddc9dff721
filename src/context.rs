use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Provider {
    Gke,
    Aws,
    Others,
}

impl Provider {
    // Classification order; Others is the mandatory catch-all and stays last.
    pub const PRIORITY: [Self; 3] = [Self::Gke, Self::Aws, Self::Others];

    pub fn title(self) -> &'static str {
        match self {
            Self::Gke => "GKE",
            Self::Aws => "AWS",
            Self::Others => "Others",
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Gke => "gke",
            Self::Aws => "aws",
            Self::Others => "other",
        }
    }

    fn matches(self, name: &str) -> bool {
        match self {
            Self::Gke => {
                let mut parts = name.split('_');
                parts.next() == Some("gke") && name.split('_').count() >= 4
            }
            Self::Aws => {
                name.starts_with("arn:aws:eks:") && name.contains(":cluster/")
                    || name.ends_with(".eksctl.io") && name.contains('@')
            }
            Self::Others => true,
        }
    }

    fn parse(self, name: &str) -> ClusterContext {
        match self {
            Self::Gke => parse_gke(name),
            Self::Aws => parse_aws(name),
            Self::Others => ClusterContext::new(Self::Others, None, None, name.to_string(), name),
        }
    }

    pub fn classify(name: &str) -> ClusterContext {
        for provider in Self::PRIORITY {
            if provider.matches(name) {
                return provider.parse(name);
            }
        }
        // PRIORITY ends with the catch-all, so this is unreachable.
        Self::Others.parse(name)
    }
}

#[derive(Debug, Clone)]
pub struct ClusterContext {
    pub id: String,
    pub provider: Provider,
    pub region: Option<String>,
    pub resource_container: Option<String>,
    pub cluster_name: String,
    pub raw_name: String,
}

impl ClusterContext {
    fn new(
        provider: Provider,
        resource_container: Option<String>,
        region: Option<String>,
        cluster_name: String,
        raw_name: &str,
    ) -> Self {
        let id = context_id(
            provider,
            resource_container.as_deref(),
            region.as_deref(),
            raw_name,
        );
        Self {
            id,
            provider,
            region,
            resource_container,
            cluster_name,
            raw_name: raw_name.to_string(),
        }
    }
}

// Equality is by id: the id is a deterministic function of everything that
// identifies the context, so nothing else needs comparing.
impl PartialEq for ClusterContext {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClusterContext {}

impl std::hash::Hash for ClusterContext {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn context_id(
    provider: Provider,
    resource_container: Option<&str>,
    region: Option<&str>,
    raw_name: &str,
) -> String {
    format!(
        "{}/{}/{}/{}",
        provider.token(),
        resource_container.unwrap_or("-"),
        region.unwrap_or("-"),
        raw_name
    )
}

fn parse_gke(name: &str) -> ClusterContext {
    // gke_<project>_<location>_<cluster>
    let mut parts = name.splitn(4, '_');
    let _prefix = parts.next();
    let project = parts.next().unwrap_or_default().to_string();
    let location = parts.next().unwrap_or_default().to_string();
    let cluster = parts.next().unwrap_or(name).to_string();
    ClusterContext::new(
        Provider::Gke,
        Some(project),
        Some(location),
        cluster,
        name,
    )
}

fn parse_aws(name: &str) -> ClusterContext {
    if let Some(rest) = name.strip_prefix("arn:aws:eks:") {
        // arn:aws:eks:<region>:<account>:cluster/<name>
        let mut parts = rest.splitn(3, ':');
        let region = parts.next().unwrap_or_default().to_string();
        let account = parts.next().unwrap_or_default().to_string();
        let cluster = parts
            .next()
            .and_then(|resource| resource.strip_prefix("cluster/"))
            .unwrap_or(name)
            .to_string();
        return ClusterContext::new(Provider::Aws, Some(account), Some(region), cluster, name);
    }

    // <user>@<cluster>.<region>.eksctl.io
    if let Some(rest) = name.strip_suffix(".eksctl.io")
        && let Some((_user, target)) = rest.split_once('@')
        && let Some((cluster, region)) = target.rsplit_once('.')
    {
        return ClusterContext::new(
            Provider::Aws,
            None,
            Some(region.to_string()),
            cluster.to_string(),
            name,
        );
    }

    ClusterContext::new(Provider::Aws, None, None, name.to_string(), name)
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NodeKind {
    Folder,
    Context,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub cluster_context: Option<ClusterContext>,
    pub children: Vec<ContextNode>,
    pub parent_id: Option<String>,
    pub expanded: bool,
}

impl ContextNode {
    fn folder(id: String, name: String, parent_id: Option<String>) -> Self {
        Self {
            id,
            name,
            kind: NodeKind::Folder,
            cluster_context: None,
            children: Vec::new(),
            parent_id,
            expanded: true,
        }
    }

    /// A detached Context node for a known cluster context, used when the
    /// selection must be restored from an open tab rather than the tree.
    pub fn leaf(context: ClusterContext) -> Self {
        Self::context(context, None)
    }

    fn context(context: ClusterContext, parent_id: Option<String>) -> Self {
        Self {
            id: context.id.clone(),
            name: context.cluster_name.clone(),
            kind: NodeKind::Context,
            cluster_context: Some(context),
            children: Vec::new(),
            parent_id,
            expanded: false,
        }
    }
}

/// Rebuilds the navigable tree from raw kubeconfig context names. Node ids
/// are deterministic in (provider, container, region, raw name) so external
/// state keyed by id survives rebuilds.
pub fn build_context_tree(names: &[String]) -> Vec<ContextNode> {
    let mut grouped: BTreeMap<usize, Vec<ClusterContext>> = BTreeMap::new();
    for name in names {
        let context = Provider::classify(name);
        let slot = Provider::PRIORITY
            .iter()
            .position(|provider| *provider == context.provider)
            .unwrap_or(Provider::PRIORITY.len() - 1);
        grouped.entry(slot).or_default().push(context);
    }

    let mut roots = Vec::new();
    for (slot, mut contexts) in grouped {
        let provider = Provider::PRIORITY[slot];
        contexts.sort_by(|a, b| a.raw_name.cmp(&b.raw_name));
        let root_id = provider.token().to_string();
        let mut root = ContextNode::folder(root_id, provider.title().to_string(), None);
        for context in contexts {
            let levels = [context.resource_container.clone(), context.region.clone()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>();
            attach_context(&mut root, &levels, context);
        }
        roots.push(root);
    }

    roots
}

fn attach_context(parent: &mut ContextNode, levels: &[String], context: ClusterContext) {
    let Some((level, rest)) = levels.split_first() else {
        let parent_id = parent.id.clone();
        parent
            .children
            .push(ContextNode::context(context, Some(parent_id)));
        return;
    };

    let folder_id = format!("{}/{}", parent.id, level);
    let index = match parent
        .children
        .iter()
        .position(|child| child.id == folder_id)
    {
        Some(index) => index,
        None => {
            let parent_id = parent.id.clone();
            parent.children.push(ContextNode::folder(
                folder_id,
                level.clone(),
                Some(parent_id),
            ));
            parent.children.len() - 1
        }
    };
    attach_context(&mut parent.children[index], rest, context);
}

pub fn find_node_by_id<'a>(roots: &'a [ContextNode], id: &str) -> Option<&'a ContextNode> {
    for node in roots {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node_by_id(&node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Path from the provider root down to the node's direct parent.
pub fn ancestors_of<'a>(roots: &'a [ContextNode], id: &str) -> Vec<&'a ContextNode> {
    let mut path = Vec::new();
    if collect_ancestors(roots, id, &mut path) {
        path
    } else {
        Vec::new()
    }
}

fn collect_ancestors<'a>(
    nodes: &'a [ContextNode],
    id: &str,
    path: &mut Vec<&'a ContextNode>,
) -> bool {
    for node in nodes {
        if node.id == id {
            return true;
        }
        path.push(node);
        if collect_ancestors(&node.children, id, path) {
            return true;
        }
        path.pop();
    }
    false
}

pub fn siblings_of<'a>(roots: &'a [ContextNode], id: &str) -> &'a [ContextNode] {
    match ancestors_of(roots, id).last() {
        Some(parent) => &parent.children,
        None if find_node_by_id(roots, id).is_some() => roots,
        None => &[],
    }
}

/// Name uniqueness within one sibling scope.
pub fn validate_unique_name(siblings: &[ContextNode], name: &str) -> bool {
    siblings.iter().filter(|node| node.name == name).count() <= 1
}

/// Depth-first flattening of the tree honoring folder expansion, for cursor
/// navigation in the sidebar.
pub fn flatten_visible(roots: &[ContextNode]) -> Vec<&ContextNode> {
    let mut out = Vec::new();
    for node in roots {
        flatten_into(node, &mut out);
    }
    out
}

fn flatten_into<'a>(node: &'a ContextNode, out: &mut Vec<&'a ContextNode>) {
    out.push(node);
    if node.kind == NodeKind::Folder && node.expanded {
        for child in &node.children {
            flatten_into(child, out);
        }
    }
}

pub fn set_expanded(roots: &mut [ContextNode], id: &str, expanded: bool) -> bool {
    for node in roots.iter_mut() {
        if node.id == id {
            node.expanded = expanded;
            return true;
        }
        if set_expanded(&mut node.children, id, expanded) {
            return true;
        }
    }
    false
}
