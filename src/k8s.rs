use crate::model::ResourceKind;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, Node, Pod, Service};
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};

/// Raw context names from the kubeconfig; the only input the context tree
/// needs.
pub struct ContextCatalog {
    kubeconfig: Kubeconfig,
}

impl ContextCatalog {
    pub fn load(path: Option<&str>) -> Result<Self> {
        let kubeconfig = match path {
            Some(path) => Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {path}"))?,
            None => Kubeconfig::read().context("failed to read kubeconfig")?,
        };
        Ok(Self { kubeconfig })
    }

    pub fn context_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .kubeconfig
            .contexts
            .iter()
            .map(|context| context.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn kubeconfig(&self) -> Kubeconfig {
        self.kubeconfig.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterStats {
    pub nodes: usize,
    pub ready_nodes: usize,
    pub pods: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterSnapshot {
    pub stats: ClusterStats,
    pub rows: Vec<String>,
    pub refreshed_at: Option<DateTime<Local>>,
    pub error: Option<String>,
}

/// Per-context detail data for the inspection view. A fresh client is built
/// per fetch from the loaded kubeconfig; failures degrade to an error string
/// on the snapshot.
pub struct ClusterSnapshotGateway {
    kubeconfig: Kubeconfig,
}

impl ClusterSnapshotGateway {
    pub fn new(kubeconfig: Kubeconfig) -> Self {
        Self { kubeconfig }
    }

    async fn client_for(&self, context_name: &str) -> Result<Client> {
        let options = KubeConfigOptions {
            context: Some(context_name.to_string()),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(self.kubeconfig.clone(), &options)
            .await
            .with_context(|| format!("failed to build config for context {context_name}"))?;
        Client::try_from(config)
            .with_context(|| format!("failed to build client for context {context_name}"))
    }

    pub async fn fetch_rows(&self, context_name: &str, kind: ResourceKind) -> Result<Vec<String>> {
        let client = self.client_for(context_name).await?;
        match kind {
            ResourceKind::Pods => list_names::<Pod>(client).await,
            ResourceKind::Nodes => list_names::<Node>(client).await,
            ResourceKind::Deployments => list_names::<Deployment>(client).await,
            ResourceKind::Services => list_names::<Service>(client).await,
            ResourceKind::Events => list_names::<Event>(client).await,
        }
    }

    pub async fn fetch_stats(&self, context_name: &str) -> Result<ClusterStats> {
        let client = self.client_for(context_name).await?;
        let nodes: Api<Node> = Api::all(client.clone());
        let pods: Api<Pod> = Api::all(client);
        let node_list = nodes
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list nodes for {context_name}"))?;
        let pod_list = pods
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list pods for {context_name}"))?;

        Ok(ClusterStats {
            nodes: node_list.items.len(),
            ready_nodes: node_list.items.iter().filter(|node| node_is_ready(node)).count(),
            pods: pod_list.items.len(),
        })
    }
}

async fn list_names<K>(client: Client) -> Result<Vec<String>>
where
    K: Clone + std::fmt::Debug + serde::de::DeserializeOwned + kube::Resource,
    <K as kube::Resource>::DynamicType: Default,
{
    let api: Api<K> = Api::all(client);
    let listed = api
        .list(&ListParams::default())
        .await
        .context("failed to list resources")?;
    Ok(listed.items.iter().map(|item| item.name_any()).collect())
}

fn node_is_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|condition| condition.type_ == "Ready" && condition.status == "True")
        })
}
