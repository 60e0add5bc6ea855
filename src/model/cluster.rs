use serde::Deserialize;
use serde::Serialize;

use super::DataChange;

/// A cluster of an application. Root clusters have `parent_cluster_id == 0`;
/// branch clusters point at their root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: u64,
    pub app_id: String,
    pub name: String,
    pub parent_cluster_id: u64,
    pub data_change: DataChange,
}

impl Cluster {
    pub fn new_root(
        app_id: &str,
        name: &str,
        operator: &str,
    ) -> Self {
        Self {
            id: 0,
            app_id: app_id.to_string(),
            name: name.to_string(),
            parent_cluster_id: 0,
            data_change: DataChange::new(operator),
        }
    }

    pub fn new_branch(
        parent: &Cluster,
        name: &str,
        operator: &str,
    ) -> Self {
        Self {
            id: 0,
            app_id: parent.app_id.clone(),
            name: name.to_string(),
            parent_cluster_id: parent.id,
            data_change: DataChange::new(operator),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_cluster_id == 0
    }
}

/// A namespace instance living under one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: u64,
    pub app_id: String,
    pub cluster_name: String,
    pub namespace_name: String,
    pub data_change: DataChange,
}

impl Namespace {
    pub fn new(
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
        operator: &str,
    ) -> Self {
        Self {
            id: 0,
            app_id: app_id.to_string(),
            cluster_name: cluster_name.to_string(),
            namespace_name: namespace_name.to_string(),
            data_change: DataChange::new(operator),
        }
    }
}

/// A branch namespace together with the tag its rule binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNamespace {
    pub namespace: Namespace,
    pub tag: String,
}
