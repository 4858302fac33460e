//! Read-only view of a domain's replication state.

/// Domain metadata returned by a [`DomainResolver`](crate::DomainResolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSnapshot {
    /// Display name, also the rate limiter key
    pub name: String,
    /// Whether the domain is replicated across clusters
    pub is_global: bool,
    /// Cluster currently processing the domain; only meaningful when global
    pub active_cluster_name: String,
}

impl DomainSnapshot {
    /// A domain that lives in a single cluster.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_global: false,
            active_cluster_name: String::new(),
        }
    }

    /// A replicated domain currently active in `active_cluster_name`.
    pub fn global(name: impl Into<String>, active_cluster_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_global: true,
            active_cluster_name: active_cluster_name.into(),
        }
    }

    /// Whether `current_cluster` should process this domain's work at full priority.
    ///
    /// Local domains are always active. Global domains are active only in the
    /// cluster named as their active cluster.
    pub fn is_active_in(&self, current_cluster: &str) -> bool {
        !self.is_global || self.active_cluster_name == current_cluster
    }
}
