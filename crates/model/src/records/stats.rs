use serde::{Deserialize, Serialize};

/// Post-load verification numbers for a destination collection or table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub count: u64,
    /// On-disk size in bytes as reported by the store.
    pub size: u64,
}

/// Stats for one destination entity, tagged with the store it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationStats {
    pub source: super::kind::SourceKind,
    pub entity: String,
    #[serde(flatten)]
    pub stats: EntityStats,
}
