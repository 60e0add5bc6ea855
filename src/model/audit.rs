use serde::Deserialize;
use serde::Serialize;

use super::DataChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOp {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub id: u64,
    pub entity_name: String,
    pub entity_id: u64,
    pub op: AuditOp,
    pub data_change: DataChange,
}

impl Audit {
    pub fn new(
        entity_name: &str,
        entity_id: u64,
        op: AuditOp,
        operator: &str,
    ) -> Self {
        Self {
            id: 0,
            entity_name: entity_name.to_string(),
            entity_id,
            op,
            data_change: DataChange::new(operator),
        }
    }
}
