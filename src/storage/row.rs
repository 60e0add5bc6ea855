use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::constants::AUDIT_TABLE;
use crate::constants::CLUSTER_TABLE;
use crate::constants::NAMESPACE_TABLE;
use crate::constants::RELEASE_HISTORY_TABLE;
use crate::constants::RELEASE_TABLE;
use crate::constants::RULE_TABLE;
use crate::Audit;
use crate::Cluster;
use crate::DataChange;
use crate::Namespace;
use crate::Release;
use crate::ReleaseHistory;
use crate::Result;
use crate::TagReleaseRule;

const KEY_DELIMITER: u8 = b'/';
const INDEX_DELIMITER: u8 = b'@';
const SCOPE_TERMINATOR: u8 = 0;

/// A table row with a store-assigned id and bookkeeping columns
pub trait Row: Serialize + DeserializeOwned + Clone {
    const TABLE: &'static str;

    fn id(&self) -> u64;

    fn set_id(
        &mut self,
        id: u64,
    );

    fn data_change(&self) -> &DataChange;

    fn data_change_mut(&mut self) -> &mut DataChange;

    /// Columns of the secondary index, empty for unindexed tables
    fn index_scope(&self) -> Vec<&str>;

    fn is_deleted(&self) -> bool {
        self.data_change().is_deleted
    }
}

macro_rules! impl_row {
    ($ty:ty, $table:expr, [$($column:ident),*]) => {
        impl Row for $ty {
            const TABLE: &'static str = $table;

            fn id(&self) -> u64 {
                self.id
            }

            fn set_id(
                &mut self,
                id: u64,
            ) {
                self.id = id;
            }

            fn data_change(&self) -> &DataChange {
                &self.data_change
            }

            fn data_change_mut(&mut self) -> &mut DataChange {
                &mut self.data_change
            }

            fn index_scope(&self) -> Vec<&str> {
                vec![$(self.$column.as_str()),*]
            }
        }
    };
}

impl_row!(TagReleaseRule, RULE_TABLE, [app_id, namespace_name]);
impl_row!(Cluster, CLUSTER_TABLE, [app_id]);
impl_row!(Namespace, NAMESPACE_TABLE, [app_id]);
impl_row!(Release, RELEASE_TABLE, [app_id, cluster_name, namespace_name]);
impl_row!(ReleaseHistory, RELEASE_HISTORY_TABLE, []);
impl_row!(Audit, AUDIT_TABLE, []);

/// `table/`
pub(crate) fn table_prefix(table: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(table.len() + 1);
    prefix.extend_from_slice(table.as_bytes());
    prefix.push(KEY_DELIMITER);
    prefix
}

/// `table/<id as 8 big-endian bytes>`, so byte order equals id order
pub(crate) fn row_key(
    table: &str,
    id: u64,
) -> Vec<u8> {
    let mut key = table_prefix(table);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

pub(crate) fn encode_row<R: Row>(row: &R) -> Result<Vec<u8>> {
    Ok(bincode::serialize(row)?)
}

pub(crate) fn decode_row<R: Row>(bytes: &[u8]) -> Result<R> {
    Ok(bincode::deserialize(bytes)?)
}

/// `table@<col>\0<col>\0`, the secondary index slot of `scope`
pub(crate) fn row_index_prefix(
    table: &str,
    scope: &[&str],
) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(table.len() + 1 + scope.iter().map(|c| c.len() + 1).sum::<usize>());
    prefix.extend_from_slice(table.as_bytes());
    prefix.push(INDEX_DELIMITER);
    for column in scope {
        prefix.extend_from_slice(column.as_bytes());
        prefix.push(SCOPE_TERMINATOR);
    }
    prefix
}

/// Index entry of `row`, or `None` for unindexed tables
pub(crate) fn row_index_key<R: Row>(row: &R) -> Option<Vec<u8>> {
    let scope = row.index_scope();
    if scope.is_empty() {
        return None;
    }
    let mut key = row_index_prefix(R::TABLE, &scope);
    key.extend_from_slice(&row.id().to_be_bytes());
    Some(key)
}

/// Row id stored in the trailing 8 bytes of an index key
pub(crate) fn row_index_id(key: &[u8]) -> Option<u64> {
    let tail = key.len().checked_sub(8).map(|start| &key[start..])?;
    tail.try_into().ok().map(u64::from_be_bytes)
}
