use crate::error::{ProtocolError, Result};

/// Stable wire identifiers for the recognized RPC actions (spec §6).
///
/// Exact numeric values are not load-bearing (per spec), only that the set
/// is fixed and each action round-trips through `as_u8`/`try_from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    RelationalListDatabases = 1,
    RelationalListTables = 2,
    RelationalDeleteTables = 3,
    KvListDatabases = 4,
    KvCleanup = 5,
    ObjectStoreListBuckets = 6,
    ObjectStoreListPrefixes = 7,
    ObjectStoreCleanup = 8,
    SearchListIndices = 9,
    SearchCleanup = 10,
    JobStatus = 11,
}

impl Action {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Action {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Action::RelationalListDatabases),
            2 => Ok(Action::RelationalListTables),
            3 => Ok(Action::RelationalDeleteTables),
            4 => Ok(Action::KvListDatabases),
            5 => Ok(Action::KvCleanup),
            6 => Ok(Action::ObjectStoreListBuckets),
            7 => Ok(Action::ObjectStoreListPrefixes),
            8 => Ok(Action::ObjectStoreCleanup),
            9 => Ok(Action::SearchListIndices),
            10 => Ok(Action::SearchCleanup),
            11 => Ok(Action::JobStatus),
            other => Err(ProtocolError::UnknownAction(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_every_action() {
        let all = [
            Action::RelationalListDatabases,
            Action::RelationalListTables,
            Action::RelationalDeleteTables,
            Action::KvListDatabases,
            Action::KvCleanup,
            Action::ObjectStoreListBuckets,
            Action::ObjectStoreListPrefixes,
            Action::ObjectStoreCleanup,
            Action::SearchListIndices,
            Action::SearchCleanup,
            Action::JobStatus,
        ];
        for action in all {
            assert_eq!(Action::try_from(action.as_u8()).unwrap(), action);
        }
    }

    #[test]
    fn rejects_unknown_code() {
        assert!(matches!(
            Action::try_from(200),
            Err(ProtocolError::UnknownAction(200))
        ));
    }
}
