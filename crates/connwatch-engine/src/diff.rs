use std::collections::HashSet;

use connwatch_types::{Connection, ConnectionId};

/// Ledger entries whose id is absent from `active`, in ledger order.
///
/// Pass the ledger as it stood before `active` was merged into it.
pub fn closed(active: &[Connection], ledger: &[Connection]) -> Vec<Connection> {
    let active_ids: HashSet<&ConnectionId> = active.iter().map(|conn| &conn.id).collect();
    ledger
        .iter()
        .filter(|conn| !active_ids.contains(&conn.id))
        .cloned()
        .collect()
}
