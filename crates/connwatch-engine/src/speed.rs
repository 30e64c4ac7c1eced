use std::collections::HashMap;

use connwatch_types::{Connection, ConnectionId, RawConnection};

/// Annotates a snapshot with per-connection throughput.
///
/// Speeds are the counter deltas against the record with the same id in
/// `prior_active`. First sightings, and records where either side lacks a
/// numeric counter, get zero speed. Negative deltas are kept as-is. Output
/// order follows `snapshot`.
pub fn annotate(snapshot: Vec<RawConnection>, prior_active: &[Connection]) -> Vec<Connection> {
    let prior: HashMap<&ConnectionId, &Connection> =
        prior_active.iter().map(|conn| (&conn.id, conn)).collect();

    snapshot
        .into_iter()
        .map(|raw| {
            let (download_speed, upload_speed) = prior
                .get(&raw.id)
                .and_then(|prev| counter_deltas(&raw, prev))
                .unwrap_or((0, 0));
            Connection::from_raw(raw, download_speed, upload_speed)
        })
        .collect()
}

fn counter_deltas(current: &RawConnection, prior: &Connection) -> Option<(i64, i64)> {
    let download = current.download?.saturating_sub(prior.download?);
    let upload = current.upload?.saturating_sub(prior.upload?);
    Some((download, upload))
}
