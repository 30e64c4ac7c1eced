use std::collections::BTreeMap;

use connwatch_types::{ChainSpeed, Connection};

/// Sums download speed per routing-chain label.
///
/// A connection counts in full towards every chain it lists.
pub fn speed_by_chain(active: &[Connection]) -> BTreeMap<String, i64> {
    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    for conn in active {
        for chain in &conn.chains {
            let total = totals.entry(chain.clone()).or_insert(0);
            *total = total.saturating_add(conn.download_speed);
        }
    }
    totals
}

pub fn chain_speed_rows(totals: &BTreeMap<String, i64>) -> Vec<ChainSpeed> {
    totals
        .iter()
        .map(|(chain, download_speed)| ChainSpeed {
            chain: chain.clone(),
            download_speed: *download_speed,
        })
        .collect()
}
