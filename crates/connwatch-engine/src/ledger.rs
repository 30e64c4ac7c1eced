use std::collections::{HashMap, HashSet};

use connwatch_types::{Connection, ConnectionId};

/// What happens when a merged record's id is already in the ledger.
///
/// Either way the entry keeps the position of its first sighting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// The ledger entry is left untouched.
    KeepFirst,
    /// The ledger entry is replaced by the incoming record.
    #[default]
    RefreshLatest,
}

impl CollisionPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "keep-first" | "keep_first" => Some(Self::KeepFirst),
            "refresh-latest" | "refresh_latest" => Some(Self::RefreshLatest),
            _ => None,
        }
    }
}

/// Id-keyed union: every id of `ledger` or `active` exactly once.
///
/// Existing entries win on collision. New ids follow in `active` order.
pub fn union(ledger: &[Connection], active: &[Connection]) -> Vec<Connection> {
    let mut seen: HashSet<&ConnectionId> = HashSet::with_capacity(ledger.len() + active.len());
    let mut merged = Vec::with_capacity(ledger.len() + active.len());
    for conn in ledger.iter().chain(active) {
        if seen.insert(&conn.id) {
            merged.push(conn.clone());
        }
    }
    merged
}

/// Rolling superset of recently seen connections, oldest first.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<Connection>,
    policy: CollisionPolicy,
}

impl Ledger {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[Connection] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.entries.iter()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.entries.iter().any(|conn| &conn.id == id)
    }

    /// Folds the active set in, appending ids not seen before.
    pub fn merge(&mut self, active: &[Connection]) {
        let mut positions: HashMap<ConnectionId, usize> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, conn)| (conn.id.clone(), idx))
            .collect();

        for conn in active {
            match positions.get(&conn.id).copied() {
                Some(idx) => {
                    if self.policy == CollisionPolicy::RefreshLatest {
                        self.entries[idx] = conn.clone();
                    }
                }
                None => {
                    positions.insert(conn.id.clone(), self.entries.len());
                    self.entries.push(conn.clone());
                }
            }
        }
    }

    /// Keeps every entry still in `active` plus the newest `max_closed_rows`
    /// entries that are not, dropping older closed entries. Returns how many
    /// entries were dropped.
    ///
    /// The ledger never exceeds `active.len() + max_closed_rows` afterwards.
    pub fn truncate(&mut self, active: &[Connection], max_closed_rows: usize) -> usize {
        let active_ids: HashSet<&ConnectionId> = active.iter().map(|conn| &conn.id).collect();

        let mut keep = vec![false; self.entries.len()];
        let mut closed_budget = max_closed_rows;
        for (idx, conn) in self.entries.iter().enumerate().rev() {
            if active_ids.contains(&conn.id) {
                keep[idx] = true;
            } else if closed_budget > 0 {
                closed_budget -= 1;
                keep[idx] = true;
            }
        }

        let before = self.entries.len();
        let mut flags = keep.into_iter();
        self.entries.retain(|_| flags.next().unwrap_or(false));
        before - self.entries.len()
    }

    pub fn clear(&mut self) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        cleared
    }
}
