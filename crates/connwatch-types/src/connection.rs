use facet::Facet;
use std::collections::BTreeMap;

use crate::{ConnectionId, StartTime};

/// One connection as reported by the upstream proxy, before speed annotation.
#[derive(Facet, Clone, Debug, PartialEq)]
pub struct RawConnection {
    pub id: ConnectionId,
    pub metadata: BTreeMap<String, String>,
    pub chains: Vec<String>,
    /// Cumulative downloaded bytes; `None` when the source sent no usable number.
    pub download: Option<i64>,
    /// Cumulative uploaded bytes; `None` when the source sent no usable number.
    pub upload: Option<i64>,
    pub start: StartTime,
    #[facet(skip_unless_truthy)]
    pub rule: Option<String>,
    #[facet(skip_unless_truthy)]
    pub rule_payload: Option<String>,
}

/// A connection with throughput derived from the previous observation.
#[derive(Facet, Clone, Debug, PartialEq)]
pub struct Connection {
    pub id: ConnectionId,
    pub metadata: BTreeMap<String, String>,
    pub chains: Vec<String>,
    pub download: Option<i64>,
    pub upload: Option<i64>,
    /// Bytes downloaded since the previous snapshot. Negative after an upstream counter reset.
    pub download_speed: i64,
    /// Bytes uploaded since the previous snapshot. Negative after an upstream counter reset.
    pub upload_speed: i64,
    pub start: StartTime,
    #[facet(skip_unless_truthy)]
    pub rule: Option<String>,
    #[facet(skip_unless_truthy)]
    pub rule_payload: Option<String>,
}

impl Connection {
    pub fn from_raw(raw: RawConnection, download_speed: i64, upload_speed: i64) -> Self {
        let RawConnection {
            id,
            metadata,
            chains,
            download,
            upload,
            start,
            rule,
            rule_payload,
        } = raw;
        Self {
            id,
            metadata,
            chains,
            download,
            upload,
            download_speed,
            upload_speed,
            start,
            rule,
            rule_payload,
        }
    }

    /// Top-level text fields, in declaration order.
    pub fn text_fields(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.id.as_str()),
            Some(self.start.as_str()),
            self.rule.as_deref(),
            self.rule_payload.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Full-state report of every connection the proxy believes is open.
///
/// `connections: None` is a keep-alive tick that carries only totals.
#[derive(Facet, Clone, Debug, PartialEq)]
pub struct SnapshotMessage {
    #[facet(skip_unless_truthy)]
    pub connections: Option<Vec<RawConnection>>,
    pub upload_total: i64,
    pub download_total: i64,
}

impl SnapshotMessage {
    pub fn totals(&self) -> TrafficTotals {
        TrafficTotals {
            upload_total: self.upload_total,
            download_total: self.download_total,
        }
    }
}

/// Process-wide byte totals from the most recent snapshot message.
#[derive(Facet, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrafficTotals {
    pub upload_total: i64,
    pub download_total: i64,
}
