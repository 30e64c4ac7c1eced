use facet::Facet;
use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Opaque connection identifier assigned by the upstream proxy.
///
/// This is the only key used to match records across snapshots.
#[derive(Facet, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[facet(transparent)]
pub struct ConnectionId(pub(crate) String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection establishment time, kept as the text the source sent.
#[derive(Facet, Clone, Debug, PartialEq, Eq, Hash)]
#[facet(transparent)]
pub struct StartTime(pub(crate) String);

impl StartTime {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Milliseconds since the Unix epoch, when the text is RFC 3339.
    pub fn unix_ms(&self) -> Option<i64> {
        let parsed = OffsetDateTime::parse(&self.0, &Rfc3339).ok()?;
        i64::try_from(parsed.unix_timestamp_nanos() / 1_000_000).ok()
    }
}

impl fmt::Display for StartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_time_parses_rfc3339_with_offset() {
        let utc = StartTime::new("2024-05-01T10:00:00Z");
        let shifted = StartTime::new("2024-05-01T12:00:00+02:00");
        assert_eq!(utc.unix_ms(), Some(1_714_557_600_000));
        assert_eq!(utc.unix_ms(), shifted.unix_ms());
    }

    #[test]
    fn start_time_keeps_fractional_millis() {
        let t = StartTime::new("2024-05-01T10:00:00.250Z");
        assert_eq!(t.unix_ms(), Some(1_714_557_600_250));
    }

    #[test]
    fn unparsable_start_time_has_no_instant() {
        assert_eq!(StartTime::new("yesterday").unix_ms(), None);
        assert_eq!(StartTime::new("").unix_ms(), None);
    }
}
