use std::cmp::Ordering;

use connwatch_types::{Connection, SortField, SortSpec};

/// How the active and closed sets are shaped for consumers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewOptions {
    /// Case-sensitive prefix matched against metadata and top-level text fields.
    pub filter: Option<String>,
    pub sort: Option<SortSpec>,
    /// Active rows kept, counted from the front after filter and sort.
    pub visible_rows: usize,
    /// Closed rows kept, counted from the back.
    pub max_closed_rows: usize,
}

/// Produces the active and closed views.
///
/// The active set is filtered, stably sorted, then cut to its first
/// `visible_rows` entries. The closed list keeps its last `max_closed_rows`
/// entries, so the most recently closed survive.
pub fn materialize(
    active: &[Connection],
    mut closed: Vec<Connection>,
    options: &ViewOptions,
) -> (Vec<Connection>, Vec<Connection>) {
    let filter = options.filter.as_deref().filter(|text| !text.is_empty());
    let mut active_view: Vec<Connection> = active
        .iter()
        .filter(|conn| filter.is_none_or(|text| matches_filter(conn, text)))
        .cloned()
        .collect();

    if let Some(spec) = options.sort {
        sort_connections(&mut active_view, spec);
    }
    active_view.truncate(options.visible_rows);

    let excess = closed.len().saturating_sub(options.max_closed_rows);
    closed.drain(..excess);

    (active_view, closed)
}

/// True when any metadata value or top-level text field starts with `text`.
pub fn matches_filter(conn: &Connection, text: &str) -> bool {
    conn.metadata.values().any(|value| value.starts_with(text))
        || conn.text_fields().any(|value| value.starts_with(text))
}

/// Stable sort; ties keep their current relative order.
pub fn sort_connections(conns: &mut [Connection], spec: SortSpec) {
    conns.sort_by(|a, b| {
        let ordering = compare_by(a, b, spec.field);
        if spec.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn compare_by(a: &Connection, b: &Connection, field: SortField) -> Ordering {
    match field {
        SortField::DownloadSpeed => a.download_speed.cmp(&b.download_speed),
        SortField::UploadSpeed => a.upload_speed.cmp(&b.upload_speed),
        SortField::ConnectTime => a.start.unix_ms().cmp(&b.start.unix_ms()),
        SortField::Download => a.download.cmp(&b.download),
        SortField::Upload => a.upload.cmp(&b.upload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connwatch_types::{ConnectionId, StartTime};
    use std::collections::BTreeMap;

    fn conn(id: &str, host: &str, download_speed: i64, start: &str) -> Connection {
        Connection {
            id: ConnectionId::new(id),
            metadata: BTreeMap::from([("host".to_string(), host.to_string())]),
            chains: vec!["DIRECT".into()],
            download: Some(download_speed * 10),
            upload: Some(0),
            download_speed,
            upload_speed: 0,
            start: StartTime::new(start),
            rule: None,
            rule_payload: None,
        }
    }

    fn ids(conns: &[Connection]) -> Vec<&str> {
        conns.iter().map(|c| c.id.as_str()).collect()
    }

    fn options(visible_rows: usize, max_closed_rows: usize) -> ViewOptions {
        ViewOptions {
            filter: None,
            sort: None,
            visible_rows,
            max_closed_rows,
        }
    }

    #[test]
    fn active_view_keeps_first_rows() {
        let active = vec![
            conn("a", "a.example", 1, ""),
            conn("b", "b.example", 2, ""),
            conn("c", "c.example", 3, ""),
        ];
        let (view, _) = materialize(&active, vec![], &options(2, 10));
        assert_eq!(ids(&view), vec!["a", "b"]);
    }

    #[test]
    fn closed_view_keeps_last_rows() {
        let closed = vec![
            conn("old", "x", 0, ""),
            conn("mid", "x", 0, ""),
            conn("new", "x", 0, ""),
        ];
        let (_, view) = materialize(&[], closed, &options(10, 2));
        assert_eq!(ids(&view), vec!["mid", "new"]);
    }

    #[test]
    fn filter_matches_metadata_prefix_case_sensitively() {
        let active = vec![
            conn("1", "github.com", 0, ""),
            conn("2", "api.github.com", 0, ""),
            conn("3", "GitHub.io", 0, ""),
        ];
        let mut opts = options(10, 10);
        opts.filter = Some("git".into());
        let (view, _) = materialize(&active, vec![], &opts);
        assert_eq!(ids(&view), vec!["1"]);
    }

    #[test]
    fn filter_matches_top_level_text_fields() {
        let mut with_rule = conn("r1", "a.example", 0, "");
        with_rule.rule = Some("GeoSite".into());
        let active = vec![with_rule, conn("abc", "b.example", 0, "")];

        let mut opts = options(10, 10);
        opts.filter = Some("Geo".into());
        assert_eq!(ids(&materialize(&active, vec![], &opts).0), vec!["r1"]);

        opts.filter = Some("ab".into());
        assert_eq!(ids(&materialize(&active, vec![], &opts).0), vec!["abc"]);
    }

    #[test]
    fn filter_applies_before_capping_and_not_to_closed() {
        let active = vec![
            conn("1", "skip.example", 0, ""),
            conn("2", "keep.example", 0, ""),
            conn("3", "keep.example", 0, ""),
        ];
        let closed = vec![conn("gone", "skip.example", 0, "")];
        let mut opts = options(1, 10);
        opts.filter = Some("keep".into());
        let (active_view, closed_view) = materialize(&active, closed, &opts);
        assert_eq!(ids(&active_view), vec!["2"]);
        assert_eq!(ids(&closed_view), vec!["gone"]);
    }

    #[test]
    fn empty_filter_means_no_filter() {
        let active = vec![conn("1", "a", 0, "")];
        let mut opts = options(10, 10);
        opts.filter = Some(String::new());
        assert_eq!(materialize(&active, vec![], &opts).0.len(), 1);
    }

    #[test]
    fn sort_descending_by_download_speed_then_cap() {
        let active = vec![
            conn("slow", "x", 1, ""),
            conn("fast", "x", 9, ""),
            conn("mid", "x", 5, ""),
        ];
        let mut opts = options(2, 10);
        opts.sort = Some(SortSpec {
            field: SortField::DownloadSpeed,
            descending: true,
        });
        let (view, _) = materialize(&active, vec![], &opts);
        assert_eq!(ids(&view), vec!["fast", "mid"]);
    }

    #[test]
    fn sort_is_stable_for_ties_in_both_directions() {
        let mut conns = vec![
            conn("a", "x", 5, ""),
            conn("b", "x", 1, ""),
            conn("c", "x", 5, ""),
        ];
        sort_connections(
            &mut conns,
            SortSpec {
                field: SortField::DownloadSpeed,
                descending: true,
            },
        );
        assert_eq!(ids(&conns), vec!["a", "c", "b"]);

        sort_connections(
            &mut conns,
            SortSpec {
                field: SortField::DownloadSpeed,
                descending: false,
            },
        );
        assert_eq!(ids(&conns), vec!["b", "a", "c"]);
    }

    #[test]
    fn sort_by_connect_time_uses_parsed_instants() {
        let mut conns = vec![
            conn("late", "x", 0, "2024-05-01T12:00:00Z"),
            conn("early", "x", 0, "2024-05-01T13:00:00+02:00"),
            conn("mid", "x", 0, "2024-05-01T11:30:00Z"),
        ];
        sort_connections(
            &mut conns,
            SortSpec {
                field: SortField::ConnectTime,
                descending: false,
            },
        );
        assert_eq!(ids(&conns), vec!["early", "mid", "late"]);
    }
}
