use std::collections::{BTreeMap, HashSet};

use connwatch_engine::diff::closed;
use connwatch_engine::ledger::union;
use connwatch_engine::speed::annotate;
use connwatch_engine::{EngineConfig, Pipeline, ViewPrefs};
use connwatch_types::{Connection, ConnectionId, RawConnection, SnapshotMessage, StartTime};
use proptest::prelude::*;

fn raw(id: &str, download: i64, upload: i64) -> RawConnection {
    RawConnection {
        id: ConnectionId::new(id),
        metadata: BTreeMap::new(),
        chains: vec!["DIRECT".into()],
        download: Some(download),
        upload: Some(upload),
        start: StartTime::new("2024-05-01T10:00:00Z"),
        rule: None,
        rule_payload: None,
    }
}

fn conns(ids: &[u8]) -> Vec<Connection> {
    annotate(ids.iter().map(|id| raw(&format!("c{id}"), 0, 0)).collect(), &[])
}

fn id_set(conns: &[Connection]) -> HashSet<String> {
    conns.iter().map(|c| c.id.to_string()).collect()
}

proptest! {
    #[test]
    fn union_has_every_id_exactly_once(
        left in prop::collection::vec(0u8..32, 0..24),
        right in prop::collection::vec(0u8..32, 0..24),
    ) {
        let ledger = conns(&left);
        let active = conns(&right);
        let merged = union(&ledger, &active);

        let merged_ids: Vec<String> = merged.iter().map(|c| c.id.to_string()).collect();
        let unique: HashSet<&String> = merged_ids.iter().collect();
        prop_assert_eq!(unique.len(), merged_ids.len(), "duplicate ids in {:?}", merged_ids);

        let mut expected = id_set(&ledger);
        expected.extend(id_set(&active));
        prop_assert_eq!(id_set(&merged), expected);
    }

    #[test]
    fn closed_is_exactly_ledger_minus_active(
        ledger_ids in prop::collection::vec(0u8..32, 0..24),
        active_ids in prop::collection::vec(0u8..32, 0..24),
    ) {
        let ledger = conns(&ledger_ids);
        let active = conns(&active_ids);
        let result = closed(&active, &ledger);

        let active_set = id_set(&active);
        let expected: HashSet<String> = id_set(&ledger)
            .into_iter()
            .filter(|id| !active_set.contains(id))
            .collect();
        prop_assert_eq!(id_set(&result), expected);
        prop_assert!(closed(&active, &active).is_empty());
    }

    #[test]
    fn speed_is_the_counter_delta(
        first_dl in 0i64..1_000_000,
        first_ul in 0i64..1_000_000,
        next_dl in 0i64..1_000_000,
        next_ul in 0i64..1_000_000,
    ) {
        let prior = annotate(vec![raw("x", first_dl, first_ul)], &[]);
        prop_assert_eq!((prior[0].download_speed, prior[0].upload_speed), (0, 0));
        let next = annotate(vec![raw("x", next_dl, next_ul)], &prior);
        prop_assert_eq!(next[0].download_speed, next_dl - first_dl);
        prop_assert_eq!(next[0].upload_speed, next_ul - first_ul);
    }

    #[test]
    fn ledger_stays_within_window_under_churn(
        sizes in prop::collection::vec(0usize..12, 1..40),
        max_closed in 0usize..16,
    ) {
        let mut pipeline = Pipeline::new(EngineConfig {
            max_closed_rows: max_closed,
            ..EngineConfig::default()
        });
        let prefs = ViewPrefs::default();
        for (tick, size) in sizes.iter().enumerate() {
            let snapshot = (0..*size)
                .map(|n| raw(&format!("t{tick}-{n}"), 0, 0))
                .collect();
            pipeline.ingest(
                Some(SnapshotMessage {
                    connections: Some(snapshot),
                    upload_total: 0,
                    download_total: 0,
                }),
                &prefs,
            );
            prop_assert!(pipeline.ledger().len() <= size + max_closed);
            prop_assert!(pipeline.closed_view().len() <= max_closed);
        }
    }
}
