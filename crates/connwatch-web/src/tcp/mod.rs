use std::net::SocketAddr;

use connwatch_wire::{DEFAULT_MAX_FRAME_BYTES, decode_protocol_magic, decode_snapshot_payload};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::app::{AppState, FeedId};

pub async fn run_tcp_acceptor(listener: TcpListener, state: AppState) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!(%addr, "TCP connection accepted");
                let st = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_feed(stream, addr, st).await {
                        error!(%addr, %e, "feed error");
                    }
                });
            }
            Err(e) => error!(%e, "TCP accept failed"),
        }
    }
}

async fn handle_feed(mut stream: TcpStream, addr: SocketAddr, state: AppState) -> Result<(), String> {
    let claimed = state.feed.lock().await.claim(addr);
    let feed_id = match claimed {
        Ok(feed_id) => feed_id,
        Err((active_id, active_peer)) => {
            warn!(%addr, feed = %active_id, peer = %active_peer, "refusing second feed");
            return Ok(());
        }
    };
    info!(feed = %feed_id, %addr, "feed connected");

    let read_result = read_snapshots(feed_id, &mut stream, &state).await;

    state.feed.lock().await.release(feed_id);
    match state.pipeline.reset("feed disconnected").await {
        Ok(cleared) => info!(feed = %feed_id, cleared, "feed disconnected"),
        Err(e) => warn!(feed = %feed_id, %e, "failed to reset pipeline after feed ended"),
    }
    read_result
}

async fn read_snapshots<R>(feed_id: FeedId, reader: &mut R, state: &AppState) -> Result<(), String>
where
    R: AsyncRead + Unpin,
{
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .await
        .map_err(|e| format!("read protocol magic: {e}"))?;
    decode_protocol_magic(magic).map_err(|e| format!("invalid protocol magic: {e}"))?;

    loop {
        let mut len_buf = [0u8; 4];
        if let Err(e) = reader.read_exact(&mut len_buf).await {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                debug!(feed = %feed_id, "feed closed (EOF)");
                return Ok(());
            }
            return Err(format!("read frame len: {e}"));
        }

        let payload_len = u32::from_be_bytes(len_buf) as usize;
        if payload_len > DEFAULT_MAX_FRAME_BYTES {
            return Err(format!("frame too large: {payload_len}"));
        }

        let mut payload = vec![0u8; payload_len];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(|e| format!("read frame payload: {e}"))?;

        match decode_snapshot_payload(&payload) {
            Ok(message) => {
                state.feed.lock().await.record_frame(feed_id, true);
                state.pipeline.submit_snapshot(message).await?;
            }
            Err(e) => {
                state.feed.lock().await.record_frame(feed_id, false);
                warn!(feed = %feed_id, %e, payload_len, "skipping undecodable snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::pipeline::spawn_pipeline;
    use connwatch_engine::{EngineConfig, MemoryPreferences};
    use connwatch_types::{ConnectionId, RawConnection, SnapshotMessage, StartTime};
    use connwatch_wire::{encode_frame, encode_protocol_magic, encode_snapshot_frame_default};
    use tokio::io::AsyncWriteExt;

    fn state() -> AppState {
        let prefs = Arc::new(MemoryPreferences::new());
        let (pipeline, _task) = spawn_pipeline(EngineConfig::default(), prefs.clone());
        AppState::new(pipeline, prefs)
    }

    fn snapshot(ids: &[&str]) -> SnapshotMessage {
        SnapshotMessage {
            connections: Some(
                ids.iter()
                    .map(|id| RawConnection {
                        id: ConnectionId::new(*id),
                        metadata: BTreeMap::new(),
                        chains: vec!["direct".into()],
                        download: Some(0),
                        upload: Some(0),
                        start: StartTime::new("2024-05-01T10:00:00Z"),
                        rule: None,
                        rule_payload: None,
                    })
                    .collect(),
            ),
            upload_total: 0,
            download_total: 0,
        }
    }

    async fn wait_for(state: &AppState, predicate: impl Fn(&AppState) -> bool) {
        let mut views = state.pipeline.views().clone();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !predicate(state) {
                views.current_marking_seen();
                if predicate(state) {
                    break;
                }
                views.changed().await.expect("pipeline alive");
            }
        })
        .await
        .expect("condition reached in time");
    }

    async fn start() -> (AppState, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = state();
        tokio::spawn(run_tcp_acceptor(listener, state.clone()));
        (state, addr)
    }

    #[tokio::test]
    async fn frames_reach_the_pipeline_and_disconnect_resets() {
        let (state, addr) = start().await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&encode_protocol_magic()).await.unwrap();
        client
            .write_all(&encode_snapshot_frame_default(Some(&snapshot(&["a", "b"]))).unwrap())
            .await
            .unwrap();
        client
            .write_all(&encode_frame(b"not json", DEFAULT_MAX_FRAME_BYTES).unwrap())
            .await
            .unwrap();
        client
            .write_all(&encode_snapshot_frame_default(Some(&snapshot(&["b"]))).unwrap())
            .await
            .unwrap();

        wait_for(&state, |s| {
            let update = s.pipeline.views().current();
            update.active.len() == 1 && update.closed.len() == 1
        })
        .await;
        {
            let guard = state.feed.lock().await;
            let feed = guard.active.as_ref().expect("feed attached");
            assert_eq!((feed.frames_received, feed.frames_rejected), (2, 1));
        }

        drop(client);
        wait_for(&state, |s| {
            let update = s.pipeline.views().current();
            update.active.is_empty() && update.closed.is_empty()
        })
        .await;
    }

    #[tokio::test]
    async fn second_feed_is_refused_while_one_is_active() {
        let (state, addr) = start().await;
        let mut first = TcpStream::connect(addr).await.unwrap();
        first.write_all(&encode_protocol_magic()).await.unwrap();
        first
            .write_all(&encode_snapshot_frame_default(Some(&snapshot(&["a"]))).unwrap())
            .await
            .unwrap();
        wait_for(&state, |s| s.pipeline.views().current().active.len() == 1).await;

        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 1];
        let read = tokio::time::timeout(Duration::from_secs(5), second.read(&mut buf))
            .await
            .expect("refused feed is closed promptly");
        assert!(matches!(read, Ok(0) | Err(_)), "server closed the second feed");

        let guard = state.feed.lock().await;
        let feed = guard.active.as_ref().expect("first feed still attached");
        assert_eq!(feed.frames_received, 1);
    }

    #[tokio::test]
    async fn bad_magic_is_rejected() {
        let state = state();
        let mut input: &[u8] = b"NOPE";
        let err = read_snapshots(FeedId::ONE, &mut input, &state)
            .await
            .unwrap_err();
        assert!(err.contains("invalid protocol magic"), "error: {err}");
    }

    #[tokio::test]
    async fn oversized_frame_closes_the_feed() {
        let state = state();
        let mut input = encode_protocol_magic().to_vec();
        input.extend_from_slice(&((DEFAULT_MAX_FRAME_BYTES as u32) + 1).to_be_bytes());
        let mut reader: &[u8] = &input;
        let err = read_snapshots(FeedId::ONE, &mut reader, &state)
            .await
            .unwrap_err();
        assert!(err.contains("frame too large"), "error: {err}");
    }
}
