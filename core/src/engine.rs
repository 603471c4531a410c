//! Protocol engine
//!
//! Owns all daemon state and drives the three loops: inbound frame
//! dispatch, local clipboard polling, and the heartbeat/eviction cycle.
//! Every loop observes a shared running flag, so shutdown is a state
//! transition the loops cooperate with rather than an external kill.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;

use crate::clipboard::ClipboardAccess;
use crate::peers::{PeerTable, PeerUpdate};
use crate::protocol::codec::{self, WireMessage};
use crate::protocol::constants::{
    ACK_RECEIVED, CLIPBOARD_POLL_INTERVAL, HEARTBEAT_INTERVAL, MAX_FRAME_SIZE, STALE_TIMEOUT,
};
use crate::transport::UdpTransport;
use crate::Result;

/// Maximum characters of clipboard text shown in event previews
const PREVIEW_LEN: usize = 50;

/// State-change events surfaced to the embedding application
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A new device announced itself
    DeviceDiscovered {
        platform: String,
        name: String,
        addr: IpAddr,
    },
    /// A device went silent past the stale timeout
    DeviceLost { name: String, addr: IpAddr },
    /// Remote clipboard content was applied locally
    ClipboardReceived { from: SocketAddr, preview: String },
    /// A local clipboard change was broadcast
    ClipboardSent { preview: String },
    /// A peer confirmed receipt of our content
    AckReceived { from: SocketAddr, status: String },
}

/// Identity advertised in discovery replies
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    pub platform: String,
    pub name: String,
}

/// The sync daemon state machine.
///
/// The clipboard snapshot is the sole de-duplication mechanism: only local
/// text differing from it is broadcast, and only remote text differing from
/// it is applied. Without it, every applied payload would be re-detected by
/// the poll loop and re-broadcast in a storm.
pub struct SyncEngine {
    transport: UdpTransport,
    identity: LocalIdentity,
    peers: Mutex<PeerTable>,
    /// Last text either sent or applied
    snapshot: Mutex<String>,
    clipboard: Mutex<Box<dyn ClipboardAccess>>,
    events: mpsc::Sender<SyncEvent>,
    running: AtomicBool,
    stopped: Notify,
}

impl SyncEngine {
    pub fn new(
        transport: UdpTransport,
        identity: LocalIdentity,
        clipboard: Box<dyn ClipboardAccess>,
        events: mpsc::Sender<SyncEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            identity,
            peers: Mutex::new(PeerTable::new()),
            snapshot: Mutex::new(String::new()),
            clipboard: Mutex::new(clipboard),
            events,
            running: AtomicBool::new(true),
            stopped: Notify::new(),
        })
    }

    /// Signal all loops to exit at their next checkpoint.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stopped.notify_waiters();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the receive, clipboard poll, and heartbeat loops.
    pub fn spawn_loops(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(Self::receive_loop(Arc::clone(self))),
            tokio::spawn(Self::poll_loop(Arc::clone(self))),
            tokio::spawn(Self::heartbeat_loop(Arc::clone(self))),
        ]
    }

    async fn receive_loop(engine: Arc<Self>) {
        let mut buf = vec![0u8; MAX_FRAME_SIZE];

        while engine.is_running() {
            match engine.transport.recv(&mut buf).await {
                // Timeout: nothing arrived, re-check the running flag
                Ok(None) => continue,
                Ok(Some((frame, src))) => {
                    if let Err(e) = engine.handle_frame(&frame, src).await {
                        tracing::debug!("error handling frame from {}: {}", src, e);
                    }
                }
                Err(e) => {
                    // A recv failure while stopping is the socket winding
                    // down, not a fault
                    if engine.is_running() {
                        tracing::warn!("receive error: {}", e);
                    }
                }
            }
        }

        tracing::debug!("receive loop stopped");
    }

    /// Dispatch one inbound frame.
    ///
    /// The caller contains any error, so a bad frame never takes the
    /// receive loop down.
    pub(crate) async fn handle_frame(&self, frame: &str, src: SocketAddr) -> Result<()> {
        match codec::decode(frame) {
            WireMessage::Discover => self.handle_discover(src).await,
            WireMessage::DeviceAnnounce { platform, name } => {
                self.handle_announce(src, platform, name).await
            }
            WireMessage::ClipboardPayload { text } => self.handle_payload(src, text).await,
            WireMessage::Ack { status } => self.handle_ack(src, status).await,
            WireMessage::Heartbeat => {
                self.peers.lock().await.touch(src.ip());
                Ok(())
            }
            WireMessage::Unknown => Ok(()),
        }
    }

    async fn handle_discover(&self, src: SocketAddr) -> Result<()> {
        // Unicast, never broadcast: replying to the broadcast address would
        // storm the segment when several nodes discover at once
        let reply = codec::encode(&WireMessage::DeviceAnnounce {
            platform: self.identity.platform.clone(),
            name: self.identity.name.clone(),
        })?;
        self.transport.send_to(&reply, src).await?;

        tracing::debug!("responded to discovery from {}", src);
        Ok(())
    }

    async fn handle_announce(&self, src: SocketAddr, platform: String, name: String) -> Result<()> {
        let update = self.peers.lock().await.upsert(src.ip(), platform, name);
        match update {
            PeerUpdate::Discovered(peer) => {
                tracing::info!("device discovered: {}", peer);
                self.emit(SyncEvent::DeviceDiscovered {
                    platform: peer.platform,
                    name: peer.name,
                    addr: peer.addr,
                })
                .await;
            }
            PeerUpdate::Refreshed(peer) => {
                tracing::debug!("device metadata refreshed: {}", peer);
            }
        }
        Ok(())
    }

    async fn handle_payload(&self, src: SocketAddr, text: String) -> Result<()> {
        {
            let mut snapshot = self.snapshot.lock().await;
            if *snapshot == text {
                // Already known content: no write, no ack
                return Ok(());
            }
            *snapshot = text.clone();
        }

        // Best-effort apply; the snapshot is already updated so a failed
        // write cannot cause this payload to be re-processed
        if let Err(e) = self.clipboard.lock().await.write(&text) {
            tracing::warn!("clipboard write failed: {}", e);
        }

        let ack = codec::encode(&WireMessage::Ack {
            status: ACK_RECEIVED.to_string(),
        })?;
        self.transport.send_to(&ack, src).await?;

        tracing::info!("received clipboard content from {}", src);
        self.emit(SyncEvent::ClipboardReceived {
            from: src,
            preview: preview(&text),
        })
        .await;
        Ok(())
    }

    async fn handle_ack(&self, src: SocketAddr, status: String) -> Result<()> {
        // Informational only; acks never drive retransmission
        tracing::debug!("ack from {}: {}", src, status);
        self.emit(SyncEvent::AckReceived { from: src, status }).await;
        Ok(())
    }

    async fn poll_loop(engine: Arc<Self>) {
        while engine.is_running() {
            tokio::select! {
                _ = tokio::time::sleep(CLIPBOARD_POLL_INTERVAL) => {}
                _ = engine.stopped.notified() => break,
            }

            if let Err(e) = engine.poll_clipboard_once().await {
                // Read failure means no change this cycle
                tracing::debug!("clipboard poll: {}", e);
            }
        }

        tracing::debug!("clipboard poll loop stopped");
    }

    /// One poll cycle: read local text and broadcast it if it changed.
    pub(crate) async fn poll_clipboard_once(&self) -> Result<()> {
        let text = match self.clipboard.lock().await.read()? {
            Some(text) => text,
            // Empty clipboard never broadcasts
            None => return Ok(()),
        };

        {
            let mut snapshot = self.snapshot.lock().await;
            if *snapshot == text {
                return Ok(());
            }
            // Updated before sending, so a second poll cannot see the same
            // change while the broadcast is still in flight
            *snapshot = text.clone();
        }

        let frame = codec::encode(&WireMessage::ClipboardPayload { text: text.clone() })?;
        self.transport.broadcast(&frame).await?;

        tracing::info!("broadcast clipboard change ({} bytes)", text.len());
        self.emit(SyncEvent::ClipboardSent {
            preview: preview(&text),
        })
        .await;
        Ok(())
    }

    async fn heartbeat_loop(engine: Arc<Self>) {
        while engine.is_running() {
            if let Err(e) = engine.heartbeat_once().await {
                tracing::warn!("heartbeat cycle: {}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {}
                _ = engine.stopped.notified() => break,
            }
        }

        tracing::debug!("heartbeat loop stopped");
    }

    /// One heartbeat cycle: announce liveness, then prune silent peers.
    pub(crate) async fn heartbeat_once(&self) -> Result<()> {
        let frame = codec::encode(&WireMessage::Heartbeat)?;
        self.transport.broadcast(&frame).await?;

        let evicted = self
            .peers
            .lock()
            .await
            .evict_stale(Instant::now(), STALE_TIMEOUT);
        for peer in evicted {
            tracing::info!("device disconnected: {}", peer);
            self.emit(SyncEvent::DeviceLost {
                name: peer.name,
                addr: peer.addr,
            })
            .await;
        }
        Ok(())
    }

    async fn emit(&self, event: SyncEvent) {
        // A dropped receiver must not stop the daemon loops
        let _ = self.events.send(event).await;
    }
}

/// Truncate clipboard text for display.
fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_LEN {
        let cut: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::net::UdpSocket;

    /// In-memory clipboard recording every write
    #[derive(Clone, Default)]
    struct MockClipboard {
        content: Arc<StdMutex<Option<String>>>,
        writes: Arc<StdMutex<Vec<String>>>,
    }

    impl MockClipboard {
        fn set(&self, text: &str) {
            *self.content.lock().unwrap() = Some(text.to_string());
        }

        fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    impl ClipboardAccess for MockClipboard {
        fn read(&mut self) -> Result<Option<String>> {
            Ok(self.content.lock().unwrap().clone())
        }

        fn write(&mut self, text: &str) -> Result<()> {
            self.writes.lock().unwrap().push(text.to_string());
            *self.content.lock().unwrap() = Some(text.to_string());
            Ok(())
        }
    }

    async fn test_engine(
        broadcast: SocketAddr,
    ) -> (Arc<SyncEngine>, mpsc::Receiver<SyncEvent>, MockClipboard) {
        let transport = UdpTransport::bind_addr("127.0.0.1:0".parse().unwrap(), broadcast)
            .await
            .unwrap();
        let clipboard = MockClipboard::default();
        let (tx, rx) = mpsc::channel(64);
        let engine = SyncEngine::new(
            transport,
            LocalIdentity {
                platform: "Linux".to_string(),
                name: "hostB".to_string(),
            },
            Box::new(clipboard.clone()),
            tx,
        );
        (engine, rx, clipboard)
    }

    async fn observer() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    async fn recv_frame(socket: &UdpSocket) -> Option<String> {
        let mut buf = [0u8; 4096];
        match tokio::time::timeout(Duration::from_millis(300), socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _))) => Some(String::from_utf8_lossy(&buf[..len]).into_owned()),
            _ => None,
        }
    }

    fn dummy_addr() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    #[tokio::test]
    async fn test_discover_gets_unicast_announce() {
        let (engine, _rx, _clip) = test_engine(dummy_addr()).await;
        let peer = observer().await;

        engine
            .handle_frame("NEXUSCLIP_DISCOVER", peer.local_addr().unwrap())
            .await
            .unwrap();

        let reply = recv_frame(&peer).await.expect("announce expected");
        assert_eq!(reply, "NEXUSCLIP_DEVICE:Linux|hostB");
    }

    #[tokio::test]
    async fn test_announce_populates_peer_table_once() {
        let (engine, mut rx, _clip) = test_engine(dummy_addr()).await;
        let src: SocketAddr = "192.168.1.20:4040".parse().unwrap();

        engine
            .handle_frame("NEXUSCLIP_DEVICE:Linux|hostB", src)
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            SyncEvent::DeviceDiscovered {
                platform,
                name,
                addr,
            } => {
                assert_eq!(platform, "Linux");
                assert_eq!(name, "hostB");
                assert_eq!(addr, src.ip());
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(engine.peers.lock().await.len(), 1);

        // A re-announce refreshes metadata silently
        engine
            .handle_frame("NEXUSCLIP_DEVICE:Linux|hostB", src)
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.peers.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_payload_applied_once_and_acked_once() {
        let (engine, mut rx, clip) = test_engine(dummy_addr()).await;
        let sender = observer().await;
        let src = sender.local_addr().unwrap();

        let frame = "NEXUSCLIP_CLIP:aGVsbG8="; // "hello"
        engine.handle_frame(frame, src).await.unwrap();
        engine.handle_frame(frame, src).await.unwrap();

        assert_eq!(clip.write_count(), 1);
        assert_eq!(
            clip.content.lock().unwrap().as_deref(),
            Some("hello")
        );

        assert_eq!(
            recv_frame(&sender).await.as_deref(),
            Some("NEXUSCLIP_ACK:RECEIVED")
        );
        assert!(recv_frame(&sender).await.is_none(), "duplicate ack");

        assert!(matches!(
            rx.try_recv().unwrap(),
            SyncEvent::ClipboardReceived { .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped_silently() {
        let (engine, mut rx, clip) = test_engine(dummy_addr()).await;
        let sender = observer().await;

        engine
            .handle_frame("NEXUSCLIP_CLIP:!!not base64!!", sender.local_addr().unwrap())
            .await
            .unwrap();

        assert_eq!(clip.write_count(), 0);
        assert!(recv_frame(&sender).await.is_none(), "no ack expected");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_heartbeat_from_unknown_peer_creates_no_entry() {
        let (engine, _rx, _clip) = test_engine(dummy_addr()).await;

        engine
            .handle_frame("NEXUSCLIP_HEARTBEAT", "192.168.1.77:4040".parse().unwrap())
            .await
            .unwrap();

        assert!(engine.peers.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_local_change_broadcast_exactly_once() {
        let network = observer().await;
        let (engine, mut rx, clip) = test_engine(network.local_addr().unwrap()).await;

        clip.set("hello");
        engine.poll_clipboard_once().await.unwrap();
        engine.poll_clipboard_once().await.unwrap();

        assert_eq!(
            recv_frame(&network).await.as_deref(),
            Some("NEXUSCLIP_CLIP:aGVsbG8=")
        );
        assert!(recv_frame(&network).await.is_none(), "duplicate broadcast");

        assert!(matches!(
            rx.try_recv().unwrap(),
            SyncEvent::ClipboardSent { .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_applied_content_is_not_rebroadcast() {
        let network = observer().await;
        let (engine, _rx, clip) = test_engine(network.local_addr().unwrap()).await;

        // Remote payload lands in the local clipboard...
        engine
            .handle_frame("NEXUSCLIP_CLIP:aGVsbG8=", "192.168.1.20:4040".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(clip.content.lock().unwrap().as_deref(), Some("hello"));

        // ...and the next poll must not echo it back to the network
        engine.poll_clipboard_once().await.unwrap();
        assert!(recv_frame(&network).await.is_none(), "echo broadcast");
    }

    #[tokio::test]
    async fn test_ack_is_informational() {
        let (engine, mut rx, _clip) = test_engine(dummy_addr()).await;
        let src: SocketAddr = "192.168.1.20:4040".parse().unwrap();

        engine
            .handle_frame("NEXUSCLIP_ACK:RECEIVED", src)
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            SyncEvent::AckReceived { from, status } => {
                assert_eq!(from, src);
                assert_eq!(status, "RECEIVED");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_heartbeat_cycle_broadcasts_and_keeps_fresh_peers() {
        let network = observer().await;
        let (engine, mut rx, _clip) = test_engine(network.local_addr().unwrap()).await;

        engine
            .handle_frame(
                "NEXUSCLIP_DEVICE:Linux|hostB",
                "192.168.1.20:4040".parse().unwrap(),
            )
            .await
            .unwrap();
        let _ = rx.try_recv();

        engine.heartbeat_once().await.unwrap();

        assert_eq!(
            recv_frame(&network).await.as_deref(),
            Some("NEXUSCLIP_HEARTBEAT")
        );
        // Freshly announced peer survives the eviction pass
        assert_eq!(engine.peers.lock().await.len(), 1);
        assert!(rx.try_recv().is_err(), "no DeviceLost expected");
    }

    #[tokio::test]
    async fn test_empty_clipboard_never_broadcasts() {
        let network = observer().await;
        let (engine, _rx, _clip) = test_engine(network.local_addr().unwrap()).await;

        engine.poll_clipboard_once().await.unwrap();
        assert!(recv_frame(&network).await.is_none());
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let short = preview("hello");
        assert_eq!(short, "hello");

        let long = preview(&"é".repeat(80));
        assert_eq!(long.chars().count(), PREVIEW_LEN + 3);
        assert!(long.ends_with("..."));
    }
}
