//! High-level service that wires the engine to its collaborators

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::clipboard::ClipboardAccess;
use crate::discovery::Advertiser;
use crate::engine::{LocalIdentity, SyncEngine, SyncEvent};
use crate::protocol::constants::SYNC_PORT;
use crate::transport::UdpTransport;
use crate::Result;

/// Configuration for the NexusClip service
#[derive(Debug, Clone)]
pub struct Config {
    /// UDP port shared by unicast and broadcast traffic
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self { port: SYNC_PORT }
    }
}

/// Main NexusClip service
pub struct NexusClipService {
    config: Config,
    identity: LocalIdentity,
    engine: Option<Arc<SyncEngine>>,
    advertiser: Option<Advertiser>,
    tasks: Vec<JoinHandle<()>>,
}

impl NexusClipService {
    /// Create a new service with the default configuration.
    pub fn new(device_name: String) -> Self {
        Self::with_config(device_name, Config::default())
    }

    /// Create with custom config.
    pub fn with_config(device_name: String, config: Config) -> Self {
        let identity = LocalIdentity {
            platform: local_platform().to_string(),
            name: device_name,
        };
        Self {
            config,
            identity,
            engine: None,
            advertiser: None,
            tasks: Vec::new(),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.identity.name
    }

    pub fn platform(&self) -> &str {
        &self.identity.platform
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Start the daemon loops and return the event channel.
    ///
    /// Fails only when the sync socket cannot be bound; mDNS advertisement
    /// is best-effort and broadcast discovery remains the fallback.
    pub async fn start(
        &mut self,
        clipboard: Box<dyn ClipboardAccess>,
    ) -> Result<mpsc::Receiver<SyncEvent>> {
        let transport = UdpTransport::bind(self.config.port).await?;
        tracing::info!("listening on {}", transport.local_addr()?);

        let (tx, rx) = mpsc::channel(64);
        let engine = SyncEngine::new(transport, self.identity.clone(), clipboard, tx);
        self.tasks = engine.spawn_loops();
        self.engine = Some(engine);

        match Advertiser::register(&self.identity.name, &self.identity.platform, self.config.port)
        {
            Ok(advertiser) => self.advertiser = Some(advertiser),
            Err(e) => {
                tracing::warn!("mDNS registration failed, broadcast discovery only: {}", e)
            }
        }

        Ok(rx)
    }

    /// Signal all loops to stop and wait for them to drain.
    pub async fn stop(&mut self) {
        if let Some(engine) = &self.engine {
            engine.shutdown();
        }
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        if let Some(advertiser) = self.advertiser.take() {
            advertiser.shutdown();
        }
        tracing::info!("service stopped");
    }
}

/// Platform label advertised in device announcements.
pub fn local_platform() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        other => other,
    }
}
