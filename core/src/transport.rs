//! UDP transport
//!
//! A single socket carries all traffic: unicast replies and network-wide
//! broadcasts share one port, so a node is reachable on the same socket it
//! sends from.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::protocol::constants::RECV_TIMEOUT;
use crate::{Error, Result};

/// Broadcast-capable UDP socket bound to the shared sync port
pub struct UdpTransport {
    socket: UdpSocket,
    broadcast_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind the sync socket on all interfaces.
    ///
    /// This is the only fatal failure in the system: without a listening
    /// socket the node cannot participate in sync at all.
    pub async fn bind(port: u16) -> Result<Self> {
        let bind: SocketAddr = (Ipv4Addr::UNSPECIFIED, port).into();
        let broadcast: SocketAddr = (Ipv4Addr::BROADCAST, port).into();
        Self::bind_addr(bind, broadcast).await
    }

    /// Bind with explicit local and broadcast addresses.
    pub async fn bind_addr(bind: SocketAddr, broadcast_addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(bind)
            .await
            .map_err(|e| Error::Network(format!("failed to bind {bind}: {e}")))?;
        socket
            .set_broadcast(true)
            .map_err(|e| Error::Network(format!("failed to enable broadcast: {e}")))?;

        Ok(Self {
            socket,
            broadcast_addr,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Error::Io)
    }

    /// Send one frame to a specific peer.
    pub async fn send_to(&self, frame: &str, addr: SocketAddr) -> Result<()> {
        self.socket
            .send_to(frame.as_bytes(), addr)
            .await
            .map_err(|e| Error::Network(format!("send to {addr} failed: {e}")))?;
        Ok(())
    }

    /// Send one frame to the broadcast address.
    pub async fn broadcast(&self, frame: &str) -> Result<()> {
        self.send_to(frame, self.broadcast_addr).await
    }

    /// Receive one frame, or `None` if nothing arrived within the receive
    /// timeout. The timeout keeps the receive loop responsive to shutdown.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<Option<(String, SocketAddr)>> {
        match timeout(RECV_TIMEOUT, self.socket.recv_from(buf)).await {
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(Error::Network(format!("recv failed: {e}"))),
            Ok(Ok((len, src))) => {
                let frame = String::from_utf8_lossy(&buf[..len]).into_owned();
                Ok(Some((frame, src)))
            }
        }
    }
}
