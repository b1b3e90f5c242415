//! Envio UDP em broadcast.
//!
//! Sem confirmação: o mesmo buffer sai [`REPEAT_COUNT`] vezes e a
//! redundância é o único mecanismo de confiabilidade.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use tracing::debug;

/// Porta em que os termostatos escutam.
pub const BROADCAST_PORT: u16 = 5001;

/// Quantas vezes cada pacote é transmitido.
pub const REPEAT_COUNT: usize = 5;

/// Destino de pacotes prontos.
pub trait Broadcaster {
    fn broadcast(&self, packet: &[u8]) -> io::Result<()>;
}

/// Broadcast real para `255.255.255.255:5001`.
#[derive(Debug, Clone)]
pub struct UdpBroadcaster {
    bind_ip: Ipv4Addr,
    destination: SocketAddr,
}

impl UdpBroadcaster {
    /// `bind_ip` escolhe a interface de saída (`0.0.0.0` = qualquer).
    pub fn new(bind_ip: Ipv4Addr) -> Self {
        Self {
            bind_ip,
            destination: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, BROADCAST_PORT)),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_destination(bind_ip: Ipv4Addr, destination: SocketAddr) -> Self {
        Self {
            bind_ip,
            destination,
        }
    }
}

impl Default for UdpBroadcaster {
    fn default() -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED)
    }
}

impl Broadcaster for UdpBroadcaster {
    fn broadcast(&self, packet: &[u8]) -> io::Result<()> {
        let socket = UdpSocket::bind(SocketAddrV4::new(self.bind_ip, 0))?;
        socket.set_broadcast(true)?;

        for _ in 0..REPEAT_COUNT {
            socket.send_to(packet, self.destination)?;
        }
        debug!(
            "{} bytes enviados {REPEAT_COUNT}x para {}",
            packet.len(),
            self.destination
        );
        Ok(())
    }
}
