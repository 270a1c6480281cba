//! Wake-on-LAN magic packet sender.
//!
//! # How Wake-on-LAN works (for beginners)
//!
//! A sleeping TV keeps its network card powered and watches for a "magic
//! packet": six `0xFF` bytes followed by its own MAC address repeated 16
//! times (102 bytes).  The packet is sent as a single UDP datagram to the
//! LAN broadcast address, so it reaches the TV even though the TV has no
//! IP conversation going.  Port 9 ("discard") is the convention.
//!
//! Delivery is never confirmed.  The caller waits a fixed grace interval
//! and then simply tries to connect.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use weatherart_core::MacAddress;

/// Sends one magic packet for `mac` to `target` with `SO_BROADCAST` set.
///
/// # Errors
///
/// Returns the socket error if the packet could not be handed to the OS.
pub fn send_magic_packet(mac: MacAddress, target: SocketAddr) -> io::Result<()> {
    let bind_ip = match target.ip() {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    let socket = UdpSocket::bind(SocketAddr::new(bind_ip, 0))?;
    socket.set_broadcast(true)?;

    let packet = mac.magic_packet();
    let sent = socket.send_to(&packet, target)?;
    if sent != packet.len() {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("sent {sent} of {} bytes", packet.len()),
        ));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
