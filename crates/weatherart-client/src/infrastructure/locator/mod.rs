//! Device locator: address resolution and Wake-on-LAN.
//!
//! Resolution order:
//!
//! 1. A configured IP address always wins.  Nothing is looked up.
//! 2. Otherwise the configured MAC is looked up in the host neighbour table.
//! 3. Otherwise the display is unresolvable.  There is no fallback address
//!    and no discovery broadcast.

pub mod arp;
pub mod wake;

use std::net::SocketAddr;

use tracing::{info, warn};
use weatherart_core::DeviceEndpoint;

use crate::application::device_session::{DeviceLocator, LocatorError, WakeOutcome};
use arp::{lookup, NeighborTable, SystemNeighborTable};

/// [`DeviceLocator`] backed by a neighbour table and a UDP socket.
pub struct NetworkLocator {
    table: Box<dyn NeighborTable>,
}

impl NetworkLocator {
    pub fn new(table: Box<dyn NeighborTable>) -> Self {
        Self { table }
    }

    /// Locator reading the neighbour table of this machine.
    pub fn system() -> Self {
        Self::new(Box::new(SystemNeighborTable))
    }
}

impl DeviceLocator for NetworkLocator {
    fn resolve(&self, endpoint: &DeviceEndpoint) -> Result<SocketAddr, LocatorError> {
        if let Some(ip) = endpoint.address {
            return Ok(SocketAddr::new(ip, endpoint.control_port));
        }

        let Some(mac) = endpoint.mac else {
            return Err(LocatorError::Unresolvable {
                reason: "neither an IP address nor a MAC address is configured".to_string(),
            });
        };

        let entries = self.table.entries().unwrap_or_else(|e| {
            warn!("could not read the neighbour table: {e}");
            Vec::new()
        });

        match lookup(&entries, mac) {
            Some(ip) => {
                info!(%mac, %ip, "resolved display address from MAC");
                Ok(SocketAddr::new(ip, endpoint.control_port))
            }
            None => Err(LocatorError::Unresolvable {
                reason: format!("MAC {mac} is not in the neighbour table"),
            }),
        }
    }

    fn wake(&self, endpoint: &DeviceEndpoint) -> WakeOutcome {
        let Some(mac) = endpoint.mac else {
            return WakeOutcome::Skipped {
                reason: "wake requested but no MAC address is configured".to_string(),
            };
        };
        let target = SocketAddr::new(endpoint.wake_broadcast, endpoint.wake_port);
        match wake::send_magic_packet(mac, target) {
            Ok(()) => {
                info!(%mac, %target, "sent Wake-on-LAN packet");
                WakeOutcome::Sent { target }
            }
            Err(e) => {
                warn!(%mac, %target, "failed to send Wake-on-LAN packet: {e}");
                WakeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arp::NeighborEntry;
    use std::io;
    use std::net::UdpSocket;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StaticTable {
        entries: Option<Vec<NeighborEntry>>,
        reads: Arc<AtomicUsize>,
    }

    impl NeighborTable for StaticTable {
        fn entries(&self) -> io::Result<Vec<NeighborEntry>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.entries
                .clone()
                .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    fn locator(entries: Option<Vec<NeighborEntry>>) -> (NetworkLocator, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let table = StaticTable {
            entries,
            reads: Arc::clone(&reads),
        };
        (NetworkLocator::new(Box::new(table)), reads)
    }

    fn endpoint() -> DeviceEndpoint {
        DeviceEndpoint {
            mac: Some("a4:30:7a:12:34:56".parse().unwrap()),
            ..DeviceEndpoint::default()
        }
    }

    #[test]
    fn test_configured_address_wins_without_lookup() {
        // Arrange
        let (locator, reads) = locator(Some(vec![]));
        let endpoint = DeviceEndpoint {
            address: Some("10.0.0.7".parse().unwrap()),
            ..endpoint()
        };

        // Act
        let addr = locator.resolve(&endpoint).unwrap();

        // Assert
        assert_eq!(addr.to_string(), "10.0.0.7:8002");
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_mac_is_resolved_through_table() {
        let entry = NeighborEntry {
            ip: "192.168.1.20".parse().unwrap(),
            mac: "A4-30-7A-12-34-56".parse().unwrap(),
        };
        let (locator, _) = locator(Some(vec![entry]));

        let addr = locator.resolve(&endpoint()).unwrap();

        assert_eq!(addr.to_string(), "192.168.1.20:8002");
    }

    #[test]
    fn test_missing_entry_is_unresolvable() {
        let (locator, _) = locator(Some(vec![]));
        assert!(matches!(
            locator.resolve(&endpoint()),
            Err(LocatorError::Unresolvable { .. })
        ));
    }

    #[test]
    fn test_unreadable_table_is_unresolvable() {
        let (locator, reads) = locator(None);
        assert!(locator.resolve(&endpoint()).is_err());
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_nothing_configured_is_unresolvable() {
        let (locator, reads) = locator(Some(vec![]));
        assert!(locator.resolve(&DeviceEndpoint::default()).is_err());
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_wake_without_mac_is_skipped() {
        let (locator, _) = locator(Some(vec![]));
        assert!(matches!(
            locator.wake(&DeviceEndpoint::default()),
            WakeOutcome::Skipped { .. }
        ));
    }

    #[test]
    fn test_wake_sends_to_configured_target() {
        // Arrange
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = receiver.local_addr().unwrap();
        let (locator, _) = locator(Some(vec![]));
        let endpoint = DeviceEndpoint {
            wake_broadcast: target.ip(),
            wake_port: target.port(),
            ..endpoint()
        };

        // Act
        let outcome = locator.wake(&endpoint);

        // Assert
        assert_eq!(outcome, WakeOutcome::Sent { target });
    }
}
