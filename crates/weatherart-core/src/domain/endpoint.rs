//! Device endpoint: where the display lives on the local network.
//!
//! An endpoint may be incomplete.  The usual configuration only knows the
//! TV's MAC address (which never changes) and leaves the IP address to be
//! looked up in the host's ARP table at run time, because DHCP leases move.
//!
//! # MAC address formats (for beginners)
//!
//! MAC addresses are written in many ways depending on the tool that printed
//! them:
//!
//! ```text
//! AA:BB:CC:DD:EE:FF     Linux, macOS
//! aa-bb-cc-dd-ee-ff     Windows
//! aabb.ccdd.eeff        Cisco
//! a:b:c:d:e:f           macOS `arp -a` drops leading zeros
//! aabbccddeeff          bare hex
//! ```
//!
//! [`MacAddress::from_str`] accepts all of these so that a value copied out of
//! any router page or `arp` output just works.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length of a Wake-on-LAN magic packet: 6 sync bytes plus 16 MAC repetitions.
pub const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

/// Default TCP port of the display's secure art channel.
pub const DEFAULT_CONTROL_PORT: u16 = 8002;

/// Default UDP port for Wake-on-LAN (the "discard" port).
pub const DEFAULT_WAKE_PORT: u16 = 9;

/// Error returned when a string is not a recognisable MAC address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid MAC address: {0:?}")]
pub struct MacParseError(pub String);

/// A 48-bit IEEE 802 hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Creates a MAC address from its six octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Returns the six octets.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Builds the standard Wake-on-LAN magic packet for this address.
    ///
    /// ```rust
    /// use weatherart_core::MacAddress;
    ///
    /// let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
    /// let packet = mac.magic_packet();
    /// assert_eq!(&packet[..6], &[0xFF; 6]);
    /// assert_eq!(&packet[6..12], &mac.octets());
    /// ```
    pub fn magic_packet(&self) -> [u8; MAGIC_PACKET_LEN] {
        let mut packet = [0xFF; MAGIC_PACKET_LEN];
        for chunk in packet[6..].chunks_exact_mut(6) {
            chunk.copy_from_slice(&self.0);
        }
        packet
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MacParseError(s.to_string());

        let parts: Vec<&str> = s
            .split(|c: char| !c.is_ascii_hexdigit())
            .filter(|part| !part.is_empty())
            .collect();

        let hex = match parts.as_slice() {
            [single] => match single.len() {
                12 => single.to_string(),
                // Some tools drop the leading zero of the first octet.
                11 => format!("0{single}"),
                _ => return Err(invalid()),
            },
            groups if groups.len() == 6 => {
                if groups.iter().any(|g| g.len() > 2) {
                    return Err(invalid());
                }
                groups.iter().map(|g| format!("{g:0>2}")).collect()
            }
            // Cisco dotted form: three groups of four digits.
            groups if groups.len() == 3 && groups.iter().all(|g| g.len() == 4) => {
                groups.concat()
            }
            _ => return Err(invalid()),
        };

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Everything needed to reach and wake the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    /// Configured IP address.  When `None`, the address is resolved from `mac`.
    pub address: Option<IpAddr>,
    /// Hardware address, used for ARP lookup and Wake-on-LAN.
    pub mac: Option<MacAddress>,
    /// TCP port of the art channel.
    pub control_port: u16,
    /// UDP port the magic packet is sent to.
    pub wake_port: u16,
    /// Broadcast address the magic packet is sent to.
    pub wake_broadcast: IpAddr,
}

impl Default for DeviceEndpoint {
    fn default() -> Self {
        Self {
            address: None,
            mac: None,
            control_port: DEFAULT_CONTROL_PORT,
            wake_port: DEFAULT_WAKE_PORT,
            wake_broadcast: IpAddr::V4(Ipv4Addr::BROADCAST),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: [u8; 6] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];

    #[test]
    fn test_parse_colon_separated_mac() {
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(mac.octets(), EXPECTED);
    }

    #[test]
    fn test_parse_dash_separated_lowercase_mac() {
        let mac: MacAddress = "aa-bb-cc-dd-ee-ff".parse().unwrap();
        assert_eq!(mac.octets(), EXPECTED);
    }

    #[test]
    fn test_parse_bare_hex_mac() {
        let mac: MacAddress = "aabbccddeeff".parse().unwrap();
        assert_eq!(mac.octets(), EXPECTED);
    }

    #[test]
    fn test_parse_cisco_dotted_mac() {
        let mac: MacAddress = "aabb.ccdd.eeff".parse().unwrap();
        assert_eq!(mac.octets(), EXPECTED);
    }

    #[test]
    fn test_parse_single_digit_octets_are_zero_padded() {
        // Arrange – the form printed by macOS `arp -a`
        let input = "a:b:c:d:e:f";

        // Act
        let mac: MacAddress = input.parse().unwrap();

        // Assert
        assert_eq!(mac.octets(), [0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F]);
    }

    #[test]
    fn test_parse_eleven_hex_digits_pads_leading_zero() {
        let mac: MacAddress = "abbccddeeff".parse().unwrap();
        assert_eq!(mac.octets(), [0x0A, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn test_parse_rejects_wrong_group_count() {
        assert!("AA:BB:CC:DD:EE".parse::<MacAddress>().is_err());
        assert!("AA:BB:CC:DD:EE:FF:00".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_parse_rejects_oversized_group_and_empty_input() {
        assert!("AAA:BB:CC:DD:EE:FF".parse::<MacAddress>().is_err());
        assert!("".parse::<MacAddress>().is_err());
        assert!("not a mac".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_display_is_uppercase_colon_form() {
        let mac = MacAddress::new([0x0a, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f]);
        assert_eq!(mac.to_string(), "0A:1B:2C:3D:4E:5F");
    }

    #[test]
    fn test_magic_packet_layout() {
        // Arrange
        let mac = MacAddress::new(EXPECTED);

        // Act
        let packet = mac.magic_packet();

        // Assert – 6 sync bytes then 16 copies of the address
        assert_eq!(packet.len(), 102);
        assert!(packet[..6].iter().all(|&b| b == 0xFF));
        for repetition in packet[6..].chunks(6) {
            assert_eq!(repetition, EXPECTED);
        }
    }

    #[test]
    fn test_mac_serde_uses_string_form() {
        let mac = MacAddress::new(EXPECTED);
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"AA:BB:CC:DD:EE:FF\"");
        let back: MacAddress = serde_json::from_str("\"aa-bb-cc-dd-ee-ff\"").unwrap();
        assert_eq!(back, mac);
    }

    #[test]
    fn test_endpoint_default_ports() {
        let endpoint = DeviceEndpoint::default();
        assert_eq!(endpoint.control_port, 8002);
        assert_eq!(endpoint.wake_port, 9);
        assert_eq!(endpoint.wake_broadcast.to_string(), "255.255.255.255");
        assert!(endpoint.address.is_none());
    }
}
