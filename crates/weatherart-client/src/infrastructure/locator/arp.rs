//! Host neighbour (ARP) table lookup.
//!
//! The display may be configured by MAC address only.  Its IP is then read
//! from the host's neighbour table, which already holds an entry as soon as
//! the host has talked to the display (or seen its traffic) recently.  No
//! probe is ever sent.
//!
//! Two sources are understood:
//!
//! ```text
//! /proc/net/arp (Linux)
//!   IP address       HW type     Flags       HW address            Mask     Device
//!   192.168.1.20     0x1         0x2         a4:30:7a:12:34:56     *        wlan0
//!
//! arp -a (macOS, BSD, Windows)
//!   ? (192.168.1.20) at a4:30:7a:12:34:56 on en0 ifscope [ethernet]
//!     192.168.1.20          a4-30-7a-12-34-56     dynamic
//! ```

use std::io;
use std::net::IpAddr;

use weatherart_core::MacAddress;

/// One IP-to-MAC mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborEntry {
    pub ip: IpAddr,
    pub mac: MacAddress,
}

/// A source of neighbour entries.
pub trait NeighborTable: Send + Sync {
    /// Reads the current table.
    fn entries(&self) -> io::Result<Vec<NeighborEntry>>;
}

/// Returns the IP of the first entry carrying `mac`.
pub fn lookup(entries: &[NeighborEntry], mac: MacAddress) -> Option<IpAddr> {
    entries.iter().find(|e| e.mac == mac).map(|e| e.ip)
}

const INCOMPLETE: MacAddress = MacAddress::new([0; 6]);

/// Parses the contents of `/proc/net/arp`.
///
/// The header line, malformed lines, and incomplete entries (all-zero MAC
/// or flags `0x0`) are skipped.
pub fn parse_proc_net_arp(content: &str) -> Vec<NeighborEntry> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 || fields[2] == "0x0" {
                return None;
            }
            let ip = fields[0].parse().ok()?;
            let mac: MacAddress = fields[3].parse().ok()?;
            (mac != INCOMPLETE).then_some(NeighborEntry { ip, mac })
        })
        .collect()
}

/// Parses the output of `arp -a` in either the BSD or the Windows layout.
pub fn parse_arp_a(output: &str) -> Vec<NeighborEntry> {
    output.lines().filter_map(parse_arp_a_line).collect()
}

fn parse_arp_a_line(line: &str) -> Option<NeighborEntry> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    // BSD: "<host> (<ip>) at <mac> ..."
    if let Some(pos) = tokens.iter().position(|t| t.starts_with('(') && t.ends_with(')')) {
        let ip = tokens[pos].trim_matches(|c| c == '(' || c == ')').parse().ok()?;
        if tokens.get(pos + 1) != Some(&"at") {
            return None;
        }
        let mac: MacAddress = tokens.get(pos + 2)?.parse().ok()?;
        return (mac != INCOMPLETE).then_some(NeighborEntry { ip, mac });
    }

    // Windows: "<ip> <mac> <type>"
    let ip = tokens.first()?.parse().ok()?;
    let mac: MacAddress = tokens.get(1)?.parse().ok()?;
    (mac != INCOMPLETE).then_some(NeighborEntry { ip, mac })
}

/// Reads the neighbour table of the machine we run on.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNeighborTable;

impl NeighborTable for SystemNeighborTable {
    #[cfg(target_os = "linux")]
    fn entries(&self) -> io::Result<Vec<NeighborEntry>> {
        Ok(parse_proc_net_arp(&std::fs::read_to_string("/proc/net/arp")?))
    }

    #[cfg(not(target_os = "linux"))]
    fn entries(&self) -> io::Result<Vec<NeighborEntry>> {
        let output = std::process::Command::new("arp").arg("-a").output()?;
        if !output.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("arp -a exited with {}", output.status),
            ));
        }
        Ok(parse_arp_a(&String::from_utf8_lossy(&output.stdout)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_NET_ARP: &str = "\
IP address       HW type     Flags       HW address            Mask     Device
192.168.1.1      0x1         0x2         10:20:30:40:50:60     *        wlan0
192.168.1.20     0x1         0x2         a4:30:7a:12:34:56     *        wlan0
192.168.1.33     0x1         0x0         00:00:00:00:00:00     *        wlan0
garbage line
";

    fn mac(s: &str) -> MacAddress {
        s.parse().unwrap()
    }

    #[test]
    fn test_proc_net_arp_skips_header_and_incomplete_entries() {
        // Act
        let entries = parse_proc_net_arp(PROC_NET_ARP);

        // Assert
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].ip.to_string(), "192.168.1.20");
        assert_eq!(entries[1].mac, mac("A4:30:7A:12:34:56"));
    }

    #[test]
    fn test_arp_a_bsd_layout() {
        let output = "\
? (192.168.1.1) at 10:20:30:40:50:60 on en0 ifscope [ethernet]
frame.lan (192.168.1.20) at a4:30:7a:12:34:56 on en0 ifscope [ethernet]
? (192.168.1.40) at (incomplete) on en0 ifscope [ethernet]
";
        let entries = parse_arp_a(output);

        assert_eq!(entries.len(), 2);
        assert_eq!(
            lookup(&entries, mac("a4-30-7a-12-34-56")).map(|ip| ip.to_string()),
            Some("192.168.1.20".to_string())
        );
    }

    #[test]
    fn test_arp_a_bsd_layout_with_short_octets() {
        // macOS drops leading zeros: 0a:0b:... prints as a:b:...
        let entries = parse_arp_a("? (10.0.0.9) at a:b:c:d:e:f on en0\n");
        assert_eq!(entries[0].mac, mac("0A:0B:0C:0D:0E:0F"));
    }

    #[test]
    fn test_arp_a_windows_layout() {
        let output = "\
Interface: 192.168.1.5 --- 0xb
  Internet Address      Physical Address      Type
  192.168.1.20          a4-30-7a-12-34-56     dynamic
  192.168.1.255         ff-ff-ff-ff-ff-ff     static
";
        let entries = parse_arp_a(output);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ip.to_string(), "192.168.1.20");
    }

    #[test]
    fn test_lookup_misses_unknown_mac() {
        let entries = parse_proc_net_arp(PROC_NET_ARP);
        assert_eq!(lookup(&entries, mac("de:ad:be:ef:00:01")), None);
    }
}
