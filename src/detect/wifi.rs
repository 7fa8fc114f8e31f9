//! Wifi SSID constraint.
//!
//! Lets a roaming machine (a laptop that moves between networks) update DNS
//! only while associated with one specific trusted network. On platforms
//! without wireless introspection this always reports "unavailable", which
//! the reconciliation loop treats as a benign skip.

use crate::error::Result;

/// Find a wireless interface currently associated with `target`.
///
/// Returns the interface name and the matched SSID. The match is exact and
/// case-sensitive.
pub(crate) fn current_ssid(target: &str) -> Result<(String, String)> {
    os::current_ssid(target)
}

#[cfg(target_os = "linux")]
mod os {
    use crate::error::{DdnsError, Result};

    const SIOCGIWESSID: u64 = 0x8B1B;
    const IW_ESSID_MAX_SIZE: usize = 32;

    #[repr(C)]
    struct IwPoint {
        pointer: *mut libc::c_void,
        length: u16,
        flags: u16,
    }

    // struct iwreq collapsed to the one union member we read. The request
    // union is 16 bytes; IwPoint pads out to the same size.
    #[repr(C)]
    struct IwreqEssid {
        ifr_name: [u8; libc::IFNAMSIZ],
        data: IwPoint,
    }

    pub(super) fn current_ssid(target: &str) -> Result<(String, String)> {
        let interfaces = wireless_interfaces()?;
        if interfaces.is_empty() {
            return Err(DdnsError::WifiUnavailable(
                "no wireless interfaces found".to_string(),
            ));
        }

        let mut found = Vec::new();
        for name in &interfaces {
            let Some(ssid) = essid(name) else { continue };
            if ssid.is_empty() {
                continue;
            }
            if ssid == target {
                return Ok((name.clone(), ssid));
            }
            found.push(format!("{name}={ssid:?}"));
        }

        if found.is_empty() {
            return Err(DdnsError::WifiUnavailable(
                "no associated wifi interface found".to_string(),
            ));
        }
        Err(DdnsError::WifiNotMatched {
            want: target.to_string(),
            found: found.join(", "),
        })
    }

    fn wireless_interfaces() -> Result<Vec<String>> {
        let content = std::fs::read_to_string("/proc/net/wireless")
            .map_err(|e| DdnsError::WifiUnavailable(format!("/proc/net/wireless: {e}")))?;
        Ok(parse_wireless(&content))
    }

    // The first two lines are headers; each remaining line starts with the
    // interface name followed by a colon.
    fn parse_wireless(content: &str) -> Vec<String> {
        content
            .lines()
            .skip(2)
            .filter_map(|line| {
                let name = line.split(':').next()?.trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect()
    }

    /// Currently associated ESSID of a wireless interface, via the
    /// wireless-extensions ioctl. `None` when not associated or on any error.
    fn essid(ifname: &str) -> Option<String> {
        if ifname.len() >= libc::IFNAMSIZ {
            return None;
        }

        // SAFETY: a plain datagram socket is enough to issue wireless ioctls.
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
        if fd < 0 {
            return None;
        }

        let mut buf = [0u8; IW_ESSID_MAX_SIZE + 1];
        let mut req = IwreqEssid {
            ifr_name: [0; libc::IFNAMSIZ],
            data: IwPoint {
                pointer: buf.as_mut_ptr() as *mut libc::c_void,
                length: buf.len() as u16,
                flags: 0,
            },
        };
        req.ifr_name[..ifname.len()].copy_from_slice(ifname.as_bytes());

        // SAFETY: req and buf outlive the call; the kernel writes at most
        // `length` bytes into the buffer.
        let rc = unsafe { libc::ioctl(fd, SIOCGIWESSID as _, &mut req as *mut IwreqEssid) };
        // SAFETY: fd is owned by this function.
        unsafe { libc::close(fd) };
        if rc != 0 {
            return None;
        }

        let len = (req.data.length as usize).min(IW_ESSID_MAX_SIZE);
        let ssid = String::from_utf8_lossy(&buf[..len])
            .trim_end_matches('\0')
            .trim()
            .to_string();
        Some(ssid)
    }

    #[cfg(test)]
    mod tests {
        use super::parse_wireless;

        #[test]
        fn test_parse_wireless_interfaces() {
            let content = "\
Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE
 face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22
 wlan0: 0000   70.  -40.  -256        0      0      0      0      0        0
 wlp3s0: 0000   54.  -56.  -256        0      0      0      0      0        0
";
            assert_eq!(parse_wireless(content), vec!["wlan0", "wlp3s0"]);
        }

        #[test]
        fn test_parse_wireless_no_interfaces() {
            let content = "\
Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE
 face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22
";
            assert!(parse_wireless(content).is_empty());
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod os {
    use crate::error::{DdnsError, Result};

    pub(super) fn current_ssid(_target: &str) -> Result<(String, String)> {
        Err(DdnsError::WifiUnavailable(
            "the WIFI_SSID constraint requires linux".to_string(),
        ))
    }
}
