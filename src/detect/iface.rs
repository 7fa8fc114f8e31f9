//! Interface address enumeration.

use crate::error::Result;
use std::net::Ipv4Addr;

/// One IPv4 address observed on a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IfaceIpv4 {
    pub name: String,
    pub addr: Ipv4Addr,
    pub up: bool,
    pub loopback: bool,
}

/// Every IPv4 address currently assigned to a local interface, in kernel
/// order.
pub(crate) fn enumerate() -> Result<Vec<IfaceIpv4>> {
    os::enumerate()
}

#[cfg(unix)]
mod os {
    use super::IfaceIpv4;
    use crate::error::{DdnsError, Result};
    use std::ffi::CStr;
    use std::mem::MaybeUninit;
    use std::net::Ipv4Addr;

    pub(super) fn enumerate() -> Result<Vec<IfaceIpv4>> {
        let mut out = Vec::new();

        // SAFETY: if getifaddrs() succeeds the list head is initialized and
        // stays valid until the freeifaddrs() below.
        let ifaddrs = unsafe {
            let mut ifaddrs = MaybeUninit::<*mut libc::ifaddrs>::uninit();
            if libc::getifaddrs(ifaddrs.as_mut_ptr()) < 0 {
                return Err(DdnsError::Io(std::io::Error::last_os_error()));
            }
            ifaddrs.assume_init()
        };

        let mut current = ifaddrs as *const libc::ifaddrs;
        while !current.is_null() {
            // SAFETY: nullness is checked above.
            let entry = unsafe { &*current };
            current = entry.ifa_next as *const _;

            if entry.ifa_addr.is_null() {
                continue;
            }
            // SAFETY: ifa_addr nullness is checked above.
            let family = unsafe { (*entry.ifa_addr).sa_family };
            if family != libc::AF_INET as libc::sa_family_t {
                continue;
            }
            // SAFETY: AF_INET entries always carry a sockaddr_in.
            let sin = unsafe { *(entry.ifa_addr as *const libc::sockaddr_in) };
            // SAFETY: the OS hands us a null-terminated interface name.
            let name = unsafe { CStr::from_ptr(entry.ifa_name) }
                .to_string_lossy()
                .into_owned();

            out.push(IfaceIpv4 {
                name,
                addr: Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)),
                up: entry.ifa_flags & libc::IFF_UP as u32 != 0,
                loopback: entry.ifa_flags & libc::IFF_LOOPBACK as u32 != 0,
            });
        }

        // SAFETY: the list came from getifaddrs and has not been freed yet.
        unsafe { libc::freeifaddrs(ifaddrs) };

        Ok(out)
    }
}

#[cfg(not(unix))]
mod os {
    use super::IfaceIpv4;
    use crate::error::{DdnsError, Result};

    pub(super) fn enumerate() -> Result<Vec<IfaceIpv4>> {
        Err(DdnsError::Detection(
            "interface enumeration is not supported on this platform".to_string(),
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_returns_loopback() {
        // Every unix host has a loopback interface with 127.0.0.1.
        let entries = enumerate().unwrap();
        assert!(entries
            .iter()
            .any(|e| e.loopback && e.addr == Ipv4Addr::new(127, 0, 0, 1)));
    }
}
