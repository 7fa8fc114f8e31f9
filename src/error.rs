//! Error types for dnspod-ddns.

use thiserror::Error;

/// Result type alias for dnspod-ddns.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Configuration error. Fatal, raised before the loop starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No detection strategy produced a usable address. Retried next tick.
    #[error("IP detection failed: {0}")]
    Detection(String),

    /// Wifi introspection is unsupported here, or no interface is associated.
    #[error("Wifi SSID unavailable: {0}")]
    WifiUnavailable(String),

    /// A wifi network is associated, but not the one the operator requires.
    #[error("Wifi SSID not matched: want {want:?}, found {found}")]
    WifiNotMatched { want: String, found: String },

    /// The target record is missing, ambiguous, or malformed.
    #[error("Record resolution failed: {0}")]
    RecordResolution(String),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// DNSPod rejected the request.
    #[error("DNSPod API error code={code} message={message}")]
    Api { code: String, message: String },

    /// The governing cancellation signal fired.
    #[error("Cancelled")]
    Cancelled,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DdnsError {
    /// Wifi-constraint outcomes are a benign skip-this-cycle signal, never a
    /// cycle failure.
    pub fn is_wifi_skip(&self) -> bool {
        matches!(
            self,
            DdnsError::WifiUnavailable(_) | DdnsError::WifiNotMatched { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DdnsError::Cancelled)
    }
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wifi_errors_are_skips() {
        assert!(DdnsError::WifiUnavailable("no interfaces".into()).is_wifi_skip());
        assert!(DdnsError::WifiNotMatched {
            want: "OfficeNet".into(),
            found: "wlan0=\"HomeNet\"".into()
        }
        .is_wifi_skip());
        assert!(!DdnsError::Detection("nothing usable".into()).is_wifi_skip());
        assert!(!DdnsError::Cancelled.is_wifi_skip());
    }

    #[test]
    fn test_not_matched_names_both_networks() {
        let err = DdnsError::WifiNotMatched {
            want: "OfficeNet".into(),
            found: "wlan0=\"HomeNet\"".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("OfficeNet"));
        assert!(msg.contains("HomeNet"));
    }
}
