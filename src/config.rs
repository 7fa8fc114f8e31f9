//! Configuration management for dnspod-ddns.
//!
//! All settings come from environment variables, so the agent drops into a
//! container or a systemd unit without a config file. Malformed values are
//! configuration errors naming the offending variable, never silent defaults.

use crate::detect::DetectMethod;
use crate::dnspod::CommonParams;
use crate::error::{DdnsError, Result};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    // DNSPod common params
    pub login_token: String,
    pub format: String,
    pub lang: String,
    pub error_on_empty: String,

    /// DNSPod API endpoint.
    pub base_url: String,

    // Record identification
    pub domain: String,
    pub domain_id: Option<i64>,
    pub record_id: Option<i64>,

    // Record fields
    pub sub_domain: String,
    /// Desired record type. Empty means "keep whatever the record has".
    pub record_type: String,
    pub record_line: String,
    /// Routing-line identifier. Takes precedence over the label when set.
    pub record_line_id: String,
    pub ttl: Option<u32>,
    pub mx: Option<u16>,
    pub status: String,
    /// `None` means "do not touch the weight", distinct from `Some(0)`.
    pub weight: Option<u32>,

    // Runtime
    /// Zero means run a single cycle and exit.
    pub check_interval: Duration,
    pub one_shot: bool,
    pub http_timeout: Duration,
    pub start_delay: Duration,

    // IP detection
    pub preferred_iface: Option<String>,
    pub detect_method: DetectMethod,
    pub wifi_ssid: Option<String>,

    pub user_agent: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an injectable variable lookup.
    ///
    /// `from_env` is a thin wrapper over this; tests pass a map instead of
    /// mutating the real environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get_trim = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_or = |key: &str, default: &str| get_trim(key).unwrap_or_else(|| default.to_string());

        let cfg = Config {
            login_token: get_trim("DNSPOD_LOGIN_TOKEN").unwrap_or_default(),
            format: get_or("DNSPOD_FORMAT", "json"),
            lang: get_or("DNSPOD_LANG", "cn"),
            error_on_empty: get_or("DNSPOD_ERROR_ON_EMPTY", "no"),
            base_url: get_or("DNSPOD_BASE_URL", "https://dnsapi.cn"),

            domain: get_trim("DNSPOD_DOMAIN").unwrap_or_default(),
            domain_id: parse_opt("DNSPOD_DOMAIN_ID", get_trim("DNSPOD_DOMAIN_ID"))?,
            record_id: parse_opt("DNSPOD_RECORD_ID", get_trim("DNSPOD_RECORD_ID"))?,

            sub_domain: get_or("DNSPOD_SUB_DOMAIN", "@"),
            record_type: get_or("DNSPOD_RECORD_TYPE", "A").to_uppercase(),
            record_line: get_or("DNSPOD_RECORD_LINE", "默认"),
            record_line_id: get_trim("DNSPOD_RECORD_LINE_ID").unwrap_or_default(),
            ttl: parse_opt("DNSPOD_TTL", get_trim("DNSPOD_TTL"))?,
            mx: parse_opt("DNSPOD_MX", get_trim("DNSPOD_MX"))?,
            status: get_or("DNSPOD_STATUS", "enable"),
            weight: parse_opt("DNSPOD_WEIGHT", get_trim("DNSPOD_WEIGHT"))?,

            check_interval: parse_interval(&get_trim)?,
            one_shot: parse_bool("ONESHOT", get_trim("ONESHOT"))?.unwrap_or(false),
            http_timeout: parse_duration_var("HTTP_TIMEOUT", get_trim("HTTP_TIMEOUT"))?
                .unwrap_or(Duration::from_secs(10)),
            start_delay: parse_duration_var("START_DELAY", get_trim("START_DELAY"))?
                .unwrap_or(Duration::ZERO),

            preferred_iface: get_trim("IP_PREFERRED_IFACE"),
            detect_method: get_trim("IP_DETECT_METHOD")
                .as_deref()
                .unwrap_or("auto")
                .parse()?,
            wifi_ssid: get_trim("WIFI_SSID"),

            user_agent: get_or("USER_AGENT", concat!("dnspod-ddns/", env!("CARGO_PKG_VERSION"))),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.login_token.is_empty() {
            return Err(DdnsError::Config(
                "DNSPOD_LOGIN_TOKEN is required (format: id,token)".to_string(),
            ));
        }
        if self.domain.is_empty() && self.domain_id.is_none() {
            return Err(DdnsError::Config(
                "DNSPOD_DOMAIN or DNSPOD_DOMAIN_ID is required".to_string(),
            ));
        }
        if self.record_type == "MX" && self.mx.is_none() {
            return Err(DdnsError::Config(
                "DNSPOD_MX is required when DNSPOD_RECORD_TYPE=MX".to_string(),
            ));
        }
        Ok(())
    }

    /// Common request parameters sent with every DNSPod call.
    pub fn common_params(&self) -> CommonParams {
        CommonParams {
            login_token: self.login_token.clone(),
            format: self.format.clone(),
            lang: self.lang.clone(),
            error_on_empty: self.error_on_empty.clone(),
            domain: self.domain.clone(),
            domain_id: self.domain_id,
        }
    }

    /// Whether the loop should exit after the first cycle.
    pub fn single_shot(&self) -> bool {
        self.one_shot || self.check_interval.is_zero()
    }
}

fn parse_interval(get_trim: &impl Fn(&str) -> Option<String>) -> Result<Duration> {
    if let Some(d) = parse_duration_var("CHECK_INTERVAL", get_trim("CHECK_INTERVAL"))? {
        if !d.is_zero() {
            return Ok(d);
        }
    }
    // Compatibility: seconds-based variable.
    if let Some(secs) = parse_opt::<u64>("CHECK_INTERVAL_SECONDS", get_trim("CHECK_INTERVAL_SECONDS"))? {
        return Ok(Duration::from_secs(secs));
    }
    Ok(Duration::ZERO)
}

fn parse_opt<T: std::str::FromStr>(key: &str, value: Option<String>) -> Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| DdnsError::Config(format!("{key} has an invalid value: {v:?}"))),
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<Option<bool>> {
    let Some(v) = value else { return Ok(None) };
    match v.to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "n" | "off" => Ok(Some(false)),
        _ => Err(DdnsError::Config(format!(
            "{key} has an invalid boolean value: {v:?}"
        ))),
    }
}

/// Parse a duration variable: a bare integer is seconds, otherwise a single
/// `ms`/`s`/`m`/`h` suffix is accepted (`500ms`, `30s`, `5m`, `1h`).
fn parse_duration_var(key: &str, value: Option<String>) -> Result<Option<Duration>> {
    let Some(v) = value else { return Ok(None) };
    parse_duration(&v)
        .map(Some)
        .ok_or_else(|| DdnsError::Config(format!("{key} has an invalid duration: {v:?}")))
}

fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return Some(Duration::from_secs(s.parse().ok()?));
    }
    let (number, unit) = s.split_at(s.find(|c: char| !c.is_ascii_digit())?);
    let n: u64 = number.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(n)),
        "s" => Some(Duration::from_secs(n)),
        "m" => Some(Duration::from_secs(n * 60)),
        "h" => Some(Duration::from_secs(n * 3600)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DNSPOD_LOGIN_TOKEN", "13490,abcdef"),
            ("DNSPOD_DOMAIN", "example.com"),
        ]
    }

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = Config::from_lookup(env(&minimal())).unwrap();
        assert_eq!(cfg.sub_domain, "@");
        assert_eq!(cfg.record_type, "A");
        assert_eq!(cfg.record_line, "默认");
        assert_eq!(cfg.status, "enable");
        assert_eq!(cfg.weight, None);
        assert_eq!(cfg.http_timeout, Duration::from_secs(10));
        assert_eq!(cfg.check_interval, Duration::ZERO);
        assert!(cfg.single_shot());
        assert_eq!(cfg.detect_method, DetectMethod::Auto);
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let err = Config::from_lookup(env(&[("DNSPOD_DOMAIN", "example.com")])).unwrap_err();
        assert!(matches!(err, DdnsError::Config(_)));
        assert!(err.to_string().contains("DNSPOD_LOGIN_TOKEN"));
    }

    #[test]
    fn test_domain_or_domain_id_required() {
        let err = Config::from_lookup(env(&[("DNSPOD_LOGIN_TOKEN", "1,x")])).unwrap_err();
        assert!(err.to_string().contains("DNSPOD_DOMAIN"));

        let pairs = [("DNSPOD_LOGIN_TOKEN", "1,x"), ("DNSPOD_DOMAIN_ID", "42")];
        let cfg = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(cfg.domain_id, Some(42));
    }

    #[test]
    fn test_mx_requires_preference() {
        let mut pairs = minimal();
        pairs.push(("DNSPOD_RECORD_TYPE", "mx"));
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains("DNSPOD_MX"));

        pairs.push(("DNSPOD_MX", "10"));
        let cfg = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(cfg.record_type, "MX");
        assert_eq!(cfg.mx, Some(10));
    }

    #[test]
    fn test_weight_unset_vs_zero() {
        let cfg = Config::from_lookup(env(&minimal())).unwrap();
        assert_eq!(cfg.weight, None);

        let mut pairs = minimal();
        pairs.push(("DNSPOD_WEIGHT", "0"));
        let cfg = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(cfg.weight, Some(0));
    }

    #[test]
    fn test_invalid_integer_is_config_error() {
        let mut pairs = minimal();
        pairs.push(("DNSPOD_TTL", "soon"));
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains("DNSPOD_TTL"));
    }

    #[test]
    fn test_interval_parsing_and_compat_var() {
        let mut pairs = minimal();
        pairs.push(("CHECK_INTERVAL", "5m"));
        let cfg = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(cfg.check_interval, Duration::from_secs(300));
        assert!(!cfg.single_shot());

        let mut pairs = minimal();
        pairs.push(("CHECK_INTERVAL_SECONDS", "90"));
        let cfg = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(cfg.check_interval, Duration::from_secs(90));
    }

    #[test]
    fn test_oneshot_flag() {
        let mut pairs = minimal();
        pairs.push(("CHECK_INTERVAL", "60"));
        pairs.push(("ONESHOT", "yes"));
        let cfg = Config::from_lookup(env(&pairs)).unwrap();
        assert!(cfg.single_shot());

        let mut pairs = minimal();
        pairs.push(("ONESHOT", "sometimes"));
        assert!(Config::from_lookup(env(&pairs)).is_err());
    }

    #[test]
    fn test_unknown_detect_method_is_config_error() {
        let mut pairs = minimal();
        pairs.push(("IP_DETECT_METHOD", "carrier-pigeon"));
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(err, DdnsError::Config(_)));
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("10x"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_common_params_prefers_domain_id() {
        let mut pairs = minimal();
        pairs.push(("DNSPOD_DOMAIN_ID", "77"));
        let cfg = Config::from_lookup(env(&pairs)).unwrap();
        let common = cfg.common_params();
        assert_eq!(common.domain_id, Some(77));
        assert_eq!(common.domain, "example.com");
    }
}
