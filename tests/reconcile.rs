//! End-to-end reconciliation against a mocked DNSPod endpoint.

use async_trait::async_trait;
use dnspod_ddns::config::Config;
use dnspod_ddns::detect::{AddressSource, DetectSource, DetectedAddress};
use dnspod_ddns::dnspod::Client;
use dnspod_ddns::error::Result;
use dnspod_ddns::updater::{CycleOutcome, Updater};
use std::net::Ipv4Addr;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedSource(Ipv4Addr);

#[async_trait]
impl AddressSource for FixedSource {
    async fn detect_ipv4(&self) -> Result<DetectedAddress> {
        Ok(DetectedAddress {
            ip: self.0,
            source: DetectSource::Iface("eth0".to_string()),
        })
    }
}

fn config(base_url: String) -> Config {
    Config {
        login_token: "13490,abcdef".to_string(),
        format: "json".to_string(),
        lang: "cn".to_string(),
        error_on_empty: "no".to_string(),
        base_url,
        domain: "example.com".to_string(),
        domain_id: None,
        record_id: None,
        sub_domain: "www".to_string(),
        record_type: "A".to_string(),
        record_line: "默认".to_string(),
        record_line_id: String::new(),
        ttl: None,
        mx: None,
        status: "enable".to_string(),
        weight: None,
        check_interval: Duration::ZERO,
        one_shot: true,
        http_timeout: Duration::from_secs(5),
        start_delay: Duration::ZERO,
        preferred_iface: None,
        detect_method: dnspod_ddns::detect::DetectMethod::Auto,
        wifi_ssid: None,
        user_agent: "dnspod-ddns/test".to_string(),
    }
}

fn list_body(value: &str) -> String {
    format!(
        r#"{{
            "status": {{"code": "1", "message": "Action completed"}},
            "records": [
                {{"id": "42", "name": "www", "type": "A", "line": "ISP-X",
                  "line_id": "10", "value": "{value}", "ttl": "600",
                  "status": "enable"}}
            ]
        }}"#
    )
}

fn updater(server_uri: String, detected: Ipv4Addr) -> Updater {
    let cfg = config(server_uri);
    let client = Client::from_config(&cfg);
    Updater::new(cfg, Box::new(FixedSource(detected)), Box::new(client))
}

#[tokio::test]
async fn test_drifted_record_gets_exactly_one_update() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Record.List"))
        .and(body_string_contains("sub_domain=www"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_body("203.0.113.5")))
        .expect(1)
        .mount(&server)
        .await;

    // The update must carry the new value and the preserved routing line.
    Mock::given(method("POST"))
        .and(path("/Record.Modify"))
        .and(body_string_contains("record_id=42"))
        .and(body_string_contains("value=203.0.113.9"))
        .and(body_string_contains("record_type=A"))
        .and(body_string_contains("record_line_id=10"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status": {"code": "1", "message": "Action completed"},
                "record": {"id": "42", "name": "www", "value": "203.0.113.9",
                           "status": "enable"}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = updater(server.uri(), Ipv4Addr::new(203, 0, 113, 9))
        .check_once()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Updated {
            ip: Ipv4Addr::new(203, 0, 113, 9),
            previous: "203.0.113.5".to_string()
        }
    );
}

#[tokio::test]
async fn test_repeat_cycle_without_drift_is_a_noop() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Record.List"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_body("203.0.113.9")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/Record.Modify"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status": {"code": "1", "message": "Action completed"}}"#,
        ))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = updater(server.uri(), Ipv4Addr::new(203, 0, 113, 9))
        .check_once()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::NoChange {
            ip: Ipv4Addr::new(203, 0, 113, 9)
        }
    );
}

#[tokio::test]
async fn test_single_shot_run_updates_and_exits() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Record.List"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_body("203.0.113.5")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/Record.Modify"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status": {"code": "1", "message": "Action completed"}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let (_tx, rx) = tokio::sync::watch::channel(false);
    updater(server.uri(), Ipv4Addr::new(203, 0, 113, 9))
        .run(rx)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_record_resolution_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Record.Info"))
        .and(body_string_contains("record_id=42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status": {"code": "1", "message": "Action completed"},
                "record": {"id": "42", "name": "www", "type": "A",
                           "line": "默认", "line_id": "0",
                           "value": "203.0.113.9", "status": "enable"}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = config(server.uri());
    cfg.record_id = Some(42);
    let client = Client::from_config(&cfg);
    let updater = Updater::new(
        cfg,
        Box::new(FixedSource(Ipv4Addr::new(203, 0, 113, 9))),
        Box::new(client),
    );

    let outcome = updater.check_once().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::NoChange {
            ip: Ipv4Addr::new(203, 0, 113, 9)
        }
    );
}
