//! Blocking HTTP client for the remote kiosk backend.
//!
//! Built on `reqwest::blocking`, so it must be constructed and dropped outside
//! the tokio runtime; station actions call it from `spawn_blocking` workers.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use sorter_config::RemoteCfg;
use sorter_core::error::ReportError;
use sorter_core::report::{KioskApi, StartReply, StopReport};
use tracing::debug;

pub struct HttpKioskApi {
    client: reqwest::blocking::Client,
    url: String,
    bin_id: String,
    secret: String,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl HttpKioskApi {
    pub fn new(cfg: &RemoteCfg) -> Result<Self, ReportError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| ReportError::Network(e.to_string()))?;
        Ok(Self {
            client,
            url: cfg.kiosk_url(),
            bin_id: cfg.bin_id.clone(),
            secret: cfg.secret.clone(),
            start_timeout: Duration::from_millis(cfg.start_timeout_ms),
            stop_timeout: Duration::from_millis(cfg.stop_timeout_ms),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post<T: Serialize>(
        &self,
        body: &T,
        timeout: Duration,
    ) -> Result<reqwest::blocking::Response, ReportError> {
        let resp = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .json(body)
            .send()
            .map_err(|e| ReportError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ReportError::Status(status.as_u16()));
        }
        Ok(resp)
    }
}

/// START body: `{action, binId, secret}`.
pub fn start_payload(bin_id: &str, secret: &str) -> serde_json::Value {
    json!({ "action": "START", "binId": bin_id, "secret": secret })
}

/// STOP body: the tallies plus `{action, binId, secret}`.
pub fn stop_payload(bin_id: &str, secret: &str, report: &StopReport) -> serde_json::Value {
    json!({
        "action": "STOP",
        "binId": bin_id,
        "transactionId": report.transaction_id,
        "plastic": report.plastic,
        "cans": report.cans,
        "other": report.other,
        "totalWeight": report.total_weight,
        "secret": secret,
    })
}

impl KioskApi for HttpKioskApi {
    fn start_session(&self) -> Result<StartReply, ReportError> {
        let body = start_payload(&self.bin_id, &self.secret);
        let reply: StartReply = self
            .post(&body, self.start_timeout)?
            .json()
            .map_err(|e| ReportError::Decode(e.to_string()))?;
        debug!(?reply, "kiosk START answered");
        Ok(reply)
    }

    fn report_stop(&self, report: &StopReport) -> Result<(), ReportError> {
        let body = stop_payload(&self.bin_id, &self.secret, report);
        self.post(&body, self.stop_timeout)?;
        debug!(transaction_id = %report.transaction_id, "kiosk STOP accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_payload_names_the_bin() {
        let v = start_payload("BIN_07", "s3cret");
        assert_eq!(v["action"], "START");
        assert_eq!(v["binId"], "BIN_07");
        assert_eq!(v["secret"], "s3cret");
    }

    #[test]
    fn stop_payload_carries_tallies_in_camel_case() {
        let report = StopReport {
            transaction_id: "TX-9".into(),
            plastic: 2,
            cans: 1,
            other: 0,
            total_weight: 12.5,
        };
        let v = stop_payload("BIN_01", "default", &report);
        assert_eq!(v["action"], "STOP");
        assert_eq!(v["transactionId"], "TX-9");
        assert_eq!(v["plastic"], 2);
        assert_eq!(v["cans"], 1);
        assert_eq!(v["other"], 0);
        assert_eq!(v["totalWeight"], 12.5);
        assert_eq!(v["secret"], "default");
    }

    #[test]
    fn unreachable_backend_is_a_network_error() {
        let cfg = RemoteCfg {
            base_url: "http://127.0.0.1:9".into(),
            start_timeout_ms: 200,
            ..RemoteCfg::default()
        };
        let api = HttpKioskApi::new(&cfg).unwrap();
        assert_eq!(api.url(), "http://127.0.0.1:9/api/machine/kiosk");
        assert!(matches!(api.start_session(), Err(ReportError::Network(_))));
    }
}
