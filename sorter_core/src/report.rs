//! Remote kiosk API seam.
//!
//! START asks the backend for a transaction; STOP reports final tallies. Both
//! are best-effort: callers fall back to an offline transaction and never let
//! a network failure block the physical sequence.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// Reply to a START action. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartReply {
    pub transaction_id: Option<String>,
    pub claim_secret: Option<String>,
}

/// Transaction identity used for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub transaction_id: String,
    pub claim_secret: String,
}

pub const OFFLINE_CLAIM_SECRET: &str = "offline";

/// Final tallies of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopReport {
    pub transaction_id: String,
    pub plastic: u32,
    pub cans: u32,
    pub other: u32,
    pub total_weight: f32,
}

pub trait KioskApi {
    fn start_session(&self) -> Result<StartReply, ReportError>;
    fn report_stop(&self, report: &StopReport) -> Result<(), ReportError>;
}

impl<T: KioskApi + ?Sized> KioskApi for Box<T> {
    fn start_session(&self) -> Result<StartReply, ReportError> {
        (**self).start_session()
    }

    fn report_stop(&self, report: &StopReport) -> Result<(), ReportError> {
        (**self).report_stop(report)
    }
}

/// `OFF-<unix seconds>`.
pub fn offline_transaction_id(now: SystemTime) -> String {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("OFF-{secs}")
}

/// Fill whatever the remote did not provide with offline values.
pub fn resolve_grant(reply: Result<StartReply, ReportError>, now: SystemTime) -> SessionGrant {
    let reply = match reply {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "kiosk START failed; using offline transaction");
            StartReply::default()
        }
    };
    SessionGrant {
        transaction_id: reply
            .transaction_id
            .unwrap_or_else(|| offline_transaction_id(now)),
        claim_secret: reply
            .claim_secret
            .unwrap_or_else(|| OFFLINE_CLAIM_SECRET.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn network_failure_goes_offline() {
        let g = resolve_grant(Err(ReportError::Network("refused".into())), at(1_700_000_000));
        assert_eq!(g.transaction_id, "OFF-1700000000");
        assert_eq!(g.claim_secret, "offline");
    }

    #[test]
    fn partial_reply_keeps_what_was_sent() {
        let g = resolve_grant(
            Ok(StartReply {
                transaction_id: Some("tx-9".into()),
                claim_secret: None,
            }),
            at(5),
        );
        assert_eq!(g.transaction_id, "tx-9");
        assert_eq!(g.claim_secret, "offline");
    }

    #[test]
    fn start_reply_reads_camel_case() {
        let r: StartReply =
            serde_json::from_str(r#"{"transactionId":"a","claimSecret":"b","extra":1}"#).unwrap();
        assert_eq!(r.transaction_id.as_deref(), Some("a"));
        assert_eq!(r.claim_secret.as_deref(), Some("b"));
    }
}
