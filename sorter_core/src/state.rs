//! Per-run counters and status, serialized as the kiosk's `/state` document.

use std::fmt;

use serde::Serialize;

use crate::types::{Label, ScanOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    ShowResult,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::ShowResult => "SHOW_RESULT",
        })
    }
}

/// Invariant: the three counters sum to the number of scans recorded since the
/// last `begin`, and `total_weight_g` is the sum of their item weights.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    pub status: RunStatus,
    #[serde(rename = "plastic")]
    pub plastic_count: u32,
    #[serde(rename = "cans")]
    pub can_count: u32,
    #[serde(rename = "other")]
    pub other_count: u32,
    #[serde(rename = "total_weight")]
    pub total_weight_g: f32,
    /// Label of the most recent scan, or "Ready".
    pub last_item: String,
    pub last_weight: f32,
    pub transaction_id: Option<String>,
    pub claim_secret: Option<String>,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            status: RunStatus::Idle,
            plastic_count: 0,
            can_count: 0,
            other_count: 0,
            total_weight_g: 0.0,
            last_item: "Ready".into(),
            last_weight: 0.0,
            transaction_id: None,
            claim_secret: None,
        }
    }
}

impl RunState {
    /// Zeroed `Running` state for a new transaction.
    pub fn begin(&mut self, transaction_id: String, claim_secret: String) {
        *self = Self {
            status: RunStatus::Running,
            transaction_id: Some(transaction_id),
            claim_secret: Some(claim_secret),
            ..Self::default()
        };
    }

    pub fn record(&mut self, outcome: &ScanOutcome) {
        match outcome.label {
            Label::Plastic => self.plastic_count += 1,
            Label::Can => self.can_count += 1,
            Label::Other => self.other_count += 1,
        }
        self.total_weight_g += outcome.item_weight_g;
        self.last_item = outcome.label.to_string();
        self.last_weight = outcome.item_weight_g;
    }

    pub fn freeze(&mut self) {
        self.status = RunStatus::ShowResult;
    }

    /// Back to `Idle`; counters stay visible until the next `begin`.
    pub fn reset(&mut self) {
        self.status = RunStatus::Idle;
    }

    pub fn scans(&self) -> u32 {
        self.plastic_count + self.can_count + self.other_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_zeroes_previous_run() {
        let mut s = RunState::default();
        s.begin("T1".into(), "c1".into());
        s.record(&ScanOutcome {
            label: Label::Can,
            item_weight_g: 12.0,
        });
        s.freeze();
        s.begin("T2".into(), "c2".into());
        assert_eq!(s.status, RunStatus::Running);
        assert_eq!(s.scans(), 0);
        assert_eq!(s.total_weight_g, 0.0);
        assert_eq!(s.last_item, "Ready");
        assert_eq!(s.transaction_id.as_deref(), Some("T2"));
    }

    #[test]
    fn serializes_with_kiosk_field_names() {
        let mut s = RunState::default();
        s.begin("OFF-1".into(), "offline".into());
        s.record(&ScanOutcome {
            label: Label::Plastic,
            item_weight_g: 4.5,
        });
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["status"], "RUNNING");
        assert_eq!(v["plastic"], 1);
        assert_eq!(v["cans"], 0);
        assert_eq!(v["total_weight"], 4.5);
        assert_eq!(v["last_item"], "Plastic");
        assert_eq!(v["claim_secret"], "offline");
    }

    #[test]
    fn show_result_serializes_screaming() {
        let mut s = RunState::default();
        s.freeze();
        assert_eq!(serde_json::to_value(&s).unwrap()["status"], "SHOW_RESULT");
        assert_eq!(s.status.to_string(), "SHOW_RESULT");
    }
}
