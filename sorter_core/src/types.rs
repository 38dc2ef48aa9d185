//! Value types flowing through one scan.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Closed set of bins. Class indices come from the model's training order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Label {
    Can,
    Plastic,
    Other,
}

impl Label {
    /// Index 0 is a can, index 2 is plastic, anything else is other.
    pub fn from_class_index(idx: usize) -> Self {
        match idx {
            0 => Self::Can,
            2 => Self::Plastic,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Can => "Can",
            Self::Plastic => "Plastic",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "can" => Ok(Self::Can),
            "plastic" => Ok(Self::Plastic),
            "other" => Ok(Self::Other),
            other => Err(format!(
                "unknown label '{other}' (expected can, plastic or other)"
            )),
        }
    }
}

/// Weight and metal flag taken together at the start of a scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub weight_g: f32,
    pub metal_present: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: Label,
    pub raw_scores: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectionReason {
    TooHeavy,
    SensorLabelMismatch,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TooHeavy => "too heavy",
            Self::SensorLabelMismatch => "sensor/label mismatch",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub final_label: Label,
    pub rejection: Option<RejectionReason>,
}

impl Decision {
    pub fn accepted(label: Label) -> Self {
        Self {
            final_label: label,
            rejection: None,
        }
    }

    pub fn rejected(reason: RejectionReason) -> Self {
        Self {
            final_label: Label::Other,
            rejection: Some(reason),
        }
    }
}

/// What a completed scan reports to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub label: Label,
    #[serde(rename = "weight")]
    pub item_weight_g: f32,
}
