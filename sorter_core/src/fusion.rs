//! Reconciles the classifier's label with the metal flag and the weight.
//!
//! Rules, first match wins:
//! 1. heavier than the limit: `Other` / `TooHeavy`
//! 2. `Can` without metal: `Other` / `SensorLabelMismatch`
//! 3. `Plastic` with metal: `Other` / `SensorLabelMismatch`
//! 4. otherwise the classifier's label stands (an `Other` label is never rejected)

use crate::config::FusionCfg;
use crate::types::{Decision, Label, RejectionReason};

/// Heaviest item the mechanism can push, in grams.
pub const MAX_ITEM_WEIGHT_G: f32 = 50.0;

/// Decide with the default weight limit.
pub fn decide(weight_g: f32, metal_present: bool, label: Label) -> Decision {
    FusionCfg::default().decide(weight_g, metal_present, label)
}

impl FusionCfg {
    pub fn decide(&self, weight_g: f32, metal_present: bool, label: Label) -> Decision {
        if weight_g > self.max_item_weight_g {
            return Decision::rejected(RejectionReason::TooHeavy);
        }
        match (label, metal_present) {
            (Label::Can, false) | (Label::Plastic, true) => {
                Decision::rejected(RejectionReason::SensorLabelMismatch)
            }
            (label, _) => Decision::accepted(label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(60.0, true, Label::Can, Label::Other, Some(RejectionReason::TooHeavy))]
    #[case(60.0, false, Label::Plastic, Label::Other, Some(RejectionReason::TooHeavy))]
    #[case(10.0, false, Label::Can, Label::Other, Some(RejectionReason::SensorLabelMismatch))]
    #[case(10.0, true, Label::Plastic, Label::Other, Some(RejectionReason::SensorLabelMismatch))]
    #[case(10.0, true, Label::Can, Label::Can, None)]
    #[case(10.0, false, Label::Plastic, Label::Plastic, None)]
    #[case(10.0, false, Label::Other, Label::Other, None)]
    #[case(10.0, true, Label::Other, Label::Other, None)]
    #[case(50.0, true, Label::Can, Label::Can, None)]
    fn decision_table(
        #[case] w: f32,
        #[case] metal: bool,
        #[case] label: Label,
        #[case] want: Label,
        #[case] reason: Option<RejectionReason>,
    ) {
        let d = decide(w, metal, label);
        assert_eq!(d.final_label, want);
        assert_eq!(d.rejection, reason);
    }

    #[test]
    fn custom_limit_applies() {
        let cfg = FusionCfg {
            max_item_weight_g: 20.0,
        };
        assert_eq!(
            cfg.decide(25.0, false, Label::Plastic).rejection,
            Some(RejectionReason::TooHeavy)
        );
        assert_eq!(cfg.decide(15.0, false, Label::Plastic).final_label, Label::Plastic);
    }
}
