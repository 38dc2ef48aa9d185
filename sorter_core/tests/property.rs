use proptest::prelude::*;
use sorter_core::fusion::{MAX_ITEM_WEIGHT_G, decide};
use sorter_core::types::{Label, RejectionReason};

fn any_label() -> impl Strategy<Value = Label> {
    prop_oneof![Just(Label::Can), Just(Label::Plastic), Just(Label::Other)]
}

proptest! {
    #[test]
    fn heavy_items_are_always_rejected(w in 50.001f32..10_000.0, metal in any::<bool>(), label in any_label()) {
        let d = decide(w, metal, label);
        prop_assert_eq!(d.final_label, Label::Other);
        prop_assert_eq!(d.rejection, Some(RejectionReason::TooHeavy));
    }

    #[test]
    fn decision_only_keeps_or_downgrades(w in 0.0f32..200.0, metal in any::<bool>(), label in any_label()) {
        let d = decide(w, metal, label);
        prop_assert!(d.final_label == label || d.final_label == Label::Other);
        // a changed label always carries a reason
        prop_assert!(d.rejection.is_some() || d.final_label == label);
    }

    #[test]
    fn accepted_items_agree_with_metal(w in 0.0f32..=MAX_ITEM_WEIGHT_G, metal in any::<bool>(), label in any_label()) {
        let d = decide(w, metal, label);
        match d.final_label {
            Label::Can => prop_assert!(metal),
            Label::Plastic => prop_assert!(!metal),
            Label::Other => {}
        }
    }
}
