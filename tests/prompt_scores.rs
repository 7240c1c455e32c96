//! Tests for the six-dimension quality score type

use proptest::prelude::*;

use evql::error::Error;
use evql::types::refined::PromptScores;

#[test]
fn overall_is_floor_of_the_mean() {
    let scores = PromptScores::new(100, 100, 95, 95, 100, 95).unwrap();
    assert_eq!(scores.overall(), 97);

    let scores = PromptScores::new(0, 0, 0, 0, 0, 0).unwrap();
    assert_eq!(scores.overall(), 0);

    let scores = PromptScores::new(100, 100, 100, 100, 100, 100).unwrap();
    assert_eq!(scores.overall(), 100);

    // 5 / 6 floors to 0.
    let scores = PromptScores::new(5, 0, 0, 0, 0, 0).unwrap();
    assert_eq!(scores.overall(), 0);
}

#[test]
fn dimensions_above_100_are_rejected() {
    let err = PromptScores::new(100, 101, 0, 0, 0, 0).unwrap_err();
    assert!(matches!(err, Error::InvalidValue(_)));
}

#[test]
fn deserialization_rejects_a_forged_overall() {
    let json = r#"{
        "provenance": 100, "replicability": 100, "objectivity": 95,
        "methodology": 95, "publication": 100, "transparency": 95,
        "overall": 100
    }"#;
    assert!(serde_json::from_str::<PromptScores>(json).is_err());

    let honest = json.replace("\"overall\": 100", "\"overall\": 97");
    let scores: PromptScores = serde_json::from_str(&honest).unwrap();
    assert_eq!(scores.overall(), 97);
}

#[test]
fn serde_round_trip_preserves_every_dimension() {
    let scores = PromptScores::new(10, 20, 30, 40, 50, 60).unwrap();
    let json = serde_json::to_string(&scores).unwrap();
    let back: PromptScores = serde_json::from_str(&json).unwrap();
    assert_eq!(back, scores);
    assert!(back.verify().is_ok());
}

proptest! {
    #[test]
    fn overall_always_equals_the_derived_mean(dims in proptest::array::uniform6(0u8..=100)) {
        let scores = PromptScores::new(dims[0], dims[1], dims[2], dims[3], dims[4], dims[5]).unwrap();
        let sum: u32 = dims.iter().map(|&d| d as u32).sum();
        prop_assert_eq!(scores.overall() as u32, sum / 6);
        prop_assert!(scores.verify().is_ok());
        prop_assert_eq!(scores.dimensions(), dims);
    }

    #[test]
    fn overall_never_exceeds_the_largest_dimension(dims in proptest::array::uniform6(0u8..=100)) {
        let scores = PromptScores::new(dims[0], dims[1], dims[2], dims[3], dims[4], dims[5]).unwrap();
        let max = *dims.iter().max().unwrap();
        let min = *dims.iter().min().unwrap();
        prop_assert!(scores.overall() <= max);
        prop_assert!(scores.overall() >= min);
    }
}
