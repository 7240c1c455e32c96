//! Refinement types with validated constructors
//!
//! Every type here can only be built through a constructor that returns
//! `Result`; once built, the inner data is never publicly mutable. This is
//! the runtime substitute for compiler-verified refinement proofs: there is
//! no public path to an invalid instance.
//!
//! Deserialization goes through raw shadow structs and `TryFrom`, so a
//! value decoded from JSON (or any serde source) is re-validated.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A string guaranteed to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// The only way to build one. Rejects the empty string.
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(Error::EmptyStringViolation("NonEmptyString".into()));
        }
        Ok(NonEmptyString(s))
    }

    pub(crate) fn from_trusted(s: String) -> Self {
        NonEmptyString(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        NonEmptyString::new(s)
    }
}

impl From<NonEmptyString> for String {
    fn from(s: NonEmptyString) -> String {
        s.0
    }
}

impl fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mandatory justification text attached to mutating statements.
pub type Rationale = NonEmptyString;

/// Identifier of the acting user or agent.
pub type ActorId = NonEmptyString;

/// A natural number proven to lie in an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBounded<u64>", into = "RawBounded<u64>")]
pub struct BoundedNat {
    min: u64,
    max: u64,
    value: u64,
}

impl BoundedNat {
    pub fn new(min: u64, max: u64, value: u64) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidTypeExpr(format!(
                "BoundedNat {} {}: min must be <= max",
                min, max
            )));
        }
        if value < min || value > max {
            return Err(Error::BoundsViolation {
                min: min as i128,
                max: max as i128,
                value: value as i128,
            });
        }
        Ok(BoundedNat { min, max, value })
    }

    /// Trusted-input fast path for the codec: reconstructs without
    /// re-validating. Only reachable for payloads explicitly marked
    /// trusted; external bytes default to the validated path.
    pub(crate) fn from_trusted_parts(min: u64, max: u64, value: u64) -> Self {
        BoundedNat { min, max, value }
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}

/// An integer proven to lie in an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBounded<i64>", into = "RawBounded<i64>")]
pub struct BoundedInt {
    min: i64,
    max: i64,
    value: i64,
}

impl BoundedInt {
    pub fn new(min: i64, max: i64, value: i64) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidTypeExpr(format!(
                "BoundedInt {} {}: min must be <= max",
                min, max
            )));
        }
        if value < min || value > max {
            return Err(Error::BoundsViolation {
                min: min as i128,
                max: max as i128,
                value: value as i128,
            });
        }
        Ok(BoundedInt { min, max, value })
    }

    pub(crate) fn from_trusted_parts(min: i64, max: i64, value: i64) -> Self {
        BoundedInt { min, max, value }
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

/// A float proven to lie in an inclusive range. NaN is never accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounded<f64>", into = "RawBounded<f64>")]
pub struct BoundedFloat {
    min: f64,
    max: f64,
    value: f64,
}

impl BoundedFloat {
    pub fn new(min: f64, max: f64, value: f64) -> Result<Self> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(Error::InvalidTypeExpr(format!(
                "BoundedFloat {} {}: min must be <= max",
                min, max
            )));
        }
        if value.is_nan() || value < min || value > max {
            return Err(Error::FloatBoundsViolation { min, max, value });
        }
        Ok(BoundedFloat { min, max, value })
    }

    pub(crate) fn from_trusted_parts(min: f64, max: f64, value: f64) -> Self {
        BoundedFloat { min, max, value }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Raw serde shadow for the bounded types. Deserialization re-runs the
/// validated constructor via TryFrom.
#[derive(Serialize, Deserialize)]
struct RawBounded<T> {
    min: T,
    max: T,
    value: T,
}

impl TryFrom<RawBounded<u64>> for BoundedNat {
    type Error = Error;

    fn try_from(raw: RawBounded<u64>) -> Result<Self> {
        BoundedNat::new(raw.min, raw.max, raw.value)
    }
}

impl From<BoundedNat> for RawBounded<u64> {
    fn from(b: BoundedNat) -> Self {
        RawBounded {
            min: b.min,
            max: b.max,
            value: b.value,
        }
    }
}

impl TryFrom<RawBounded<i64>> for BoundedInt {
    type Error = Error;

    fn try_from(raw: RawBounded<i64>) -> Result<Self> {
        BoundedInt::new(raw.min, raw.max, raw.value)
    }
}

impl From<BoundedInt> for RawBounded<i64> {
    fn from(b: BoundedInt) -> Self {
        RawBounded {
            min: b.min,
            max: b.max,
            value: b.value,
        }
    }
}

impl TryFrom<RawBounded<f64>> for BoundedFloat {
    type Error = Error;

    fn try_from(raw: RawBounded<f64>) -> Result<Self> {
        BoundedFloat::new(raw.min, raw.max, raw.value)
    }
}

impl From<BoundedFloat> for RawBounded<f64> {
    fn from(b: BoundedFloat) -> Self {
        RawBounded {
            min: b.min,
            max: b.max,
            value: b.value,
        }
    }
}

/// A confidence score in [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(Error::FloatBoundsViolation {
                min: 0.0,
                max: 1.0,
                value,
            });
        }
        Ok(Confidence(value))
    }

    pub(crate) fn from_trusted(value: f64) -> Self {
        Confidence(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Confidence::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> f64 {
        c.0
    }
}

/// The six PROMPT quality dimensions plus the derived overall score.
///
/// `overall` is floor(mean of the six dimensions). It is computed by the
/// constructor and can never be set independently; serialization and
/// deserialization both re-verify it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPromptScores", into = "RawPromptScores")]
pub struct PromptScores {
    provenance: u8,
    replicability: u8,
    objectivity: u8,
    methodology: u8,
    publication: u8,
    transparency: u8,
    overall: u8,
}

impl PromptScores {
    /// Builds a score set from the six dimensions, each in [0, 100].
    /// The overall score is derived here and nowhere else.
    pub fn new(
        provenance: u8,
        replicability: u8,
        objectivity: u8,
        methodology: u8,
        publication: u8,
        transparency: u8,
    ) -> Result<Self> {
        for (name, dim) in [
            ("provenance", provenance),
            ("replicability", replicability),
            ("objectivity", objectivity),
            ("methodology", methodology),
            ("publication", publication),
            ("transparency", transparency),
        ] {
            if dim > 100 {
                return Err(Error::InvalidValue(format!(
                    "PromptScores {}: {} outside bounds [0, 100]",
                    name, dim
                )));
            }
        }
        let overall = Self::derive_overall([
            provenance,
            replicability,
            objectivity,
            methodology,
            publication,
            transparency,
        ]);
        Ok(PromptScores {
            provenance,
            replicability,
            objectivity,
            methodology,
            publication,
            transparency,
            overall,
        })
    }

    pub(crate) fn from_trusted_parts(dims: [u8; 6], overall: u8) -> Self {
        PromptScores {
            provenance: dims[0],
            replicability: dims[1],
            objectivity: dims[2],
            methodology: dims[3],
            publication: dims[4],
            transparency: dims[5],
            overall,
        }
    }

    fn derive_overall(dims: [u8; 6]) -> u8 {
        let sum: u32 = dims.iter().map(|&d| d as u32).sum();
        (sum / 6) as u8
    }

    /// Re-checks the derived overall against the six dimensions. Read paths
    /// that matter (codec, comparison against external input) call this.
    pub fn verify(&self) -> Result<()> {
        let expected = Self::derive_overall(self.dimensions());
        if self.overall != expected {
            return Err(Error::InvalidValue(format!(
                "PromptScores overall {} does not match derived value {}",
                self.overall, expected
            )));
        }
        Ok(())
    }

    pub fn dimensions(&self) -> [u8; 6] {
        [
            self.provenance,
            self.replicability,
            self.objectivity,
            self.methodology,
            self.publication,
            self.transparency,
        ]
    }

    pub fn provenance(&self) -> u8 {
        self.provenance
    }

    pub fn replicability(&self) -> u8 {
        self.replicability
    }

    pub fn objectivity(&self) -> u8 {
        self.objectivity
    }

    pub fn methodology(&self) -> u8 {
        self.methodology
    }

    pub fn publication(&self) -> u8 {
        self.publication
    }

    pub fn transparency(&self) -> u8 {
        self.transparency
    }

    pub fn overall(&self) -> u8 {
        self.overall
    }
}

/// Raw serde shadow carrying an explicit overall field, so that external
/// input claiming a different overall is rejected rather than silently
/// recomputed.
#[derive(Serialize, Deserialize)]
struct RawPromptScores {
    provenance: u8,
    replicability: u8,
    objectivity: u8,
    methodology: u8,
    publication: u8,
    transparency: u8,
    overall: u8,
}

impl TryFrom<RawPromptScores> for PromptScores {
    type Error = Error;

    fn try_from(raw: RawPromptScores) -> Result<Self> {
        let scores = PromptScores::new(
            raw.provenance,
            raw.replicability,
            raw.objectivity,
            raw.methodology,
            raw.publication,
            raw.transparency,
        )?;
        if scores.overall != raw.overall {
            return Err(Error::InvalidValue(format!(
                "PromptScores overall {} does not match derived value {}",
                raw.overall, scores.overall
            )));
        }
        Ok(scores)
    }
}

impl From<PromptScores> for RawPromptScores {
    fn from(s: PromptScores) -> Self {
        RawPromptScores {
            provenance: s.provenance,
            replicability: s.replicability,
            objectivity: s.objectivity,
            methodology: s.methodology,
            publication: s.publication,
            transparency: s.transparency,
            overall: s.overall,
        }
    }
}

/// A value with attached provenance: who, why, and when.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tracked<T> {
    value: T,
    actor: ActorId,
    rationale: Rationale,
    timestamp: u64,
}

impl<T> Tracked<T> {
    /// Builds a tracked value. Actor and rationale are non-empty by type;
    /// the timestamp must be non-zero.
    pub fn new(value: T, actor: ActorId, rationale: Rationale, timestamp: u64) -> Result<Self> {
        if timestamp == 0 {
            return Err(Error::InvalidValue(
                "Tracked timestamp must be non-zero".into(),
            ));
        }
        Ok(Tracked {
            value,
            actor,
            rationale,
            timestamp,
        })
    }

    pub(crate) fn from_trusted_parts(
        value: T,
        actor: ActorId,
        rationale: Rationale,
        timestamp: u64,
    ) -> Self {
        Tracked {
            value,
            actor,
            rationale,
            timestamp,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    pub fn rationale(&self) -> &Rationale {
        &self.rationale
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

#[derive(Deserialize)]
struct RawTracked<T> {
    value: T,
    actor: String,
    rationale: String,
    timestamp: u64,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Tracked<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawTracked::<T>::deserialize(deserializer)?;
        let actor = ActorId::new(raw.actor).map_err(serde::de::Error::custom)?;
        let rationale = Rationale::new(raw.rationale).map_err(serde::de::Error::custom)?;
        Tracked::new(raw.value, actor, rationale, raw.timestamp)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_string_rejects_empty() {
        assert!(NonEmptyString::new("").is_err());
        assert_eq!(NonEmptyString::new("x").unwrap().as_str(), "x");
    }

    #[test]
    fn bounded_nat_enforces_range() {
        assert!(BoundedNat::new(0, 100, 100).is_ok());
        assert!(matches!(
            BoundedNat::new(0, 100, 150),
            Err(Error::BoundsViolation {
                min: 0,
                max: 100,
                value: 150
            })
        ));
        assert!(BoundedNat::new(10, 5, 7).is_err());
    }

    #[test]
    fn confidence_rejects_out_of_unit_interval() {
        assert!(Confidence::new(0.85).is_ok());
        assert!(Confidence::new(1.01).is_err());
        assert!(Confidence::new(f64::NAN).is_err());
    }

    #[test]
    fn prompt_scores_derive_overall() {
        let scores = PromptScores::new(100, 100, 95, 95, 100, 95).unwrap();
        assert_eq!(scores.overall(), 97);
        scores.verify().unwrap();
    }

    #[test]
    fn prompt_scores_reject_dimension_over_100() {
        assert!(PromptScores::new(101, 0, 0, 0, 0, 0).is_err());
    }

    #[test]
    fn prompt_scores_deserialization_rejects_forged_overall() {
        let json = r#"{"provenance":100,"replicability":100,"objectivity":95,
            "methodology":95,"publication":100,"transparency":95,"overall":100}"#;
        assert!(serde_json::from_str::<PromptScores>(json).is_err());
        let honest = json.replace("\"overall\":100", "\"overall\":97");
        assert!(serde_json::from_str::<PromptScores>(&honest).is_ok());
    }

    #[test]
    fn tracked_rejects_zero_timestamp() {
        let actor = ActorId::new("curator").unwrap();
        let rationale = Rationale::new("initial import").unwrap();
        assert!(Tracked::new(5u64, actor.clone(), rationale.clone(), 0).is_err());
        let tracked = Tracked::new(5u64, actor, rationale, 1_700_000_000).unwrap();
        assert_eq!(*tracked.value(), 5);
    }

    #[test]
    fn tracked_deserialization_revalidates() {
        let json = r#"{"value":3,"actor":"","rationale":"why","timestamp":10}"#;
        assert!(serde_json::from_str::<Tracked<u64>>(json).is_err());
    }
}
