//! Fuzzy variables and their labeled sets
//!
//! A [`FuzzyVariable`] is a named input or output with a closed numeric
//! domain and an ordered, uniquely-named collection of [`FuzzySet`]s.
//! Variables are assembled by the model builder and immutable once the
//! model is frozen.

use std::fmt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{FisError, FisResult};
use crate::membership::MembershipFunction;

/// Whether a variable is consumed (input) or produced (output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarRole {
    Input,
    Output,
}

/// A named fuzzy set: a label bound to a membership function instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzySet {
    name: String,
    mf: MembershipFunction,
}

impl FuzzySet {
    pub fn new(name: impl Into<String>, mf: MembershipFunction) -> Self {
        Self {
            name: name.into(),
            mf,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mf(&self) -> &MembershipFunction {
        &self.mf
    }

    /// Membership degree of a crisp value in this set.
    pub fn membership(&self, x: f64) -> f64 {
        self.mf.evaluate(x)
    }
}

impl fmt::Display for FuzzySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}{:?}", self.name, self.mf.shape(), self.mf.params())
    }
}

/// A named input or output variable over a closed domain [min, max].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyVariable {
    name: String,
    min: f64,
    max: f64,
    role: VarRole,
    sets: IndexMap<String, FuzzySet>,
}

impl FuzzyVariable {
    pub(crate) fn new(
        name: impl Into<String>,
        min: f64,
        max: f64,
        role: VarRole,
    ) -> FisResult<Self> {
        let name = name.into();
        if !(min.is_finite() && max.is_finite()) || min >= max {
            return Err(FisError::invalid_parameters(format!(
                "variable '{}': domain [{}, {}] is not a valid range",
                name, min, max
            )));
        }
        Ok(Self {
            name,
            min,
            max,
            role,
            sets: IndexMap::new(),
        })
    }

    pub(crate) fn insert_set(&mut self, set: FuzzySet) -> FisResult<()> {
        if self.sets.contains_key(set.name()) {
            return Err(FisError::duplicate_set(&self.name, set.name()));
        }
        self.sets.insert(set.name().to_string(), set);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Domain midpoint; the fallback crisp output when no rule fires.
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    pub fn role(&self) -> VarRole {
        self.role
    }

    /// Clamp a crisp value into the declared domain.
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }

    /// Sets in insertion order.
    pub fn sets(&self) -> impl Iterator<Item = &FuzzySet> {
        self.sets.values()
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn set(&self, name: &str) -> Option<&FuzzySet> {
        self.sets.get(name)
    }

    pub fn set_index(&self, name: &str) -> Option<usize> {
        self.sets.get_index_of(name)
    }

    pub fn set_at(&self, index: usize) -> Option<&FuzzySet> {
        self.sets.get_index(index).map(|(_, s)| s)
    }

    /// Membership of a crisp value in every set, in insertion order.
    /// Mostly a diagnostic aid; evaluation uses the per-call cache.
    pub fn fuzzify(&self, x: f64) -> Vec<(&str, f64)> {
        self.sets
            .values()
            .map(|s| (s.name(), s.membership(x)))
            .collect()
    }
}

impl fmt::Display for FuzzyVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}] ({} sets)",
            self.name,
            self.min,
            self.max,
            self.sets.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::Shape;

    fn var() -> FuzzyVariable {
        let mut v = FuzzyVariable::new("temperature", 0.0, 40.0, VarRole::Input).unwrap();
        v.insert_set(FuzzySet::new(
            "Cold",
            MembershipFunction::new(Shape::Trapezoidal, &[0.0, 0.0, 10.0, 20.0]).unwrap(),
        ))
        .unwrap();
        v.insert_set(FuzzySet::new(
            "Hot",
            MembershipFunction::new(Shape::Trapezoidal, &[20.0, 30.0, 40.0, 40.0]).unwrap(),
        ))
        .unwrap();
        v
    }

    #[test]
    fn test_invalid_range_rejected() {
        assert!(FuzzyVariable::new("x", 1.0, 1.0, VarRole::Input).is_err());
        assert!(FuzzyVariable::new("x", 5.0, 1.0, VarRole::Input).is_err());
        assert!(FuzzyVariable::new("x", f64::NAN, 1.0, VarRole::Input).is_err());
    }

    #[test]
    fn test_duplicate_set_rejected() {
        let mut v = var();
        let err = v
            .insert_set(FuzzySet::new(
                "Cold",
                MembershipFunction::new(Shape::Singleton, &[5.0]).unwrap(),
            ))
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::DuplicateSetName);
    }

    #[test]
    fn test_set_lookup_and_order() {
        let v = var();
        assert_eq!(v.set_index("Cold"), Some(0));
        assert_eq!(v.set_index("Hot"), Some(1));
        assert_eq!(v.set_at(1).unwrap().name(), "Hot");
        assert!(v.set("Warm").is_none());
    }

    #[test]
    fn test_clamp_and_midpoint() {
        let v = var();
        assert_eq!(v.clamp(-3.0), 0.0);
        assert_eq!(v.clamp(55.0), 40.0);
        assert_eq!(v.midpoint(), 20.0);
    }

    #[test]
    fn test_fuzzify() {
        let v = var();
        let degrees = v.fuzzify(15.0);
        assert_eq!(degrees[0].0, "Cold");
        assert!((degrees[0].1 - 0.5).abs() < 1e-9);
        assert!(degrees[1].1.abs() < 1e-9);
    }
}
