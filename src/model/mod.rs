//! FIS data model
//!
//! This module defines the core data types of the inference engine:
//! - [`FuzzyVariable`] / [`FuzzySet`] - named domains with labeled sets
//! - [`Rule`] / [`RuleBase`] - antecedent trees, consequents, operators
//! - [`ModelBuilder`] - assembles and validates the above, then freezes
//! - [`FisModel`] - the immutable, evaluable model
//!
//! A frozen model never mutates: evaluation is a pure function of
//! (model, inputs), so one model may be evaluated concurrently from any
//! number of threads without synchronization.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

mod variable;
mod rule;
mod builder;
pub mod def;

pub use variable::{FuzzySet, FuzzyVariable, VarRole};
pub use rule::{
    Aggregation, AndOp, Antecedent, AntecedentDef, Consequent, ConsequentDef, Implication, OrOp,
    Proposition, PropositionDef, Rule, RuleBase, RuleDef,
};
pub use builder::{BuildWarning, ModelBuilder};
pub use def::{ModelDef, SetDef, SystemDef, VariableDef};

use crate::defuzz::DefuzzMethod;
use crate::error::FisResult;
use crate::inference::{self, Evaluation};

/// The three inference semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FisType {
    /// Consequents are fuzzy sets, clipped/scaled and aggregated over
    /// the output domain, then defuzzified.
    Mamdani,
    /// Consequents are crisp functions of the inputs; outputs come from
    /// weighted defuzzification of (strength, value) pairs.
    Sugeno,
    /// Consequents are monotonic sets inverted at the firing strength.
    Tsukamoto,
}

impl fmt::Display for FisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FisType::Mamdani => "mamdani",
            FisType::Sugeno => "sugeno",
            FisType::Tsukamoto => "tsukamoto",
        };
        write!(f, "{}", s)
    }
}

/// A frozen, evaluable fuzzy inference system.
///
/// Built once by [`ModelBuilder::build`], evaluated many times.
/// All references inside the rule base are resolved to table indices,
/// so evaluation never does name lookups.
#[derive(Debug, Clone, Serialize)]
pub struct FisModel {
    kind: FisType,
    inputs: IndexMap<String, FuzzyVariable>,
    outputs: IndexMap<String, FuzzyVariable>,
    rule_base: RuleBase,
    defuzz: DefuzzMethod,
    resolution: usize,
}

impl FisModel {
    pub(crate) fn new(
        kind: FisType,
        inputs: IndexMap<String, FuzzyVariable>,
        outputs: IndexMap<String, FuzzyVariable>,
        rule_base: RuleBase,
        defuzz: DefuzzMethod,
        resolution: usize,
    ) -> Self {
        Self {
            kind,
            inputs,
            outputs,
            rule_base,
            defuzz,
            resolution,
        }
    }

    /// Start building a model of the given inference type.
    pub fn builder(kind: FisType) -> ModelBuilder {
        ModelBuilder::new(kind)
    }

    pub fn kind(&self) -> FisType {
        self.kind
    }

    pub fn inputs(&self) -> &IndexMap<String, FuzzyVariable> {
        &self.inputs
    }

    pub fn outputs(&self) -> &IndexMap<String, FuzzyVariable> {
        &self.outputs
    }

    pub fn input_at(&self, index: usize) -> Option<&FuzzyVariable> {
        self.inputs.get_index(index).map(|(_, v)| v)
    }

    pub fn output_at(&self, index: usize) -> Option<&FuzzyVariable> {
        self.outputs.get_index(index).map(|(_, v)| v)
    }

    pub fn rule_base(&self) -> &RuleBase {
        &self.rule_base
    }

    pub fn defuzz(&self) -> DefuzzMethod {
        self.defuzz
    }

    /// Sample count used for Mamdani aggregation and defuzzification.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Evaluate the model against crisp inputs keyed by input name.
    ///
    /// Every declared input must be present (`MissingInput`); unknown
    /// names are rejected (`UnknownInput`). Values are clamped into the
    /// declared domains before fuzzification.
    pub fn evaluate(&self, inputs: &HashMap<String, f64>) -> FisResult<Evaluation> {
        inference::evaluate(self, inputs)
    }

    /// Canonical rule text for every rule, in insertion order.
    /// Reparsing yields an equivalent rule set.
    pub fn rule_texts(&self) -> Vec<String> {
        self.rule_base
            .rules()
            .iter()
            .map(|r| r.render(&self.inputs, &self.outputs))
            .collect()
    }
}

impl fmt::Display for FisModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} FIS: {} inputs, {} outputs, {}",
            self.kind,
            self.inputs.len(),
            self.outputs.len(),
            self.rule_base
        )
    }
}
