//! Per-call evaluation state
//!
//! An [`EvaluationContext`] is created fresh for every evaluation call
//! and destroyed with it: clamped crisp inputs, the per-proposition
//! fuzzification cache, rule firing strengths, and any non-fatal
//! warnings. Nothing here outlives the call or is shared across calls,
//! which is what makes concurrent evaluation of one frozen model safe.

use std::collections::HashMap;

use fnv::FnvHashMap;
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{ErrorCode, FisError, FisResult};
use crate::model::{FisModel, Proposition};

/// Non-fatal diagnostic kinds attached to an evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Every rule fired at zero strength for this output; the crisp
    /// value fell back to the domain midpoint.
    NoRuleFired,
}

/// A non-fatal diagnostic produced during evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct EvalWarning {
    pub kind: WarningKind,
    pub output: String,
    pub message: String,
}

/// The result of one evaluation call: crisp outputs keyed by output
/// name (in declaration order) plus non-fatal warnings.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    outputs: IndexMap<String, f64>,
    warnings: Vec<EvalWarning>,
}

impl Evaluation {
    pub(crate) fn new(outputs: IndexMap<String, f64>, warnings: Vec<EvalWarning>) -> Self {
        Self { outputs, warnings }
    }

    pub fn outputs(&self) -> &IndexMap<String, f64> {
        &self.outputs
    }

    /// Crisp value of one output.
    pub fn value(&self, output: &str) -> Option<f64> {
        self.outputs.get(output).copied()
    }

    pub fn warnings(&self) -> &[EvalWarning] {
        &self.warnings
    }

    /// Whether at least one rule fired for every output.
    pub fn all_rules_fired(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::NoRuleFired)
    }
}

/// Transient state private to one evaluation call.
#[derive(Debug)]
pub(crate) struct EvaluationContext<'m> {
    model: &'m FisModel,
    /// Crisp inputs clamped into their domains, by input index.
    inputs: Vec<f64>,
    /// Fuzzified degree per (input, set), computed once per call.
    cache: FnvHashMap<(usize, usize), f64>,
    /// Firing strength per rule, in rule order.
    strengths: Vec<f64>,
    warnings: Vec<EvalWarning>,
}

impl<'m> EvaluationContext<'m> {
    pub fn new(model: &'m FisModel, values: &HashMap<String, f64>) -> FisResult<Self> {
        for name in values.keys() {
            if !model.inputs().contains_key(name) {
                return Err(FisError::new(
                    ErrorCode::UnknownInput,
                    format!("'{}' is not an input of this model", name),
                ));
            }
        }

        let mut inputs = Vec::with_capacity(model.inputs().len());
        for (name, var) in model.inputs() {
            let v = values
                .get(name)
                .copied()
                .ok_or_else(|| FisError::missing_input(name))?;
            if !v.is_finite() {
                return Err(FisError::new(
                    ErrorCode::EvaluationError,
                    format!("input '{}' is not a finite number", name),
                ));
            }
            inputs.push(var.clamp(v));
        }

        Ok(Self {
            model,
            inputs,
            cache: FnvHashMap::default(),
            strengths: Vec::new(),
            warnings: Vec::new(),
        })
    }

    /// Clamped crisp input vector, by input index.
    pub fn inputs(&self) -> &[f64] {
        &self.inputs
    }

    /// Firing strength of a rule (after weighting).
    pub fn strength(&self, rule: usize) -> f64 {
        self.strengths[rule]
    }

    /// Fuzzify and fold every rule antecedent. Membership of each crisp
    /// input in each referenced set is computed once and cached, so
    /// rules sharing a proposition do not recompute it.
    pub fn compute_strengths(&mut self) {
        let model = self.model;
        let rb = model.rule_base();
        let (and_op, or_op) = (rb.and_op(), rb.or_op());

        let mut strengths = Vec::with_capacity(rb.len());
        for rule in rb.rules() {
            let cache = &mut self.cache;
            let inputs = &self.inputs;
            let mut lookup = |p: Proposition| -> f64 {
                *cache.entry((p.var, p.set)).or_insert_with(|| {
                    model
                        .input_at(p.var)
                        .and_then(|v| v.set_at(p.set).map(|s| s.membership(inputs[p.var])))
                        .unwrap_or(0.0)
                })
            };
            let strength = rule.antecedent.eval(and_op, or_op, &mut lookup) * rule.weight;
            strengths.push(strength.clamp(0.0, 1.0));
        }
        self.strengths = strengths;
    }

    pub fn warn_no_rule_fired(&mut self, output: &str) {
        self.warnings.push(EvalWarning {
            kind: WarningKind::NoRuleFired,
            output: output.to_string(),
            message: format!(
                "no rule fired for '{}'; falling back to the domain midpoint",
                output
            ),
        });
    }

    pub fn take_warnings(&mut self) -> Vec<EvalWarning> {
        std::mem::take(&mut self.warnings)
    }

    #[cfg(test)]
    pub fn cached_propositions(&self) -> usize {
        self.cache.len()
    }
}
