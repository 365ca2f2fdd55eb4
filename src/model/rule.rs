//! Rules, antecedent expression trees, and the rule base
//!
//! Two parallel representations exist:
//!
//! - *Definitions* ([`RuleDef`], [`AntecedentDef`], ...) name variables
//!   and sets by string. The rule-text parser and the declarative model
//!   format produce these.
//! - *Resolved* forms ([`Rule`], [`Antecedent`], [`Proposition`]) index
//!   directly into the frozen model's variable and set tables. The
//!   builder resolves definitions at `build()`, rejecting unknown names
//!   with `UnresolvedReference`.
//!
//! Antecedents are binary trees over propositions joined by AND/OR, with
//! NOT applied at leaves. Trees are built bottom-up from parsed or
//! structured input, so no cycles are possible.

use std::fmt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::variable::FuzzyVariable;

// ============================================================================
// Fuzzy operators
// ============================================================================

/// Fuzzy AND (t-norm), applied uniformly across a rule base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AndOp {
    #[default]
    Min,
    Product,
}

impl AndOp {
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        let y = match self {
            AndOp::Min => a.min(b),
            AndOp::Product => a * b,
        };
        y.clamp(0.0, 1.0)
    }
}

/// Fuzzy OR (t-conorm), applied uniformly across a rule base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrOp {
    #[default]
    Max,
    /// Probabilistic sum: a + b - a*b
    Probor,
}

impl OrOp {
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        let y = match self {
            OrOp::Max => a.max(b),
            OrOp::Probor => a + b - a * b,
        };
        y.clamp(0.0, 1.0)
    }
}

/// Mamdani implication: how a firing strength shapes the consequent set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Implication {
    /// Clip the consequent at the firing strength
    #[default]
    Min,
    /// Scale the consequent by the firing strength
    Product,
}

impl Implication {
    pub fn apply(&self, w: f64, v: f64) -> f64 {
        let y = match self {
            Implication::Min => w.min(v),
            Implication::Product => w * v,
        };
        y.clamp(0.0, 1.0)
    }
}

/// Mamdani aggregation: how clipped consequents combine per output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Max,
    /// Probabilistic sum: a + b - a*b
    Probor,
    /// Bounded sum: min(a + b, 1)
    Sum,
}

impl Aggregation {
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        let y = match self {
            Aggregation::Max => a.max(b),
            Aggregation::Probor => a + b - a * b,
            Aggregation::Sum => a + b,
        };
        y.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Definition forms (name-based, pre-resolution)
// ============================================================================

/// `variable IS [NOT] set`, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropositionDef {
    pub variable: String,
    pub set: String,
    pub negated: bool,
}

/// Antecedent expression tree over name-based propositions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AntecedentDef {
    Prop(PropositionDef),
    And(Box<AntecedentDef>, Box<AntecedentDef>),
    Or(Box<AntecedentDef>, Box<AntecedentDef>),
}

impl AntecedentDef {
    pub fn prop(variable: impl Into<String>, set: impl Into<String>) -> Self {
        AntecedentDef::Prop(PropositionDef {
            variable: variable.into(),
            set: set.into(),
            negated: false,
        })
    }

    pub fn not_prop(variable: impl Into<String>, set: impl Into<String>) -> Self {
        AntecedentDef::Prop(PropositionDef {
            variable: variable.into(),
            set: set.into(),
            negated: true,
        })
    }

    pub fn and(self, other: AntecedentDef) -> Self {
        AntecedentDef::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: AntecedentDef) -> Self {
        AntecedentDef::Or(Box::new(self), Box::new(other))
    }
}

/// `THEN variable IS [NOT] set`, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsequentDef {
    pub variable: String,
    pub set: String,
    pub negated: bool,
}

/// A complete rule definition: antecedent tree, one or more consequents,
/// and a weight in [0,1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDef {
    pub antecedent: AntecedentDef,
    pub consequents: Vec<ConsequentDef>,
    pub weight: f64,
}

impl RuleDef {
    pub fn new(antecedent: AntecedentDef, consequents: Vec<ConsequentDef>) -> Self {
        Self {
            antecedent,
            consequents,
            weight: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

// ============================================================================
// Resolved forms (index-based, frozen)
// ============================================================================

/// A resolved proposition: indices into the model's input table and the
/// variable's set table, plus the NOT flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposition {
    pub var: usize,
    pub set: usize,
    pub negated: bool,
}

/// A resolved antecedent expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Antecedent {
    Prop(Proposition),
    And(Box<Antecedent>, Box<Antecedent>),
    Or(Box<Antecedent>, Box<Antecedent>),
}

impl Antecedent {
    /// Recursive fold: AND/OR combine child degrees with the rule base
    /// operators, NOT complements the leaf degree. `lookup` returns the
    /// non-negated membership degree for a proposition (letting callers
    /// cache per-proposition fuzzification).
    pub fn eval(&self, and_op: AndOp, or_op: OrOp, lookup: &mut impl FnMut(Proposition) -> f64) -> f64 {
        match self {
            Antecedent::Prop(p) => {
                let mu = lookup(*p).clamp(0.0, 1.0);
                if p.negated {
                    1.0 - mu
                } else {
                    mu
                }
            }
            Antecedent::And(l, r) => {
                and_op.apply(l.eval(and_op, or_op, lookup), r.eval(and_op, or_op, lookup))
            }
            Antecedent::Or(l, r) => {
                or_op.apply(l.eval(and_op, or_op, lookup), r.eval(and_op, or_op, lookup))
            }
        }
    }

    /// Collect every proposition in the tree, left to right.
    pub fn propositions(&self) -> Vec<Proposition> {
        fn walk(node: &Antecedent, out: &mut Vec<Proposition>) {
            match node {
                Antecedent::Prop(p) => out.push(*p),
                Antecedent::And(l, r) | Antecedent::Or(l, r) => {
                    walk(l, out);
                    walk(r, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    fn render(&self, inputs: &IndexMap<String, FuzzyVariable>, f: &mut String) {
        match self {
            Antecedent::Prop(p) => {
                let var = inputs.get_index(p.var).map(|(n, _)| n.as_str()).unwrap_or("?");
                let set = inputs
                    .get_index(p.var)
                    .and_then(|(_, v)| v.set_at(p.set))
                    .map(|s| s.name())
                    .unwrap_or("?");
                f.push_str(var);
                f.push_str(if p.negated { " IS NOT " } else { " IS " });
                f.push_str(set);
            }
            Antecedent::And(l, r) => {
                render_child(l, inputs, f);
                f.push_str(" AND ");
                render_child(r, inputs, f);
            }
            Antecedent::Or(l, r) => {
                render_child(l, inputs, f);
                f.push_str(" OR ");
                render_child(r, inputs, f);
            }
        }

        fn render_child(
            node: &Antecedent,
            inputs: &IndexMap<String, FuzzyVariable>,
            f: &mut String,
        ) {
            // compound children are parenthesized so the canonical text
            // reparses to the identical tree
            if matches!(node, Antecedent::Prop(_)) {
                node.render(inputs, f);
            } else {
                f.push('(');
                node.render(inputs, f);
                f.push(')');
            }
        }
    }
}

/// A resolved consequent: indices into the output table and its set
/// table. The NOT flag complements the activated membership (Mamdani
/// only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consequent {
    pub var: usize,
    pub set: usize,
    pub negated: bool,
}

/// A resolved rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub antecedent: Antecedent,
    pub consequents: Vec<Consequent>,
    pub weight: f64,
}

impl Rule {
    /// Canonical rule text. Reparsing the result yields an equivalent
    /// rule: same propositions, same consequents, same weight.
    pub fn render(
        &self,
        inputs: &IndexMap<String, FuzzyVariable>,
        outputs: &IndexMap<String, FuzzyVariable>,
    ) -> String {
        let mut s = String::from("IF ");
        self.antecedent.render(inputs, &mut s);
        s.push_str(" THEN ");
        for (i, c) in self.consequents.iter().enumerate() {
            if i > 0 {
                s.push_str(" AND ");
            }
            let var = outputs.get_index(c.var).map(|(n, _)| n.as_str()).unwrap_or("?");
            let set = outputs
                .get_index(c.var)
                .and_then(|(_, v)| v.set_at(c.set))
                .map(|s| s.name())
                .unwrap_or("?");
            s.push_str(var);
            s.push_str(if c.negated { " IS NOT " } else { " IS " });
            s.push_str(set);
        }
        if (self.weight - 1.0).abs() > f64::EPSILON {
            s.push_str(&format!(" WITH {}", self.weight));
        }
        s
    }
}

// ============================================================================
// Rule base
// ============================================================================

/// Ordered rule collection plus the operator configuration applied
/// uniformly to every rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleBase {
    rules: Vec<Rule>,
    and_op: AndOp,
    or_op: OrOp,
    implication: Implication,
    aggregation: Aggregation,
}

impl RuleBase {
    pub(crate) fn new(
        rules: Vec<Rule>,
        and_op: AndOp,
        or_op: OrOp,
        implication: Implication,
        aggregation: Aggregation,
    ) -> Self {
        Self {
            rules,
            and_op,
            or_op,
            implication,
            aggregation,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn and_op(&self) -> AndOp {
        self.and_op
    }

    pub fn or_op(&self) -> OrOp {
        self.or_op
    }

    pub fn implication(&self) -> Implication {
        self.implication
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }
}

impl fmt::Display for RuleBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rules (AND={:?}, OR={:?})",
            self.rules.len(),
            self.and_op,
            self.or_op
        )
    }
}
