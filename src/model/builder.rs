//! Model builder
//!
//! Assembles fuzzy variables and rules from declarative definitions into
//! an immutable [`FisModel`]. The builder is the single mutable phase of
//! the model lifecycle: `build()` validates every cross-reference,
//! resolves rule definitions against the variable/set namespace, and
//! freezes the result. Any mutation attempted afterwards fails with
//! `ModelAlreadyFrozen`.
//!
//! Builder operations are not thread-safe; construction is expected to
//! happen on one thread (or behind external synchronization). The frozen
//! model it produces is freely shareable.

use indexmap::IndexMap;

use crate::defuzz::DefuzzMethod;
use crate::error::{ErrorCode, FisError, FisResult};
use crate::membership::{MembershipFunction, Shape};
use crate::parser;

use super::rule::{
    Aggregation, AndOp, Antecedent, AntecedentDef, Consequent, ConsequentDef, Implication, OrOp,
    Proposition, Rule, RuleBase, RuleDef,
};
use super::variable::{FuzzySet, FuzzyVariable, VarRole};
use super::{FisModel, FisType};

/// Default sample count for Mamdani aggregation.
pub const DEFAULT_RESOLUTION: usize = 100;
/// Minimum accepted sample count.
pub const MIN_RESOLUTION: usize = 20;

/// A non-fatal diagnostic collected while building.
#[derive(Debug, Clone)]
pub struct BuildWarning {
    pub code: ErrorCode,
    pub message: String,
}

/// Assembles a [`FisModel`] from variables, sets and rules.
#[derive(Debug)]
pub struct ModelBuilder {
    kind: FisType,
    inputs: IndexMap<String, FuzzyVariable>,
    outputs: IndexMap<String, FuzzyVariable>,
    rules: Vec<RuleDef>,
    and_op: AndOp,
    or_op: OrOp,
    implication: Implication,
    aggregation: Aggregation,
    defuzz: Option<DefuzzMethod>,
    resolution: usize,
    warnings: Vec<BuildWarning>,
    frozen: bool,
}

impl ModelBuilder {
    pub fn new(kind: FisType) -> Self {
        Self {
            kind,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            rules: Vec::new(),
            and_op: AndOp::default(),
            or_op: OrOp::default(),
            implication: Implication::default(),
            aggregation: Aggregation::default(),
            defuzz: None,
            resolution: DEFAULT_RESOLUTION,
            warnings: Vec::new(),
            frozen: false,
        }
    }

    fn ensure_mutable(&self, operation: &str) -> FisResult<()> {
        if self.frozen {
            Err(FisError::frozen(operation))
        } else {
            Ok(())
        }
    }

    /// Declare an input variable over the closed domain [min, max].
    pub fn add_input(
        &mut self,
        name: impl Into<String>,
        min: f64,
        max: f64,
    ) -> FisResult<&mut Self> {
        self.ensure_mutable("add input")?;
        let name = name.into();
        if self.inputs.contains_key(&name) || self.outputs.contains_key(&name) {
            return Err(FisError::duplicate_variable(&name));
        }
        let var = FuzzyVariable::new(name.clone(), min, max, VarRole::Input)?;
        self.inputs.insert(name, var);
        Ok(self)
    }

    /// Declare an output variable over the closed domain [min, max].
    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        min: f64,
        max: f64,
    ) -> FisResult<&mut Self> {
        self.ensure_mutable("add output")?;
        let name = name.into();
        if self.inputs.contains_key(&name) || self.outputs.contains_key(&name) {
            return Err(FisError::duplicate_variable(&name));
        }
        let var = FuzzyVariable::new(name.clone(), min, max, VarRole::Output)?;
        self.outputs.insert(name, var);
        Ok(self)
    }

    /// Add a fuzzy set (height 1) to a declared variable.
    pub fn add_set(
        &mut self,
        variable: &str,
        set: &str,
        shape: Shape,
        params: &[f64],
    ) -> FisResult<&mut Self> {
        self.add_set_with_height(variable, set, shape, params, 1.0)
    }

    /// Add a fuzzy set with an explicit height in (0,1].
    ///
    /// A set whose bounded support lies entirely outside the variable's
    /// domain is accepted (edge saturation is legal) but recorded as a
    /// `RangeViolation` build warning.
    pub fn add_set_with_height(
        &mut self,
        variable: &str,
        set: &str,
        shape: Shape,
        params: &[f64],
        height: f64,
    ) -> FisResult<&mut Self> {
        self.ensure_mutable("add set")?;
        let mf = MembershipFunction::with_height(shape, params, height)?;

        let var = self
            .inputs
            .get_mut(variable)
            .or_else(|| self.outputs.get_mut(variable))
            .ok_or_else(|| FisError::unresolved("variable", variable))?;

        if shape == Shape::Linear && var.role() == VarRole::Input {
            return Err(FisError::invalid_parameters(
                "linear sets are Sugeno consequents and cannot label an input",
            )
            .with_context("variable", variable));
        }

        if let Some((lo, hi)) = mf.support() {
            let (vmin, vmax) = var.range();
            if hi < vmin || lo > vmax {
                self.warnings.push(BuildWarning {
                    code: ErrorCode::RangeViolation,
                    message: format!(
                        "set '{}' of '{}' has support [{}, {}] outside domain [{}, {}]",
                        set, variable, lo, hi, vmin, vmax
                    ),
                });
            }
        }

        var.insert_set(FuzzySet::new(set, mf))?;
        Ok(self)
    }

    /// Add a structured rule definition.
    pub fn add_rule(&mut self, rule: RuleDef) -> FisResult<&mut Self> {
        self.ensure_mutable("add rule")?;
        self.rules.push(rule);
        Ok(self)
    }

    /// Parse and add a rule in the textual syntax.
    pub fn add_rule_text(&mut self, text: &str) -> FisResult<&mut Self> {
        self.ensure_mutable("add rule")?;
        let rule = parser::parse_rule(text).map_err(FisError::from)?;
        self.rules.push(rule);
        Ok(self)
    }

    /// Select the fuzzy AND operator (default: min).
    pub fn and_op(&mut self, op: AndOp) -> FisResult<&mut Self> {
        self.ensure_mutable("set AND operator")?;
        self.and_op = op;
        Ok(self)
    }

    /// Select the fuzzy OR operator (default: max).
    pub fn or_op(&mut self, op: OrOp) -> FisResult<&mut Self> {
        self.ensure_mutable("set OR operator")?;
        self.or_op = op;
        Ok(self)
    }

    /// Select the Mamdani implication operator (default: min).
    pub fn implication(&mut self, op: Implication) -> FisResult<&mut Self> {
        self.ensure_mutable("set implication")?;
        self.implication = op;
        Ok(self)
    }

    /// Select the Mamdani aggregation operator (default: max).
    pub fn aggregation(&mut self, op: Aggregation) -> FisResult<&mut Self> {
        self.ensure_mutable("set aggregation")?;
        self.aggregation = op;
        Ok(self)
    }

    /// Select the defuzzification method. Defaults to centroid for
    /// Mamdani and weighted-average for Sugeno/Tsukamoto.
    pub fn defuzz(&mut self, method: DefuzzMethod) -> FisResult<&mut Self> {
        self.ensure_mutable("set defuzzifier")?;
        self.defuzz = Some(method);
        Ok(self)
    }

    /// Set the output-domain sample count (minimum 20).
    pub fn resolution(&mut self, n: usize) -> FisResult<&mut Self> {
        self.ensure_mutable("set resolution")?;
        crate::fis_ensure!(
            n >= MIN_RESOLUTION,
            ErrorCode::InvalidParameters,
            "resolution {} below minimum {}",
            n,
            MIN_RESOLUTION
        );
        self.resolution = n;
        Ok(self)
    }

    /// Non-fatal diagnostics collected so far.
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Validate all cross-references, resolve rules, and freeze.
    ///
    /// Fails with a build error (and leaves nothing half-frozen) when a
    /// reference cannot be resolved or a consequent is invalid for the
    /// inference type. After a successful build the builder refuses
    /// further mutation with `ModelAlreadyFrozen`.
    pub fn build(&mut self) -> FisResult<FisModel> {
        self.ensure_mutable("build")?;

        if self.inputs.is_empty() || self.outputs.is_empty() || self.rules.is_empty() {
            return Err(FisError::new(
                ErrorCode::EmptyModel,
                "a model needs at least one input, one output and one rule",
            ));
        }

        let defuzz = self.defuzz.unwrap_or(match self.kind {
            FisType::Mamdani => DefuzzMethod::Centroid,
            _ => DefuzzMethod::WeightedAverage,
        });
        self.validate_defuzz(defuzz)?;

        let defs = self.rules.clone();
        let mut rules = Vec::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            let rule = self
                .resolve_rule(def)
                .map_err(|e| e.with_context("rule", (i + 1).to_string()))?;
            rules.push(rule);
        }

        // validate weighted-Mamdani restriction against resolved rules
        if self.kind == FisType::Mamdani && defuzz.is_weighted() {
            for (i, rule) in rules.iter().enumerate() {
                for c in &rule.consequents {
                    let set = self.output_set(c.var, c.set);
                    if c.negated || !set.mf().is_singleton_like() {
                        return Err(FisError::new(
                            ErrorCode::IncompatibleDefuzzifier,
                            format!(
                                "weighted defuzzification under Mamdani needs singleton-like \
                                 consequents; rule {} activates '{}'",
                                i + 1,
                                set.name()
                            ),
                        ));
                    }
                }
            }
        }

        self.frozen = true;
        Ok(FisModel::new(
            self.kind,
            self.inputs.clone(),
            self.outputs.clone(),
            RuleBase::new(
                rules,
                self.and_op,
                self.or_op,
                self.implication,
                self.aggregation,
            ),
            defuzz,
            self.resolution,
        ))
    }

    fn output_set(&self, var: usize, set: usize) -> &FuzzySet {
        // only called with indices this builder just resolved
        self.outputs
            .get_index(var)
            .and_then(|(_, v)| v.set_at(set))
            .expect("resolved consequent index")
    }

    fn validate_defuzz(&self, method: DefuzzMethod) -> FisResult<()> {
        let ok = match self.kind {
            // the weighted/singleton restriction is checked per-rule in build()
            FisType::Mamdani => true,
            FisType::Sugeno | FisType::Tsukamoto => method.is_weighted(),
        };
        if ok {
            Ok(())
        } else {
            Err(FisError::new(
                ErrorCode::IncompatibleDefuzzifier,
                format!(
                    "defuzzifier '{}' is not valid for a {} system",
                    method.name(),
                    self.kind
                ),
            )
            .with_hint("Sugeno/Tsukamoto use weighted_average or weighted_sum"))
        }
    }

    fn resolve_rule(&mut self, def: &RuleDef) -> FisResult<Rule> {
        let antecedent = self.resolve_antecedent(&def.antecedent)?;
        let mut consequents = Vec::with_capacity(def.consequents.len());
        for c in &def.consequents {
            consequents.push(self.resolve_consequent(c)?);
        }

        let mut weight = def.weight;
        if !(0.0..=1.0).contains(&weight) || !weight.is_finite() {
            let clamped = if weight.is_finite() { weight.clamp(0.0, 1.0) } else { 1.0 };
            self.warnings.push(BuildWarning {
                code: ErrorCode::InvalidWeight,
                message: format!("rule weight {} clamped to {}", weight, clamped),
            });
            weight = clamped;
        }

        Ok(Rule {
            antecedent,
            consequents,
            weight,
        })
    }

    fn resolve_antecedent(&self, def: &AntecedentDef) -> FisResult<Antecedent> {
        match def {
            AntecedentDef::Prop(p) => {
                let (var_idx, var) = self
                    .inputs
                    .get_full(&p.variable)
                    .map(|(i, _, v)| (i, v))
                    .ok_or_else(|| {
                        if self.outputs.contains_key(&p.variable) {
                            FisError::unresolved("input variable", &p.variable)
                                .with_hint("antecedents may only reference inputs")
                        } else {
                            FisError::unresolved("input variable", &p.variable)
                        }
                    })?;
                let set_idx = var
                    .set_index(&p.set)
                    .ok_or_else(|| {
                        FisError::unresolved("set", &p.set).with_context("variable", &p.variable)
                    })?;
                Ok(Antecedent::Prop(Proposition {
                    var: var_idx,
                    set: set_idx,
                    negated: p.negated,
                }))
            }
            AntecedentDef::And(l, r) => Ok(Antecedent::And(
                Box::new(self.resolve_antecedent(l)?),
                Box::new(self.resolve_antecedent(r)?),
            )),
            AntecedentDef::Or(l, r) => Ok(Antecedent::Or(
                Box::new(self.resolve_antecedent(l)?),
                Box::new(self.resolve_antecedent(r)?),
            )),
        }
    }

    fn resolve_consequent(&self, def: &ConsequentDef) -> FisResult<Consequent> {
        let (var_idx, var) = self
            .outputs
            .get_full(&def.variable)
            .map(|(i, _, v)| (i, v))
            .ok_or_else(|| {
                if self.inputs.contains_key(&def.variable) {
                    FisError::unresolved("output variable", &def.variable)
                        .with_hint("consequents may only reference outputs")
                } else {
                    FisError::unresolved("output variable", &def.variable)
                }
            })?;
        let set_idx = var.set_index(&def.set).ok_or_else(|| {
            FisError::unresolved("set", &def.set).with_context("variable", &def.variable)
        })?;
        let set = var.set_at(set_idx).expect("index from set_index");
        let shape = set.mf().shape();

        match self.kind {
            FisType::Mamdani => {
                if shape == Shape::Linear {
                    return Err(FisError::invalid_parameters(format!(
                        "linear consequent '{}' is only valid in Sugeno systems",
                        def.set
                    )));
                }
            }
            FisType::Sugeno => {
                if !shape.is_crisp() {
                    return Err(FisError::invalid_parameters(format!(
                        "Sugeno consequent '{}' must be constant or linear, got '{}'",
                        def.set, shape
                    )));
                }
                if shape == Shape::Linear && set.mf().params().len() != self.inputs.len() + 1 {
                    return Err(FisError::invalid_parameters(format!(
                        "linear consequent '{}' needs {} coefficients (one per input plus offset), got {}",
                        def.set,
                        self.inputs.len() + 1,
                        set.mf().params().len()
                    )));
                }
                if def.negated {
                    return Err(FisError::invalid_parameters(
                        "a crisp Sugeno consequent cannot be negated",
                    ));
                }
            }
            FisType::Tsukamoto => {
                if set.mf().monotonicity().is_none() {
                    return Err(FisError::non_monotonic(&def.variable, &def.set));
                }
                if def.negated {
                    return Err(FisError::invalid_parameters(
                        "a Tsukamoto consequent cannot be negated",
                    ));
                }
            }
        }

        Ok(Consequent {
            var: var_idx,
            set: set_idx,
            negated: def.negated,
        })
    }
}
