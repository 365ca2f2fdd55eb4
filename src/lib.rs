//! fuzzkit - Fuzzy Inference System engine
//!
//! A small interpreter for fuzzy models: it builds a runtime model of
//! fuzzy variables, membership functions and linguistic rules from
//! declarative input, evaluates it under Mamdani, Sugeno or Tsukamoto
//! semantics, and can emit a standalone C evaluation routine.
//!
//! # Architecture
//!
//! - [`membership`] - pure membership function library (closed shape set)
//! - [`model`] - variables, rules, the builder, and the frozen [`FisModel`]
//! - [`parser`] - the textual rule language (`IF x IS a THEN y IS b`)
//! - [`inference`] - the three inference strategies and evaluation results
//! - [`defuzz`] - defuzzification of aggregated sets and weighted pairs
//! - [`codegen`] - C code emission for frozen models
//! - [`config`] - TOML + environment configuration of engine defaults
//! - [`error`] - structured error taxonomy ([`FisError`], [`ErrorCode`])
//!
//! Construction and evaluation are phase-separated: a [`ModelBuilder`]
//! is the only mutable stage, `build()` freezes exactly once, and the
//! frozen model is evaluated read-only. Evaluation allocates a private
//! per-call context, so one model can serve any number of threads
//! concurrently without synchronization.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use fuzzkit::{FisType, ModelBuilder, Shape};
//!
//! let mut b = ModelBuilder::new(FisType::Mamdani);
//! b.add_input("temperature", 0.0, 40.0)?;
//! b.add_output("fan", 0.0, 100.0)?;
//! b.add_set("temperature", "Cold", Shape::Trapezoidal, &[0.0, 0.0, 10.0, 20.0])?;
//! b.add_set("temperature", "Hot", Shape::Trapezoidal, &[20.0, 30.0, 40.0, 40.0])?;
//! b.add_set("fan", "Low", Shape::Triangular, &[0.0, 0.0, 50.0])?;
//! b.add_set("fan", "High", Shape::Triangular, &[50.0, 100.0, 100.0])?;
//! b.add_rule_text("IF temperature IS Cold THEN fan IS Low")?;
//! b.add_rule_text("IF temperature IS Hot THEN fan IS High")?;
//! let model = b.build()?;
//!
//! let result = model.evaluate(&HashMap::from([("temperature".to_string(), 15.0)]))?;
//! println!("fan = {}", result.value("fan").unwrap());
//! ```

pub mod error;
pub mod config;
pub mod membership;
pub mod model;
pub mod parser;
pub mod inference;
pub mod defuzz;
pub mod codegen;

// Re-export the primary types
pub use crate::error::{ErrorCode, FisError, FisResult};
pub use crate::membership::{MembershipFunction, Monotonicity, Shape, TOLERANCE};
pub use crate::model::{
    Aggregation, AndOp, Antecedent, AntecedentDef, BuildWarning, Consequent, ConsequentDef,
    FisModel, FisType, FuzzySet, FuzzyVariable, Implication, ModelBuilder, ModelDef, OrOp,
    Proposition, PropositionDef, Rule, RuleBase, RuleDef, VarRole,
};
pub use crate::parser::{parse_rule, parse_rules, RuleParseError};
pub use crate::inference::{EvalWarning, Evaluation, WarningKind};
pub use crate::defuzz::{AggregatedSet, DefuzzMethod};
pub use crate::config::FisConfig;
