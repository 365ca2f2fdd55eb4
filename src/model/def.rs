//! Declarative model definitions
//!
//! Serde-backed description of a complete FIS, loadable from TOML or
//! JSON. This is the on-disk counterpart of the [`ModelBuilder`] API:
//! variables carry their domain and sets (shape, parameters, optional
//! height), rules are written in the textual rule syntax.
//!
//! ```toml
//! # rules are a root key: in TOML they must precede the first table
//! rules = ["IF temperature IS Cold THEN fan IS Low"]
//!
//! [system]
//! type = "mamdani"
//! defuzzification = "centroid"
//!
//! [[input]]
//! name = "temperature"
//! range = [0.0, 40.0]
//!
//! [[input.set]]
//! name = "Cold"
//! shape = "trapezoidal"
//! params = [0.0, 0.0, 10.0, 20.0]
//!
//! [[output]]
//! name = "fan"
//! range = [0.0, 100.0]
//!
//! [[output.set]]
//! name = "Low"
//! shape = "triangular"
//! params = [0.0, 0.0, 50.0]
//! ```

use serde::{Deserialize, Serialize};

use crate::defuzz::DefuzzMethod;
use crate::error::FisResult;
use crate::membership::Shape;

use super::builder::ModelBuilder;
use super::rule::{Aggregation, AndOp, Implication, OrOp};
use super::{FisModel, FisType};

fn default_height() -> f64 {
    1.0
}

/// One fuzzy set of a variable definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDef {
    pub name: String,
    pub shape: Shape,
    pub params: Vec<f64>,
    #[serde(default = "default_height")]
    pub height: f64,
}

/// One variable definition: name, closed domain, labeled sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    pub range: [f64; 2],
    #[serde(default, rename = "set")]
    pub sets: Vec<SetDef>,
}

/// System-wide settings: inference type, operators, defuzzifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: FisType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defuzzification: Option<DefuzzMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<AndOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<OrOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implication: Option<Implication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
}

/// A complete declarative model definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDef {
    pub system: SystemDef,
    #[serde(default, rename = "input")]
    pub inputs: Vec<VariableDef>,
    #[serde(default, rename = "output")]
    pub outputs: Vec<VariableDef>,
    #[serde(default)]
    pub rules: Vec<String>,
}

impl ModelDef {
    /// Parse a definition from TOML text.
    pub fn from_toml(text: &str) -> FisResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Parse a definition from JSON text.
    pub fn from_json(text: &str) -> FisResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Populate a builder with everything this definition declares.
    pub fn to_builder(&self) -> FisResult<ModelBuilder> {
        let mut b = ModelBuilder::new(self.system.kind);

        if let Some(m) = self.system.defuzzification {
            b.defuzz(m)?;
        }
        if let Some(n) = self.system.resolution {
            b.resolution(n)?;
        }
        if let Some(op) = self.system.and {
            b.and_op(op)?;
        }
        if let Some(op) = self.system.or {
            b.or_op(op)?;
        }
        if let Some(op) = self.system.implication {
            b.implication(op)?;
        }
        if let Some(op) = self.system.aggregation {
            b.aggregation(op)?;
        }

        for var in &self.inputs {
            b.add_input(&var.name, var.range[0], var.range[1])?;
            for set in &var.sets {
                b.add_set_with_height(&var.name, &set.name, set.shape, &set.params, set.height)?;
            }
        }
        for var in &self.outputs {
            b.add_output(&var.name, var.range[0], var.range[1])?;
            for set in &var.sets {
                b.add_set_with_height(&var.name, &set.name, set.shape, &set.params, set.height)?;
            }
        }
        for rule in &self.rules {
            b.add_rule_text(rule)?;
        }

        Ok(b)
    }

    /// Build the frozen model this definition describes.
    pub fn build(&self) -> FisResult<FisModel> {
        self.to_builder()?.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL_TOML: &str = r#"
rules = [
    "IF temperature IS Cold THEN fan IS Low",
    "IF temperature IS Hot THEN fan IS High",
]

[system]
type = "mamdani"
defuzzification = "centroid"
resolution = 100
and = "min"
or = "max"

[[input]]
name = "temperature"
range = [0.0, 40.0]

[[input.set]]
name = "Cold"
shape = "trapezoidal"
params = [0.0, 0.0, 10.0, 20.0]

[[input.set]]
name = "Hot"
shape = "trapezoidal"
params = [20.0, 30.0, 40.0, 40.0]

[[output]]
name = "fan"
range = [0.0, 100.0]

[[output.set]]
name = "Low"
shape = "triangular"
params = [0.0, 0.0, 50.0]

[[output.set]]
name = "High"
shape = "triangular"
params = [50.0, 100.0, 100.0]
"#;

    #[test]
    fn test_toml_round_trip_builds() {
        let def = ModelDef::from_toml(MODEL_TOML).unwrap();
        assert_eq!(def.system.kind, FisType::Mamdani);
        assert_eq!(def.inputs.len(), 1);
        assert_eq!(def.inputs[0].sets.len(), 2);
        assert_eq!(def.rules.len(), 2);

        let model = def.build().unwrap();
        assert_eq!(model.rule_base().len(), 2);
        assert_eq!(model.inputs().len(), 1);
        assert_eq!(model.outputs().len(), 1);
    }

    #[test]
    fn test_json_definition() {
        let json = r#"{
            "system": {"type": "sugeno"},
            "input": [{
                "name": "x", "range": [0.0, 10.0],
                "set": [{"name": "small", "shape": "z_shape", "params": [2.0, 8.0]}]
            }],
            "output": [{
                "name": "y", "range": [0.0, 100.0],
                "set": [{"name": "ten", "shape": "constant", "params": [10.0]}]
            }],
            "rules": ["IF x IS small THEN y IS ten"]
        }"#;
        let def = ModelDef::from_json(json).unwrap();
        let model = def.build().unwrap();
        assert_eq!(model.kind(), FisType::Sugeno);
        assert_eq!(model.defuzz(), DefuzzMethod::WeightedAverage);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = ModelDef::from_toml("system = 3").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidConfigSyntax);
    }

    #[test]
    fn test_set_height_default() {
        let def = ModelDef::from_toml(MODEL_TOML).unwrap();
        assert!((def.inputs[0].sets[0].height - 1.0).abs() < 1e-9);
    }
}
