//! Configuration system for fuzzkit
//!
//! Provides engine defaults loadable from TOML files with environment
//! variable overrides. Configuration only supplies *defaults*: explicit
//! `ModelBuilder` calls and explicit fields in a model definition always
//! win.
//!
//! # Configuration File Locations
//!
//! Searched in order (first found wins):
//! 1. `./fuzzkit.toml` - project-local configuration
//! 2. `~/.config/fuzzkit/config.toml` - user configuration (XDG)
//!
//! # Environment Variables
//!
//! - `FUZZKIT_RESOLUTION` - output-domain sample count
//! - `FUZZKIT_AND` - fuzzy AND operator (`min`, `product`)
//! - `FUZZKIT_OR` - fuzzy OR operator (`max`, `probor`)
//! - `FUZZKIT_IMPLICATION` - Mamdani implication (`min`, `product`)
//! - `FUZZKIT_AGGREGATION` - Mamdani aggregation (`max`, `probor`, `sum`)
//! - `FUZZKIT_DEFUZZ` - defuzzifier (`centroid`, `bisector`, `mom`,
//!   `som`, `lom`, `weighted_average`, `weighted_sum`)
//!
//! # Example Configuration
//!
//! ```toml
//! # fuzzkit.toml
//!
//! [engine]
//! resolution = 200
//!
//! [defaults]
//! and = "product"
//! or = "probor"
//! defuzzification = "bisector"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::defuzz::DefuzzMethod;
use crate::error::{ErrorCode, FisError, FisResult};
use crate::model::{Aggregation, AndOp, Implication, ModelBuilder, OrOp};

/// Engine-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output-domain sample count for Mamdani aggregation.
    pub resolution: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { resolution: 100 }
    }
}

/// Default operator and defuzzifier selections applied to builders.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DefaultsConfig {
    pub and: AndOp,
    pub or: OrOp,
    pub implication: Implication,
    pub aggregation: Aggregation,
    /// When unset, the per-type default applies (centroid for Mamdani,
    /// weighted-average otherwise).
    pub defuzzification: Option<DefuzzMethod>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FisConfig {
    pub engine: EngineConfig,
    pub defaults: DefaultsConfig,
}

impl FisConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> FisResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> FisResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            FisError::from(e).with_context("path", path.display().to_string())
        })?;
        Self::from_toml(&text)
    }

    /// Load configuration from the standard locations, then apply
    /// environment overrides. Missing files are not an error.
    pub fn load() -> FisResult<Self> {
        let mut config = Self::default();
        for path in Self::search_paths() {
            if path.is_file() {
                config = Self::from_file(&path)?;
                break;
            }
        }
        config.apply_env()?;
        Ok(config)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("fuzzkit.toml")];
        if let Ok(home) = env::var("HOME") {
            paths.push(PathBuf::from(home).join(".config/fuzzkit/config.toml"));
        }
        paths
    }

    /// Override settings from `FUZZKIT_*` environment variables.
    pub fn apply_env(&mut self) -> FisResult<()> {
        if let Ok(v) = env::var("FUZZKIT_RESOLUTION") {
            self.engine.resolution = v.parse().map_err(|_| {
                FisError::new(
                    ErrorCode::InvalidConfigValue,
                    format!("FUZZKIT_RESOLUTION: '{}' is not a sample count", v),
                )
            })?;
        }
        if let Ok(v) = env::var("FUZZKIT_AND") {
            self.defaults.and = parse_enum("FUZZKIT_AND", &v)?;
        }
        if let Ok(v) = env::var("FUZZKIT_OR") {
            self.defaults.or = parse_enum("FUZZKIT_OR", &v)?;
        }
        if let Ok(v) = env::var("FUZZKIT_IMPLICATION") {
            self.defaults.implication = parse_enum("FUZZKIT_IMPLICATION", &v)?;
        }
        if let Ok(v) = env::var("FUZZKIT_AGGREGATION") {
            self.defaults.aggregation = parse_enum("FUZZKIT_AGGREGATION", &v)?;
        }
        if let Ok(v) = env::var("FUZZKIT_DEFUZZ") {
            self.defaults.defuzzification = Some(parse_enum("FUZZKIT_DEFUZZ", &v)?);
        }
        Ok(())
    }

    /// Apply these settings as defaults on a fresh builder.
    pub fn configure(&self, builder: &mut ModelBuilder) -> FisResult<()> {
        builder.resolution(self.engine.resolution)?;
        builder.and_op(self.defaults.and)?;
        builder.or_op(self.defaults.or)?;
        builder.implication(self.defaults.implication)?;
        builder.aggregation(self.defaults.aggregation)?;
        if let Some(m) = self.defaults.defuzzification {
            builder.defuzz(m)?;
        }
        Ok(())
    }
}

/// Parse a lowercase enum token via its serde representation.
fn parse_enum<T: DeserializeOwned>(var: &str, value: &str) -> FisResult<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|_| {
        FisError::new(
            ErrorCode::InvalidConfigValue,
            format!("{}: unknown value '{}'", var, value),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = FisConfig::default();
        assert_eq!(c.engine.resolution, 100);
        assert_eq!(c.defaults.and, AndOp::Min);
        assert_eq!(c.defaults.or, OrOp::Max);
        assert!(c.defaults.defuzzification.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let c = FisConfig::from_toml(
            r#"
            [engine]
            resolution = 250

            [defaults]
            and = "product"
            or = "probor"
            defuzzification = "bisector"
            "#,
        )
        .unwrap();
        assert_eq!(c.engine.resolution, 250);
        assert_eq!(c.defaults.and, AndOp::Product);
        assert_eq!(c.defaults.or, OrOp::Probor);
        assert_eq!(c.defaults.defuzzification, Some(DefuzzMethod::Bisector));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c = FisConfig::from_toml("[defaults]\nand = \"product\"\n").unwrap();
        assert_eq!(c.engine.resolution, 100);
        assert_eq!(c.defaults.and, AndOp::Product);
        assert_eq!(c.defaults.or, OrOp::Max);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(FisConfig::from_toml("[defaults]\nand = \"fancy\"\n").is_err());
    }

    #[test]
    fn test_parse_enum_helper() {
        let op: AndOp = parse_enum("X", "product").unwrap();
        assert_eq!(op, AndOp::Product);
        let m: DefuzzMethod = parse_enum("X", "mom").unwrap();
        assert_eq!(m, DefuzzMethod::MeanOfMaximum);
        assert!(parse_enum::<AndOp>("X", "nope").is_err());
    }

    #[test]
    fn test_configure_builder() {
        use crate::membership::Shape;
        use crate::model::FisType;

        let c = FisConfig::from_toml(
            r#"
            [engine]
            resolution = 40

            [defaults]
            and = "product"
            "#,
        )
        .unwrap();

        let mut b = ModelBuilder::new(FisType::Mamdani);
        c.configure(&mut b).unwrap();
        b.add_input("x", 0.0, 1.0).unwrap();
        b.add_output("y", 0.0, 1.0).unwrap();
        b.add_set("x", "on", Shape::LinearS, &[0.0, 1.0]).unwrap();
        b.add_set("y", "on", Shape::LinearS, &[0.0, 1.0]).unwrap();
        b.add_rule_text("IF x IS on THEN y IS on").unwrap();
        let model = b.build().unwrap();
        assert_eq!(model.resolution(), 40);
        assert_eq!(model.rule_base().and_op(), AndOp::Product);
    }
}
