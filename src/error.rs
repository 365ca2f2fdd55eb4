//! Structured error handling for fuzzkit
//!
//! Provides a unified error type hierarchy with:
//! - Error codes for programmatic handling
//! - Structured error payloads (JSON-friendly)
//! - Context preservation through error chains
//! - A build-time / evaluation-time split matching the model lifecycle
//!
//! # Error Categories
//!
//! - Build errors (1xxx) - raised while assembling a model; they prevent
//!   the model from freezing
//! - Evaluation errors (2xxx) - raised during a single evaluation call;
//!   the model and any concurrent evaluations are unaffected
//! - Parse errors (3xxx) - syntax errors in the textual rule language
//! - Config errors (4xxx) - configuration file / environment issues
//! - Internal errors (9xxx)
//!
//! # Example
//!
//! ```rust,ignore
//! use fuzzkit::error::{FisError, ErrorCode};
//!
//! fn check_weight(w: f64) -> Result<(), FisError> {
//!     if !(0.0..=1.0).contains(&w) {
//!         return Err(FisError::invalid_parameters("rule weight outside [0,1]")
//!             .with_context("weight", w.to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use serde::{Deserialize, Serialize};

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Build errors (1xxx)
    /// Generic build error
    BuildError = 1000,
    /// Bad shape/parameter combination for a membership function
    InvalidParameters = 1001,
    /// Set name collides within a variable
    DuplicateSetName = 1002,
    /// A set's support lies entirely outside the variable domain
    RangeViolation = 1003,
    /// A rule names an unknown variable or set
    UnresolvedReference = 1004,
    /// Mutation attempted after the model was frozen
    ModelAlreadyFrozen = 1005,
    /// Variable name collides within the model
    DuplicateVariableName = 1006,
    /// Defuzzification method not valid for the inference type
    IncompatibleDefuzzifier = 1007,
    /// Model has no inputs, outputs or rules
    EmptyModel = 1008,

    // Evaluation errors (2xxx)
    /// Generic evaluation error
    EvaluationError = 2000,
    /// A declared input variable has no crisp value
    MissingInput = 2001,
    /// Tsukamoto consequent set is not monotonic
    NonMonotonicConsequent = 2002,
    /// A supplied input name is not declared on the model
    UnknownInput = 2003,

    // Parse errors (3xxx)
    /// Syntax error in the rule language
    RuleSyntaxError = 3000,
    /// Unexpected end of rule text
    UnexpectedEof = 3001,
    /// Rule weight literal is not a number in [0,1]
    InvalidWeight = 3002,

    // Config errors (4xxx)
    /// Generic config error
    ConfigError = 4000,
    /// Config file not found
    ConfigNotFound = 4001,
    /// Invalid config syntax
    InvalidConfigSyntax = 4002,
    /// Invalid config value
    InvalidConfigValue = 4003,

    // Internal errors (9xxx)
    /// Internal error
    InternalError = 9000,
    /// Not implemented
    NotImplemented = 9001,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::BuildError => "Build error",
            ErrorCode::InvalidParameters => "Invalid membership function parameters",
            ErrorCode::DuplicateSetName => "Duplicate set name",
            ErrorCode::RangeViolation => "Set support outside variable domain",
            ErrorCode::UnresolvedReference => "Unresolved variable or set reference",
            ErrorCode::ModelAlreadyFrozen => "Model already frozen",
            ErrorCode::DuplicateVariableName => "Duplicate variable name",
            ErrorCode::IncompatibleDefuzzifier => "Defuzzifier incompatible with inference type",
            ErrorCode::EmptyModel => "Model has no inputs, outputs or rules",

            ErrorCode::EvaluationError => "Evaluation error",
            ErrorCode::MissingInput => "Missing input value",
            ErrorCode::NonMonotonicConsequent => "Non-monotonic Tsukamoto consequent",
            ErrorCode::UnknownInput => "Unknown input variable",

            ErrorCode::RuleSyntaxError => "Rule syntax error",
            ErrorCode::UnexpectedEof => "Unexpected end of rule text",
            ErrorCode::InvalidWeight => "Invalid rule weight",

            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ConfigNotFound => "Configuration file not found",
            ErrorCode::InvalidConfigSyntax => "Invalid configuration syntax",
            ErrorCode::InvalidConfigValue => "Invalid configuration value",

            ErrorCode::InternalError => "Internal error",
            ErrorCode::NotImplemented => "Not implemented",
        }
    }

    /// Whether this code belongs to the build phase (prevents freezing)
    pub fn is_build(&self) -> bool {
        let c = self.code();
        (1000..2000).contains(&c)
    }

    /// Whether this code aborts a single evaluation call
    pub fn is_evaluation(&self) -> bool {
        let c = self.code();
        (2000..3000).contains(&c)
    }

    /// Whether this code comes from the rule-text parser
    pub fn is_parse(&self) -> bool {
        let c = self.code();
        (3000..4000).contains(&c)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Error Context
// ============================================================================

/// Additional context information for an error
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Key-value pairs of context information
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
    /// Source location within rule text or definition file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Stack of error causes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to the context
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add a source location
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Add a cause to the error chain
    pub fn cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for fuzzkit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FisError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    /// Hint for resolving the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl FisError {
    /// Create a new error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    // ========================================================================
    // Factory methods for common error types
    // ========================================================================

    /// Create an invalid-parameters error
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParameters, message)
    }

    /// Create a duplicate-set-name error
    pub fn duplicate_set(variable: &str, set: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateSetName,
            format!("set '{}' already defined on variable '{}'", set, variable),
        )
    }

    /// Create a duplicate-variable-name error
    pub fn duplicate_variable(variable: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateVariableName,
            format!("variable '{}' already defined", variable),
        )
    }

    /// Create an unresolved-reference error
    pub fn unresolved(what: &str, name: &str) -> Self {
        Self::new(
            ErrorCode::UnresolvedReference,
            format!("unknown {} '{}'", what, name),
        )
    }

    /// Create a frozen-model error
    pub fn frozen(operation: &str) -> Self {
        Self::new(
            ErrorCode::ModelAlreadyFrozen,
            format!("cannot {}: model is frozen", operation),
        )
    }

    /// Create a missing-input error
    pub fn missing_input(variable: &str) -> Self {
        Self::new(
            ErrorCode::MissingInput,
            format!("no crisp value supplied for input '{}'", variable),
        )
    }

    /// Create a non-monotonic-consequent error
    pub fn non_monotonic(variable: &str, set: &str) -> Self {
        Self::new(
            ErrorCode::NonMonotonicConsequent,
            format!(
                "Tsukamoto consequent '{}' of output '{}' is not monotonic",
                set, variable
            ),
        )
    }

    /// Create a rule syntax error with a byte position
    pub fn rule_syntax(position: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RuleSyntaxError, message)
            .at(format!("offset {}", position))
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the error code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.fields.insert(key.into(), value.into());
        self
    }

    /// Add a cause to the error chain
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.causes.push(cause.into());
        self
    }

    /// Add a source location
    pub fn at(mut self, location: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.location = Some(location.into());
        self
    }

    /// Add a hint for resolving the error
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Whether this error was raised while building a model
    pub fn is_build_error(&self) -> bool {
        self.code.is_build()
    }

    /// Whether this error aborted a single evaluation call
    pub fn is_evaluation_error(&self) -> bool {
        self.code.is_evaluation()
    }

    /// Convert to a JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"INTERNAL_ERROR","message":"{}"}}"#, self.message)
        })
    }

    /// Convert to a pretty JSON string
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

impl fmt::Display for FisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;

        if let Some(ref ctx) = self.context {
            if let Some(ref loc) = ctx.location {
                write!(f, " at {}", loc)?;
            }
            if !ctx.causes.is_empty() {
                write!(f, "\nCaused by:")?;
                for cause in &ctx.causes {
                    write!(f, "\n  - {}", cause)?;
                }
            }
        }

        if let Some(ref hint) = self.hint {
            write!(f, "\nHint: {}", hint)?;
        }

        Ok(())
    }
}

impl std::error::Error for FisError {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<std::io::Error> for FisError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let code = match err.kind() {
            ErrorKind::NotFound => ErrorCode::ConfigNotFound,
            _ => ErrorCode::InternalError,
        };
        FisError::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for FisError {
    fn from(err: serde_json::Error) -> Self {
        FisError::config(err.to_string())
            .with_code(ErrorCode::InvalidConfigSyntax)
            .with_context("format", "JSON")
    }
}

impl From<toml::de::Error> for FisError {
    fn from(err: toml::de::Error) -> Self {
        FisError::config(err.to_string())
            .with_code(ErrorCode::InvalidConfigSyntax)
            .with_context("format", "TOML")
    }
}

// ============================================================================
// Result type alias
// ============================================================================

/// A Result type using FisError
pub type FisResult<T> = Result<T, FisError>;

// ============================================================================
// Macros for convenient error creation
// ============================================================================

/// Create a FisError with context from the current location
#[macro_export]
macro_rules! fis_error {
    ($code:expr, $msg:expr) => {
        $crate::error::FisError::new($code, $msg)
            .at(format!("{}:{}", file!(), line!()))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::error::FisError::new($code, format!($fmt, $($arg)*))
            .at(format!("{}:{}", file!(), line!()))
    };
}

/// Bail out early with an error
#[macro_export]
macro_rules! fis_bail {
    ($code:expr, $msg:expr) => {
        return Err($crate::fis_error!($code, $msg))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::fis_error!($code, $fmt, $($arg)*))
    };
}

/// Ensure a condition holds, or return an error
#[macro_export]
macro_rules! fis_ensure {
    ($cond:expr, $code:expr, $msg:expr) => {
        if !$cond {
            $crate::fis_bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::fis_bail!($code, $fmt, $($arg)*);
        }
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = FisError::invalid_parameters("bad trapezoid");
        assert_eq!(err.code, ErrorCode::InvalidParameters);
        assert_eq!(err.message, "bad trapezoid");
    }

    #[test]
    fn test_error_with_context() {
        let err = FisError::invalid_parameters("corner ordering")
            .with_context("shape", "trapezoidal")
            .with_context("params", "[3, 2, 1, 0]");

        let ctx = err.context.as_ref().unwrap();
        assert_eq!(ctx.fields.get("shape"), Some(&"trapezoidal".to_string()));
        assert_eq!(ctx.fields.len(), 2);
    }

    #[test]
    fn test_error_phase_split() {
        assert!(FisError::duplicate_set("temp", "Cold").is_build_error());
        assert!(FisError::frozen("add set").is_build_error());
        assert!(FisError::missing_input("temp").is_evaluation_error());
        assert!(!FisError::missing_input("temp").is_build_error());
        assert!(FisError::rule_syntax(3, "expected IS").code.is_parse());
    }

    #[test]
    fn test_error_display() {
        let err = FisError::rule_syntax(17, "expected THEN")
            .with_cause("antecedent never closed")
            .with_hint("every rule needs a THEN part");

        let display = err.to_string();
        assert!(display.contains("[3000]"));
        assert!(display.contains("expected THEN"));
        assert!(display.contains("offset 17"));
        assert!(display.contains("antecedent never closed"));
        assert!(display.contains("every rule needs a THEN part"));
    }

    #[test]
    fn test_error_to_json() {
        let err = FisError::missing_input("temperature");
        let json = err.to_json();
        assert!(json.contains("MISSING_INPUT"));
        assert!(json.contains("temperature"));
    }

    #[test]
    fn test_frozen_error_message() {
        let err = FisError::frozen("add rule");
        assert_eq!(err.code, ErrorCode::ModelAlreadyFrozen);
        assert!(err.message.contains("add rule"));
    }
}
