//! Membership function library
//!
//! Pure functions mapping a crisp scalar and a parameter vector to a
//! membership degree in [0, height]. The shape set is a closed tagged
//! variant: new shapes extend the [`Shape`] enum rather than introducing
//! open-ended dispatch.
//!
//! Shapes fall into three groups:
//! - conventional shapes usable on any antecedent or Mamdani consequent
//!   (triangular, trapezoidal, gaussian, bell, sigmoid families, ...)
//! - crisp consequent functions for Sugeno (`constant`, `linear`)
//! - monotonic shapes invertible for Tsukamoto (`sigmoid`, `s_shape`,
//!   `z_shape`, `linear_s`, `linear_z`, `concave`)
//!
//! Numeric tolerance for point equality (singleton evaluation, plateau
//! detection) is [`TOLERANCE`]; exact bit equality is never required so
//! fixed-point-rounded inputs behave sanely.

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::error::{FisError, FisResult};

/// Numeric tolerance for degree and point comparisons.
pub const TOLERANCE: f64 = 1e-9;

/// Membership function shape kinds.
///
/// Parameter layouts follow the conventional fuzzy-toolbox orders; the
/// count is fixed per kind except for `linear`, whose length depends on
/// the number of model inputs (one coefficient per input plus an offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// f(c): constant degree c
    Constant,
    /// f(a,b,c): triangular, peak at b
    Triangular,
    /// f(a,b,c,d): trapezoidal, plateau on [b,c]
    Trapezoidal,
    /// f(a,b,c): generalized bell, 1/(1+|((x-c)/a)|^(2b))
    #[serde(rename = "gbell")]
    GBell,
    /// f(sigma,c): gaussian centered at c
    Gaussian,
    /// f(s1,c1,s2,c2): two-sided gaussian
    Gauss2,
    /// f(a,b): sigmoid with slope a, inflection b
    Sigmoid,
    /// f(a1,c1,a2,c2): |sig(a1,c1) - sig(a2,c2)|
    #[serde(rename = "dsigmoid")]
    DSigmoid,
    /// f(a1,c1,a2,c2): |sig(a1,c1) * sig(a2,c2)|
    #[serde(rename = "psigmoid")]
    PSigmoid,
    /// f(a,b,c,d): s_shape(a,b) * z_shape(c,d)
    PiShape,
    /// f(a,b): smooth step from 0 at a to 1 at b
    SShape,
    /// f(a,b): smooth step from 1 at a to 0 at b
    ZShape,
    /// f(v): height at v (within tolerance), 0 elsewhere
    Singleton,
    /// f(s,e): 1 on [s,e], 0 elsewhere
    Rectangle,
    /// f(c,w): raised cosine lobe of width w centered at c
    Cosine,
    /// f(w,c): exp(-|10(x-c)/w|)
    Spike,
    /// f(i,e): monotonic rational curve from inflection i to end e
    Concave,
    /// f(a,b): linear ramp from 0 at a to 1 at b
    LinearS,
    /// f(a,b): linear ramp from 1 at a to 0 at b
    LinearZ,
    /// f(k1..kn,k0): affine function of the crisp inputs (Sugeno only)
    Linear,
}

impl Shape {
    /// Required parameter count, or `None` when it depends on the model
    /// (the `linear` kind takes one coefficient per input plus an offset).
    pub fn param_count(&self) -> Option<usize> {
        match self {
            Shape::Constant | Shape::Singleton => Some(1),
            Shape::Gaussian
            | Shape::Sigmoid
            | Shape::SShape
            | Shape::ZShape
            | Shape::Rectangle
            | Shape::Cosine
            | Shape::Spike
            | Shape::Concave
            | Shape::LinearS
            | Shape::LinearZ => Some(2),
            Shape::Triangular | Shape::GBell => Some(3),
            Shape::Trapezoidal
            | Shape::Gauss2
            | Shape::DSigmoid
            | Shape::PSigmoid
            | Shape::PiShape => Some(4),
            Shape::Linear => None,
        }
    }

    /// Canonical lower-case name, as used in declarative definitions.
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Constant => "constant",
            Shape::Triangular => "triangular",
            Shape::Trapezoidal => "trapezoidal",
            Shape::GBell => "gbell",
            Shape::Gaussian => "gaussian",
            Shape::Gauss2 => "gauss2",
            Shape::Sigmoid => "sigmoid",
            Shape::DSigmoid => "dsigmoid",
            Shape::PSigmoid => "psigmoid",
            Shape::PiShape => "pi_shape",
            Shape::SShape => "s_shape",
            Shape::ZShape => "z_shape",
            Shape::Singleton => "singleton",
            Shape::Rectangle => "rectangle",
            Shape::Cosine => "cosine",
            Shape::Spike => "spike",
            Shape::Concave => "concave",
            Shape::LinearS => "linear_s",
            Shape::LinearZ => "linear_z",
            Shape::Linear => "linear",
        }
    }

    /// Whether this kind is a crisp Sugeno consequent function.
    pub fn is_crisp(&self) -> bool {
        matches!(self, Shape::Constant | Shape::Linear)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Monotonic direction of a membership function over its whole domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Monotonicity {
    Increasing,
    Decreasing,
}

/// A membership function: a shape kind, its parameter vector, and a
/// height scalar in (0,1] scaling the degree (non-normal sets).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipFunction {
    shape: Shape,
    params: Vec<f64>,
    height: f64,
}

impl MembershipFunction {
    /// Create a membership function with height 1.
    pub fn new(shape: Shape, params: &[f64]) -> FisResult<Self> {
        Self::with_height(shape, params, 1.0)
    }

    /// Create a membership function with an explicit height in (0,1].
    ///
    /// Fails with `InvalidParameters` when the parameter count mismatches
    /// the shape or a shape-specific ordering constraint is violated.
    pub fn with_height(shape: Shape, params: &[f64], height: f64) -> FisResult<Self> {
        validate_params(shape, params)?;
        if !(height > 0.0 && height <= 1.0) || !height.is_finite() {
            return Err(FisError::invalid_parameters(format!(
                "height {} outside (0,1]",
                height
            ))
            .with_context("shape", shape.name()));
        }
        Ok(Self {
            shape,
            params: params.to_vec(),
            height,
        })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Evaluate the membership degree at a crisp value.
    ///
    /// The raw shape value is clamped to [0,1] and then scaled by the
    /// height, so the result always lies in [0, height].
    pub fn evaluate(&self, x: f64) -> f64 {
        let p = &self.params;
        let raw = match self.shape {
            Shape::Constant => p[0],
            Shape::Triangular => triangle(x, p[0], p[1], p[2]),
            Shape::Trapezoidal => trapezoid(x, p[0], p[1], p[2], p[3]),
            Shape::GBell => 1.0 / (1.0 + ((x - p[2]) / p[0]).abs().powf(2.0 * p[1])),
            Shape::Gaussian => gaussian(x, p[0], p[1]),
            Shape::Gauss2 => {
                let f1 = if x <= p[1] { gaussian(x, p[0], p[1]) } else { 1.0 };
                let f2 = if x <= p[3] { 1.0 } else { gaussian(x, p[2], p[3]) };
                f1 * f2
            }
            Shape::Sigmoid => sigmoid(x, p[0], p[1]),
            Shape::DSigmoid => (sigmoid(x, p[0], p[1]) - sigmoid(x, p[2], p[3])).abs(),
            Shape::PSigmoid => (sigmoid(x, p[0], p[1]) * sigmoid(x, p[2], p[3])).abs(),
            Shape::PiShape => smf(x, p[0], p[1]) * zmf(x, p[2], p[3]),
            Shape::SShape => smf(x, p[0], p[1]),
            Shape::ZShape => zmf(x, p[0], p[1]),
            Shape::Singleton => {
                if (x - p[0]).abs() <= TOLERANCE {
                    1.0
                } else {
                    0.0
                }
            }
            Shape::Rectangle => {
                if x >= p[0] && x <= p[1] {
                    1.0
                } else {
                    0.0
                }
            }
            Shape::Cosine => {
                let (c, w) = (p[0], p[1]);
                if x < c - 0.5 * w || x > c + 0.5 * w {
                    0.0
                } else {
                    0.5 * (1.0 + (2.0 / w * std::f64::consts::PI * (x - c)).cos())
                }
            }
            Shape::Spike => (-(10.0 * (x - p[1]) / p[0]).abs()).exp(),
            Shape::Concave => concave(x, p[0], p[1]),
            Shape::LinearS => lin_s(x, p[0], p[1]),
            Shape::LinearZ => 1.0 - lin_s(x, p[0], p[1]),
            // Crisp consequent function; as a degree it only makes sense
            // clamped, which matches evaluating it on an antecedent.
            Shape::Linear => {
                debug_assert!(false, "linear shapes are evaluated with evaluate_crisp");
                0.0
            }
        };
        self.height * raw.clamp(0.0, 1.0)
    }

    /// Evaluate a crisp Sugeno consequent function over the model's
    /// clamped input vector. `constant` ignores the inputs; `linear`
    /// computes k1*x1 + ... + kn*xn + k0.
    pub fn evaluate_crisp(&self, inputs: &[f64]) -> f64 {
        match self.shape {
            Shape::Constant => self.params[0],
            Shape::Linear => {
                let mut z = 0.0;
                for (k, x) in self.params.iter().zip(inputs.iter()) {
                    z += k * x;
                }
                z + self.params[self.params.len() - 1]
            }
            // A conventional shape in a Sugeno consequent is rejected at
            // build; this arm is unreachable on a frozen model.
            _ => self.evaluate(inputs.first().copied().unwrap_or(0.0)),
        }
    }

    /// Monotonic direction over the whole real line, if any.
    pub fn monotonicity(&self) -> Option<Monotonicity> {
        let p = &self.params;
        match self.shape {
            Shape::Sigmoid => {
                if p[0] > 0.0 {
                    Some(Monotonicity::Increasing)
                } else if p[0] < 0.0 {
                    Some(Monotonicity::Decreasing)
                } else {
                    None
                }
            }
            Shape::SShape | Shape::LinearS => Some(Monotonicity::Increasing),
            Shape::ZShape | Shape::LinearZ => Some(Monotonicity::Decreasing),
            Shape::Concave => {
                if p[0] <= p[1] {
                    Some(Monotonicity::Increasing)
                } else {
                    Some(Monotonicity::Decreasing)
                }
            }
            _ => None,
        }
    }

    /// Invert a monotonic membership function at a firing strength
    /// `w` in [0,1], saturating into the output domain `(min, max)`.
    ///
    /// Callers must have checked `monotonicity()`; inverting a
    /// non-monotonic shape is a logic error guarded at model build.
    pub fn invert(&self, w: f64, range: (f64, f64)) -> f64 {
        let (min, max) = range;
        let w = (w / self.height).clamp(0.0, 1.0);
        let p = &self.params;
        let z = match self.shape {
            Shape::Sigmoid => {
                let (a, b) = (p[0], p[1]);
                if (w - 1.0).abs() <= TOLERANCE {
                    if a >= 0.0 { max } else { min }
                } else if w.abs() <= TOLERANCE {
                    if a >= 0.0 { min } else { max }
                } else {
                    b - ((1.0 / w) - 1.0).ln() / a
                }
            }
            Shape::SShape => {
                let (a, b) = (p[0], p[1]);
                if w <= 0.5 {
                    a + (b - a) * (w / 2.0).sqrt()
                } else {
                    b - (b - a) * ((1.0 - w) / 2.0).sqrt()
                }
            }
            Shape::ZShape => {
                let (a, b) = (p[0], p[1]);
                if w >= 0.5 {
                    a + (b - a) * ((1.0 - w) / 2.0).sqrt()
                } else {
                    b - (b - a) * (w / 2.0).sqrt()
                }
            }
            Shape::LinearS => p[0] + w * (p[1] - p[0]),
            Shape::LinearZ => p[1] - w * (p[1] - p[0]),
            Shape::Concave => {
                let (i, e) = (p[0], p[1]);
                if w.abs() <= TOLERANCE {
                    if i <= e { min } else { max }
                } else if i <= e {
                    2.0 * e - i - (e - i) / w
                } else {
                    2.0 * e - i + (i - e) / w
                }
            }
            _ => 0.5 * (min + max),
        };
        z.clamp(min, max)
    }

    /// The closed interval where the degree is non-zero, when the shape
    /// has bounded support. Unbounded shapes (gaussian, sigmoid, bell,
    /// spike) return `None`.
    pub fn support(&self) -> Option<(f64, f64)> {
        let p = &self.params;
        match self.shape {
            Shape::Triangular => Some((p[0], p[2])),
            Shape::Trapezoidal | Shape::PiShape => Some((p[0], p[3])),
            Shape::Singleton => Some((p[0], p[0])),
            Shape::Rectangle => Some((p[0], p[1])),
            Shape::Cosine => Some((p[0] - 0.5 * p[1], p[0] + 0.5 * p[1])),
            _ => None,
        }
    }

    /// Whether the set concentrates its mass at a single point, which is
    /// what the weighted Mamdani defuzzifiers need.
    pub fn is_singleton_like(&self) -> bool {
        matches!(self.shape, Shape::Singleton)
    }
}

// ============================================================================
// Shape primitives
// ============================================================================

fn triangle(x: f64, a: f64, b: f64, c: f64) -> f64 {
    if x <= a || x >= c {
        // degenerate edges (a == b or b == c) form right triangles
        if (x - b).abs() <= TOLERANCE {
            return 1.0;
        }
        0.0
    } else if x < b {
        (x - a) / (b - a)
    } else if x > b {
        (c - x) / (c - b)
    } else {
        1.0
    }
}

fn trapezoid(x: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    if x >= b && x <= c {
        1.0
    } else if x <= a || x >= d {
        0.0
    } else if x < b {
        (x - a) / (b - a)
    } else {
        (d - x) / (d - c)
    }
}

fn gaussian(x: f64, sigma: f64, c: f64) -> f64 {
    let t = (x - c) / sigma;
    (-0.5 * t * t).exp()
}

fn sigmoid(x: f64, a: f64, b: f64) -> f64 {
    1.0 / (1.0 + (-a * (x - b)).exp())
}

fn smf(x: f64, a: f64, b: f64) -> f64 {
    if x <= a {
        0.0
    } else if x >= b {
        1.0
    } else {
        let mid = 0.5 * (a + b);
        if x <= mid {
            let t = (x - a) / (b - a);
            2.0 * t * t
        } else {
            let t = (x - b) / (b - a);
            1.0 - 2.0 * t * t
        }
    }
}

fn zmf(x: f64, a: f64, b: f64) -> f64 {
    if x <= a {
        1.0
    } else if x >= b {
        0.0
    } else {
        let mid = 0.5 * (a + b);
        if x <= mid {
            let t = (x - a) / (b - a);
            1.0 - 2.0 * t * t
        } else {
            let t = (x - b) / (b - a);
            2.0 * t * t
        }
    }
}

fn lin_s(x: f64, a: f64, b: f64) -> f64 {
    if (a - b).abs() <= TOLERANCE {
        if x < a { 0.0 } else { 1.0 }
    } else if x < a {
        0.0
    } else if x > b {
        1.0
    } else {
        (x - a) / (b - a)
    }
}

fn concave(x: f64, i: f64, e: f64) -> f64 {
    if i <= e && x < e {
        (e - i) / (2.0 * e - i - x)
    } else if i > e && x > e {
        (i - e) / (i + x - 2.0 * e)
    } else {
        1.0
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_params(shape: Shape, p: &[f64]) -> FisResult<()> {
    if p.iter().any(|v| !v.is_finite()) {
        return Err(FisError::invalid_parameters("non-finite parameter")
            .with_context("shape", shape.name()));
    }
    if let Some(n) = shape.param_count() {
        if p.len() != n {
            return Err(FisError::invalid_parameters(format!(
                "shape '{}' takes {} parameters, got {}",
                shape.name(),
                n,
                p.len()
            )));
        }
    } else if p.is_empty() {
        // linear: one coefficient per input plus offset; the exact length
        // is checked against the model at build
        return Err(FisError::invalid_parameters(
            "linear shape needs at least an offset coefficient",
        ));
    }

    let ordered = |vals: &[f64]| vals.windows(2).all(|w| w[0] <= w[1]);
    let bad = match shape {
        Shape::Triangular => !ordered(p) || (p[2] - p[0]).abs() <= TOLERANCE,
        Shape::Trapezoidal => !ordered(p) || (p[3] - p[0]).abs() <= TOLERANCE,
        Shape::GBell => p[0].abs() <= TOLERANCE,
        Shape::Gaussian => p[0] <= 0.0,
        Shape::Gauss2 => p[0] <= 0.0 || p[2] <= 0.0,
        Shape::PiShape => p[0] > p[1] || p[2] > p[3],
        Shape::SShape | Shape::ZShape => p[0] > p[1],
        Shape::Rectangle => p[0] > p[1],
        Shape::Cosine => p[1] <= 0.0,
        Shape::Spike => p[0] <= 0.0,
        Shape::LinearS | Shape::LinearZ => p[0] > p[1],
        _ => false,
    };
    if bad {
        return Err(FisError::invalid_parameters(format!(
            "ordering constraint violated for shape '{}'",
            shape.name()
        ))
        .with_context("params", format!("{:?}", p)));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
