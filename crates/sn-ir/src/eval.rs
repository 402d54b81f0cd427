//! Expression evaluation.
//!
//! A pure recursive walk over the tree. Arithmetic follows IEEE-754:
//! division by zero and domain errors produce `inf`/`NaN` rather than
//! failing. The only error is a variable missing from the context.

use alloc::string::{String, ToString};
use arrayvec::ArrayVec;

use crate::expr::Expr;

/// Name of the time variable bound by [`evaluate_at_t`].
pub const TIME_VARIABLE: &str = "t";

/// Maximum number of simultaneous bindings in an [`EvalContext`].
pub const MAX_BINDINGS: usize = 4;

/// Error type for evaluation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// A `Variable` node named a variable with no binding.
    #[error("unbound variable `{0}`")]
    UnboundVariable(String),
    /// More than [`MAX_BINDINGS`] distinct names were bound.
    #[error("evaluation context is full ({} bindings)", MAX_BINDINGS)]
    TooManyBindings,
}

/// Variable bindings for one evaluation call.
///
/// Stored inline so that building a context per sample never allocates.
#[derive(Clone, Debug, Default)]
pub struct EvalContext<'a> {
    bindings: ArrayVec<(&'a str, f64), MAX_BINDINGS>,
}

impl<'a> EvalContext<'a> {
    /// Create an empty context.
    pub fn new() -> Self {
        Self { bindings: ArrayVec::new() }
    }

    /// Context binding only `t`.
    pub fn at_t(t: f64) -> EvalContext<'static> {
        let mut ctx = EvalContext::new();
        ctx.bindings.push((TIME_VARIABLE, t));
        ctx
    }

    /// Bind `name` to `value`, replacing any existing binding.
    pub fn bind(&mut self, name: &'a str, value: f64) -> Result<(), EvalError> {
        if let Some(slot) = self.bindings.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
            return Ok(());
        }
        self.bindings
            .try_push((name, value))
            .map_err(|_| EvalError::TooManyBindings)
    }

    /// Look up a binding.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.bindings
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Evaluate `expr` with the given bindings.
pub fn evaluate(expr: &Expr, ctx: &EvalContext<'_>) -> Result<f64, EvalError> {
    let value = match expr {
        Expr::Number(v) => *v,
        Expr::Variable(name) => ctx
            .get(name)
            .ok_or_else(|| EvalError::UnboundVariable(name.to_string()))?,
        Expr::Pi => core::f64::consts::PI,
        Expr::E => core::f64::consts::E,
        Expr::Add(l, r) => evaluate(l, ctx)? + evaluate(r, ctx)?,
        Expr::Subtract(l, r) => evaluate(l, ctx)? - evaluate(r, ctx)?,
        Expr::Multiply(l, r) => evaluate(l, ctx)? * evaluate(r, ctx)?,
        Expr::Divide(l, r) => evaluate(l, ctx)? / evaluate(r, ctx)?,
        Expr::Modulo(l, r) => pos_mod(evaluate(l, ctx)?, evaluate(r, ctx)?),
        Expr::Exponent { base, power } => libm::pow(evaluate(base, ctx)?, evaluate(power, ctx)?),
        Expr::Negation(inner) => -evaluate(inner, ctx)?,
        Expr::Absolute(inner) => libm::fabs(evaluate(inner, ctx)?),
        Expr::Floor(inner) => libm::floor(evaluate(inner, ctx)?),
        Expr::Ceil(inner) => libm::ceil(evaluate(inner, ctx)?),
        Expr::Sine(inner) => libm::sin(evaluate(inner, ctx)?),
        Expr::Cosine(inner) => libm::cos(evaluate(inner, ctx)?),
        Expr::Tangent(inner) => libm::tan(evaluate(inner, ctx)?),
        Expr::Log { base, antilog } => {
            libm::log(evaluate(antilog, ctx)?) / libm::log(evaluate(base, ctx)?)
        }
    };
    Ok(value)
}

/// Evaluate `expr` with `t` as the only bound variable.
pub fn evaluate_at_t(expr: &Expr, t: f64) -> Result<f64, EvalError> {
    evaluate(expr, &EvalContext::at_t(t))
}

/// Floor modulo: `a - b * floor(a / b)`, computed via `fmod` for precision.
///
/// For `b > 0` the result lies in `[0, b)`; for `b < 0` in `(b, 0]`.
/// `b == 0` or non-finite `a` yield `NaN`.
pub fn pos_mod(a: f64, b: f64) -> f64 {
    let r = libm::fmod(a, b);
    if r == 0.0 || (r < 0.0) == (b < 0.0) {
        return r;
    }
    let wrapped = r + b;
    // A remainder a hair below zero can round up to exactly `b`.
    if wrapped == b {
        0.0
    } else {
        wrapped
    }
}
