//! Expression tree for user-authored functions.
//!
//! A tree is built once (by the parser or by hand) and never mutated.
//! Evaluation lives in [`crate::eval`]; rendering in [`crate::latex`].

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

/// A node of a function's abstract syntax tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Literal number.
    Number(f64),
    /// Named variable, resolved through the evaluation context.
    Variable(String),
    /// The constant π.
    Pi,
    /// Euler's number.
    E,
    Add(Box<Expr>, Box<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Box<Expr>, Box<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    /// Floor modulo: the result takes the sign of the divisor.
    Modulo(Box<Expr>, Box<Expr>),
    Exponent { base: Box<Expr>, power: Box<Expr> },
    Negation(Box<Expr>),
    Absolute(Box<Expr>),
    Floor(Box<Expr>),
    Ceil(Box<Expr>),
    Sine(Box<Expr>),
    Cosine(Box<Expr>),
    Tangent(Box<Expr>),
    /// `log_base(antilog)`.
    Log { base: Box<Expr>, antilog: Box<Expr> },
}

impl Expr {
    pub fn number(value: f64) -> Self {
        Expr::Number(value)
    }

    pub fn variable(name: &str) -> Self {
        Expr::Variable(String::from(name))
    }

    pub fn add(left: Expr, right: Expr) -> Self {
        Expr::Add(Box::new(left), Box::new(right))
    }

    pub fn subtract(left: Expr, right: Expr) -> Self {
        Expr::Subtract(Box::new(left), Box::new(right))
    }

    pub fn multiply(left: Expr, right: Expr) -> Self {
        Expr::Multiply(Box::new(left), Box::new(right))
    }

    pub fn divide(left: Expr, right: Expr) -> Self {
        Expr::Divide(Box::new(left), Box::new(right))
    }

    pub fn modulo(left: Expr, right: Expr) -> Self {
        Expr::Modulo(Box::new(left), Box::new(right))
    }

    pub fn exponent(base: Expr, power: Expr) -> Self {
        Expr::Exponent { base: Box::new(base), power: Box::new(power) }
    }

    pub fn log(base: Expr, antilog: Expr) -> Self {
        Expr::Log { base: Box::new(base), antilog: Box::new(antilog) }
    }

    pub fn negation(inner: Expr) -> Self {
        Expr::Negation(Box::new(inner))
    }

    pub fn absolute(inner: Expr) -> Self {
        Expr::Absolute(Box::new(inner))
    }

    pub fn floor(inner: Expr) -> Self {
        Expr::Floor(Box::new(inner))
    }

    pub fn ceil(inner: Expr) -> Self {
        Expr::Ceil(Box::new(inner))
    }

    pub fn sine(inner: Expr) -> Self {
        Expr::Sine(Box::new(inner))
    }

    pub fn cosine(inner: Expr) -> Self {
        Expr::Cosine(Box::new(inner))
    }

    pub fn tangent(inner: Expr) -> Self {
        Expr::Tangent(Box::new(inner))
    }

    /// Whether this node reads as a single term when juxtaposed with
    /// another (`2t`, `3\sin(t)`), i.e. needs no parentheses in a product.
    pub fn is_term(&self) -> bool {
        !matches!(
            self,
            Expr::Add(..) | Expr::Subtract(..) | Expr::Divide(..) | Expr::Modulo(..)
        )
    }

    /// Child nodes in left-to-right order.
    pub fn children(&self) -> Children<'_> {
        match self {
            Expr::Number(_) | Expr::Variable(_) | Expr::Pi | Expr::E => Children::None,
            Expr::Negation(inner)
            | Expr::Absolute(inner)
            | Expr::Floor(inner)
            | Expr::Ceil(inner)
            | Expr::Sine(inner)
            | Expr::Cosine(inner)
            | Expr::Tangent(inner) => Children::One(inner),
            Expr::Add(l, r)
            | Expr::Subtract(l, r)
            | Expr::Multiply(l, r)
            | Expr::Divide(l, r)
            | Expr::Modulo(l, r) => Children::Two(l, r),
            Expr::Exponent { base, power } => Children::Two(base, power),
            Expr::Log { base, antilog } => Children::Two(base, antilog),
        }
    }

    /// Distinct variable names referenced by the tree, in first-seen order.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        if let Expr::Variable(name) = self {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
            return;
        }
        match self.children() {
            Children::None => {}
            Children::One(inner) => inner.collect_variables(names),
            Children::Two(l, r) => {
                l.collect_variables(names);
                r.collect_variables(names);
            }
        }
    }

    /// Longest root-to-leaf path, counting nodes. Bounds evaluation recursion.
    pub fn depth(&self) -> usize {
        1 + match self.children() {
            Children::None => 0,
            Children::One(inner) => inner.depth(),
            Children::Two(l, r) => l.depth().max(r.depth()),
        }
    }
}

/// Borrowed view of a node's operands.
#[derive(Clone, Copy, Debug)]
pub enum Children<'a> {
    None,
    One(&'a Expr),
    Two(&'a Expr, &'a Expr),
}
