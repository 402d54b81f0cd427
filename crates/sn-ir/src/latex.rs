//! LaTeX display form of an expression.

use alloc::format;
use alloc::string::String;

use crate::expr::Expr;

impl Expr {
    /// Render the expression as LaTeX for display next to its graph.
    pub fn to_latex(&self) -> String {
        match self {
            Expr::Number(v) => format!("{}", v),
            Expr::Variable(name) => name.clone(),
            Expr::Pi => String::from("\\pi"),
            Expr::E => String::from("e"),
            Expr::Add(l, r) => format!("{} + {}", l.to_latex(), r.to_latex()),
            Expr::Subtract(l, r) => format!("{} - {}", l.to_latex(), r.to_latex()),
            Expr::Multiply(l, r) => format!("{}{}", l.single_term_latex(), r.single_term_latex()),
            Expr::Divide(l, r) => format!("\\frac{{{}}}{{{}}}", l.to_latex(), r.to_latex()),
            Expr::Modulo(l, r) => format!("{} % {}", l.single_term_latex(), r.single_term_latex()),
            Expr::Exponent { base, power } => {
                format!("{}^{{{}}}", base.single_term_latex(), power.to_latex())
            }
            Expr::Negation(inner) => format!("-{}", inner.single_term_latex()),
            Expr::Absolute(inner) => format!("|{}|", inner.to_latex()),
            Expr::Floor(inner) => format!("\\lfloor {} \\rfloor", inner.to_latex()),
            Expr::Ceil(inner) => format!("\\lceil {} \\rceil", inner.to_latex()),
            Expr::Sine(inner) => format!("\\sin({})", inner.to_latex()),
            Expr::Cosine(inner) => format!("\\cos({})", inner.to_latex()),
            Expr::Tangent(inner) => format!("\\tan({})", inner.to_latex()),
            Expr::Log { base, antilog } => {
                format!("\\log_{{{}}}({})", base.to_latex(), antilog.to_latex())
            }
        }
    }

    fn single_term_latex(&self) -> String {
        if self.is_term() {
            self.to_latex()
        } else {
            format!("({})", self.to_latex())
        }
    }
}
