//! Text to expression parser.
//!
//! Accepts the notation users type into the function box: numbers,
//! identifiers like `x_1`, the constants `pi` and `e`, the functions
//! `sin cos tan abs floor ceil ln log`, absolute bars, the operators
//! `+ - * / % ^` and implicit multiplication (`2pi`, `4floor(t)`).

use sn_ir::{Expr, TIME_VARIABLE};

/// Longest input accepted, in tokens.
pub const MAX_TOKENS: usize = 4096;

/// Deepest nesting accepted, both while parsing and in the finished tree.
/// Evaluation recurses once per level.
pub const MAX_DEPTH: usize = 256;

/// A parse failure with the byte offset where it was detected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Parse `text` into an expression.
pub fn parse(text: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(text)?;
    // The stream always ends with End, which doesn't count.
    if let Some(token) = tokens.get(MAX_TOKENS) {
        if token.kind != TokenKind::End {
            return Err(ParseError::new("expression is too long", token.pos));
        }
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        abs_depth: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    let next = parser.peek();
    if next.kind != TokenKind::End {
        return Err(ParseError::new("unexpected input", next.pos));
    }
    // Long operator chains nest without recursing in the parser.
    if expr.depth() > MAX_DEPTH {
        return Err(ParseError::new("expression is nested too deeply", 0));
    }
    Ok(expr)
}

/// Parse a playable function: like [`parse`], but `t` is the only
/// variable allowed.
pub fn parse_function(text: &str) -> Result<Expr, ParseError> {
    let expr = parse(text)?;
    if let Some(name) = expr.variables().into_iter().find(|v| *v != TIME_VARIABLE) {
        let position = text.find(name).unwrap_or(0);
        return Err(ParseError::new(format!("unknown variable '{}'", name), position));
    }
    Ok(expr)
}

// --- Lexer ---

#[derive(Clone, Debug, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
    Pipe,
    End,
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let mut end = pos;
            let mut seen_dot = false;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_digit() || (d == '.' && !seen_dot) {
                    seen_dot |= d == '.';
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let literal = &text[pos..end];
            let value = literal
                .parse::<f64>()
                .map_err(|_| ParseError::new(format!("invalid number '{}'", literal), pos))?;
            tokens.push(Token { kind: TokenKind::Number(value), pos });
            continue;
        }

        if c.is_alphabetic() {
            let mut end = pos;
            while let Some(&(i, l)) = chars.peek() {
                if !l.is_alphabetic() {
                    break;
                }
                end = i + l.len_utf8();
                chars.next();
            }
            // Optional subscript: `_` followed by alphanumerics.
            let mut rest = text[end..].char_indices();
            if let (Some((_, '_')), Some((_, s))) = (rest.next(), rest.next()) {
                if s.is_alphanumeric() {
                    chars.next();
                    end += 1;
                    while let Some(&(i, a)) = chars.peek() {
                        if !a.is_alphanumeric() {
                            break;
                        }
                        end = i + a.len_utf8();
                        chars.next();
                    }
                }
            }
            tokens.push(Token {
                kind: TokenKind::Ident(text[pos..end].to_string()),
                pos,
            });
            continue;
        }

        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '|' => TokenKind::Pipe,
            other => return Err(ParseError::new(format!("unexpected character '{}'", other), pos)),
        };
        tokens.push(Token { kind, pos });
        chars.next();
    }

    tokens.push(Token {
        kind: TokenKind::End,
        pos: text.len(),
    });
    Ok(tokens)
}

// --- Parser ---

/// Recursive descent, lowest precedence first:
/// `+ -`, then `* / %`, then juxtaposition, then unary `-`, then `^`.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Open `|` bars at the current nesting level; a `|` closes rather
    /// than starts a factor while this is non-zero.
    abs_depth: usize,
    /// Active `power` and unary minus frames.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always ends the stream with End
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ParseError> {
        let token = self.peek();
        if token.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(format!("expected {}", what), token.pos))
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        loop {
            match self.peek().kind {
                TokenKind::Plus => {
                    self.advance();
                    left = Expr::add(left, self.term()?);
                }
                TokenKind::Minus => {
                    self.advance();
                    left = Expr::subtract(left, self.term()?);
                }
                _ => return Ok(left),
            }
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.juxtaposition()?;
        loop {
            match self.peek().kind {
                TokenKind::Star => {
                    self.advance();
                    left = Expr::multiply(left, self.juxtaposition()?);
                }
                TokenKind::Slash => {
                    self.advance();
                    left = Expr::divide(left, self.juxtaposition()?);
                }
                TokenKind::Percent => {
                    self.advance();
                    left = Expr::modulo(left, self.juxtaposition()?);
                }
                _ => return Ok(left),
            }
        }
    }

    /// Implicit products such as `2pi`, `4floor(t)` and `2|t|`, which bind
    /// tighter than `* / %`.
    fn juxtaposition(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            match self.peek().kind {
                TokenKind::Number(_) | TokenKind::Ident(_) | TokenKind::LParen => {
                    left = Expr::multiply(left, self.power()?);
                }
                TokenKind::Pipe if self.abs_depth == 0 => {
                    left = Expr::multiply(left, self.power()?);
                }
                _ => return Ok(left),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.peek().kind != TokenKind::Minus {
            return self.power();
        }
        self.advance();
        Ok(match self.guarded(Parser::unary)? {
            Expr::Number(v) => Expr::number(-v),
            inner => Expr::negation(inner),
        })
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        self.guarded(Parser::exponent)
    }

    fn exponent(&mut self) -> Result<Expr, ParseError> {
        let base = self.primary()?;
        if self.peek().kind != TokenKind::Caret {
            return Ok(base);
        }
        self.advance();
        // Right-associative; the exponent may carry its own sign.
        let power = self.unary()?;
        Ok(Expr::exponent(base, power))
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(v) => Ok(Expr::number(v)),
            TokenKind::Ident(name) => self.identifier(&name, token.pos),
            TokenKind::LParen => {
                let inner = self.nested(Parser::expression)?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Pipe => {
                self.abs_depth += 1;
                let inner = self.expression();
                self.abs_depth -= 1;
                let inner = inner?;
                self.expect(TokenKind::Pipe, "closing '|'")?;
                Ok(Expr::absolute(inner))
            }
            TokenKind::End => Err(ParseError::new("unexpected end of input", token.pos)),
            _ => Err(ParseError::new("expected a number, variable or '('", token.pos)),
        }
    }

    fn identifier(&mut self, name: &str, pos: usize) -> Result<Expr, ParseError> {
        let unary: Option<fn(Expr) -> Expr> = match name {
            "pi" => return Ok(Expr::Pi),
            "e" => return Ok(Expr::E),
            "sin" => Some(Expr::sine),
            "cos" => Some(Expr::cosine),
            "tan" => Some(Expr::tangent),
            "abs" => Some(Expr::absolute),
            "floor" => Some(Expr::floor),
            "ceil" => Some(Expr::ceil),
            "ln" => Some(|x| Expr::log(Expr::E, x)),
            "log" => None,
            _ => return Ok(Expr::variable(name)),
        };

        if self.peek().kind != TokenKind::LParen {
            return Err(ParseError::new(format!("expected '(' after {}", name), pos));
        }
        self.advance();
        let expr = match unary {
            Some(build) => build(self.nested(Parser::expression)?),
            None => {
                let base = self.nested(Parser::expression)?;
                self.expect(TokenKind::Comma, "',' between log base and argument")?;
                let antilog = self.nested(Parser::expression)?;
                Expr::log(base, antilog)
            }
        };
        self.expect(TokenKind::RParen, "')'")?;
        Ok(expr)
    }

    /// Run `f` one level deeper, failing once [`MAX_DEPTH`] is reached.
    fn guarded(&mut self, f: fn(&mut Parser) -> Result<Expr, ParseError>) -> Result<Expr, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new("expression is nested too deeply", self.peek().pos));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Parse inside brackets, where `|` starts a fresh absolute value.
    fn nested(&mut self, f: fn(&mut Parser) -> Result<Expr, ParseError>) -> Result<Expr, ParseError> {
        let saved = core::mem::replace(&mut self.abs_depth, 0);
        let result = f(self);
        self.abs_depth = saved;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sn_ir::evaluate_at_t;
    use std::f64::consts::PI;

    fn eval(text: &str, t: f64) -> f64 {
        evaluate_at_t(&parse(text).unwrap(), t).unwrap()
    }

    #[test]
    fn numbers_parse() {
        for (input, value) in [("42", 42.0), ("-12", -12.0), ("24.09", 24.09), ("-99999999.99", -99999999.99)] {
            assert_eq!(parse(input).unwrap(), Expr::Number(value), "{}", input);
        }
    }

    #[test]
    fn variables_parse() {
        for input in ["x", "x_1", "α_21x", "A_a32f"] {
            assert_eq!(parse(input).unwrap(), Expr::variable(input), "{}", input);
        }
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("3 + 3", 0.0), 6.0);
        assert_eq!(eval("5 % 3", 0.0), 2.0);
        assert_eq!(eval("pi % 2pi", 0.0), PI);
        assert_eq!(eval("-7 % 3", 0.0), 2.0);
    }

    #[test]
    fn complex_functions_parse() {
        assert!(parse("5x^2 + 3y + z").is_ok());
        assert!(parse("4floor(t) + 2floor(2t) - 1").is_ok());
    }

    #[test]
    fn latex_of_parsed_functions() {
        let cases = [
            ("4floor(t) - 2floor(2t) + 1", "4\\lfloor t \\rfloor - 2\\lfloor 2t \\rfloor + 1"),
            ("21x/367 + 5", "\\frac{21x}{367} + 5"),
            ("5sin(x^2)^2", "5\\sin(x^{2})^{2}"),
            ("12 + 3 + 4 + 5 + 6 + 19", "12 + 3 + 4 + 5 + 6 + 19"),
            ("abs(floor(ceil(x)))", "|\\lfloor \\lceil x \\rceil \\rfloor|"),
            ("5e % 2pi", "5e % 2\\pi"),
        ];
        for (input, latex) in cases {
            assert_eq!(parse(input).unwrap().to_latex(), latex, "{}", input);
        }
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("1 + 2 * 3", 0.0), 7.0);
        assert_eq!(eval("-t^2", 3.0), -9.0);
        assert_eq!(eval("2^3^2", 0.0), 512.0);
        assert_eq!(eval("2^-1", 0.0), 0.5);
        assert_eq!(eval("10 - 4 - 3", 0.0), 3.0);
        assert_eq!(eval("3(t + 1)", 1.0), 6.0);
        assert_eq!(eval("2t^2", 3.0), 18.0);
    }

    #[test]
    fn functions_and_bars() {
        assert_eq!(eval("|t - 5|", 2.0), 3.0);
        assert_eq!(eval("2|t|", -4.0), 8.0);
        assert_eq!(eval("|(2|t|)|", -1.0), 2.0);
        assert!((eval("log(2, 8)", 0.0) - 3.0).abs() < 1e-12);
        assert!((eval("ln(e)", 0.0) - 1.0).abs() < 1e-12);
        assert_eq!(eval("floor(t) + ceil(t)", 1.5), 3.0);
        assert!((eval("sin(3t) + 1", 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn square_wave_from_text() {
        for (t, expected) in [(0.0, 1.0), (0.33, 1.0), (2.26, 1.0), (1.63, -1.0), (-1.37, -1.0)] {
            assert_eq!(eval("4floor(t) - 2floor(2t) + 1", t), expected);
        }
    }

    #[test]
    fn errors_carry_positions() {
        assert_eq!(parse("").unwrap_err().position, 0);
        assert_eq!(parse("3 +").unwrap_err().position, 3);
        assert_eq!(parse("(1").unwrap_err(), ParseError::new("expected ')'", 2));
        assert_eq!(parse("2 $ 3").unwrap_err().position, 2);
        assert_eq!(parse("sin t").unwrap_err().position, 0);
        assert_eq!(parse("|t").unwrap_err().position, 2);
        assert_eq!(parse("1 2)").unwrap_err().position, 3);
        assert!(parse("log(2)").is_err());
    }

    #[test]
    fn implicit_products_bind_tighter_than_modulo() {
        assert_eq!(
            parse("pi % 2pi").unwrap(),
            Expr::modulo(Expr::Pi, Expr::multiply(Expr::number(2.0), Expr::Pi))
        );
        assert_eq!(eval("7 % 2t", 2.0), 3.0);
        assert_eq!(eval("12 / 2|t|", -3.0), 2.0);
        assert_eq!(eval("8 / 4floor(t)", 1.5), 2.0);
        assert_eq!(eval("6 * 2t", 1.0), 12.0);
    }

    #[test]
    fn nesting_is_limited() {
        let nested = |n: usize| format!("{}t{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(eval(&nested(100), 3.0), 3.0);
        assert_eq!(parse(&nested(300)).unwrap_err().message, "expression is nested too deeply");
        assert!(parse(&nested(200_000)).is_err());
        assert!(parse(&"-".repeat(1000)).is_err());
        assert!(parse(&format!("2{}", "^2".repeat(1000))).is_err());
    }

    #[test]
    fn long_chains_are_limited() {
        let chain = |n: usize| vec!["t"; n].join("+");
        assert_eq!(eval(&chain(100), 1.0), 100.0);
        assert_eq!(parse(&chain(1000)).unwrap_err().message, "expression is nested too deeply");
        let err = parse(&chain(100_000)).unwrap_err();
        assert_eq!(err.message, "expression is too long");
        assert_eq!(err.position, MAX_TOKENS);
    }

    #[test]
    fn error_message_is_readable() {
        let err = parse("2 $ 3").unwrap_err();
        assert_eq!(err.to_string(), "unexpected character '$' at position 2");
    }

    #[test]
    fn functions_only_take_t() {
        assert!(parse_function("sin(3t) + 1").is_ok());
        let err = parse_function("t + x").unwrap_err();
        assert_eq!(err.message, "unknown variable 'x'");
        assert_eq!(err.position, 4);
    }
}
