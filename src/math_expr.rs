//! Restricted arithmetic for size and offset fields in signature definitions.
//!
//! Signature descriptions sometimes carry a symbolic value such as
//! `"0x200*4"` where a literal size is expected. This module evaluates such
//! text without any general-purpose interpreter: the syntax tree has exactly
//! two node kinds, a numeric literal and a binary operation over
//! `+ - * / ^ xor`. There are no names, calls, assignments or unary operators,
//! so evaluation can only ever produce a number or fail.
//!
//! # Grammar
//! ```text
//! expr  := sum ( "xor" sum )*
//! sum   := term ( ("+" | "-") term )*
//! term  := power ( ("*" | "/") power )*
//! power := atom ( ("^" | "**") power )?      right-associative
//! atom  := NUMBER | "(" expr ")"
//! ```
//! Numbers are decimal integers, `0x`/`0o`/`0b` integers, or decimal floats
//! with an optional exponent. `_` may separate digits.
//!
//! # Semantics
//! - `/` is true division and always yields a float.
//! - Integers are 128-bit, so every unsigned 64-bit size, offset or mask is
//!   representable. Integer `+ - * ^` are checked; overflow is a failure, not
//!   a wrap.
//! - `^` with a negative integer exponent yields a float.
//! - `xor` requires two integers.
//! - Any float result that is not finite is a failure.
//! - At most [`MAX_OPERATORS`] binary operators. Evaluation recurses over the
//!   tree, so the budget bounds stack use for long flat chains like `1+1+...`.
//!
//! # Failure model
//! [`evaluate`] folds every failure into `None`. Definitions are
//! hand-written and a missing numeric hint is expected; callers fall back to
//! a literal or default value. [`Expr::parse`] and [`Expr::eval`] expose the
//! reason when it matters.

use std::fmt;

use tracing::trace;

/// Maximum nesting of parentheses and right-associative powers.
pub const MAX_DEPTH: usize = 64;

/// Maximum number of binary operators in one expression.
pub const MAX_OPERATORS: usize = 1024;

/// Result of an evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    /// Integer value, if this is an integer or an integral float in range.
    pub fn as_i128(self) -> Option<i128> {
        match self {
            Number::Int(v) => Some(v),
            Number::Float(v) => {
                if v.fract() == 0.0 && v >= i128::MIN as f64 && v < i128::MAX as f64 {
                    Some(v as i128)
                } else {
                    None
                }
            }
        }
    }

    pub fn as_i64(self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// Non-negative integer value, for sizes and offsets.
    pub fn as_u64(self) -> Option<u64> {
        self.as_i128().and_then(|v| u64::try_from(v).ok())
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::Float(v) if v.fract() == 0.0 => write!(f, "{v:.1}"),
            Number::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Xor,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
            BinOp::Xor => "xor",
        };
        f.write_str(s)
    }
}

/// Parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Number),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Why an expression could not be evaluated.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExprError {
    Empty,
    UnexpectedChar { ch: char, pos: usize },
    BadNumber { pos: usize },
    /// Names, calls, unary operators and other constructs outside the grammar.
    Unsupported { what: &'static str, pos: usize },
    UnexpectedEnd,
    TrailingInput { pos: usize },
    TooDeep,
    TooManyOperators,
    DivisionByZero,
    Overflow,
    XorOnFloat,
    NonFinite,
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::Empty => write!(f, "empty expression"),
            ExprError::UnexpectedChar { ch, pos } => {
                write!(f, "unexpected character {ch:?} at {pos}")
            }
            ExprError::BadNumber { pos } => write!(f, "malformed number at {pos}"),
            ExprError::Unsupported { what, pos } => write!(f, "unsupported {what} at {pos}"),
            ExprError::UnexpectedEnd => write!(f, "unexpected end of expression"),
            ExprError::TrailingInput { pos } => write!(f, "unexpected input at {pos}"),
            ExprError::TooDeep => write!(f, "expression nested deeper than {MAX_DEPTH}"),
            ExprError::TooManyOperators => {
                write!(f, "expression has more than {MAX_OPERATORS} operators")
            }
            ExprError::DivisionByZero => write!(f, "division by zero"),
            ExprError::Overflow => write!(f, "integer overflow"),
            ExprError::XorOnFloat => write!(f, "xor requires integer operands"),
            ExprError::NonFinite => write!(f, "result is not a finite number"),
        }
    }
}

impl std::error::Error for ExprError {}

/// Evaluates `text`, returning `None` if it is not a valid expression.
pub fn evaluate(text: &str) -> Option<Number> {
    match Expr::parse(text).and_then(|expr| expr.eval()) {
        Ok(value) => Some(value),
        Err(err) => {
            trace!(expression = text, %err, "expression not evaluated");
            None
        }
    }
}

/// An expression string together with its value, if it has one.
#[derive(Clone, Debug, PartialEq)]
pub struct MathExpression {
    expression: String,
    value: Option<Number>,
}

impl MathExpression {
    pub fn new(expression: impl Into<String>) -> Self {
        let expression = expression.into();
        let value = evaluate(&expression);
        Self { expression, value }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn value(&self) -> Option<Number> {
        self.value
    }
}

impl Expr {
    /// Parses `text` into a tree.
    pub fn parse(text: &str) -> Result<Expr, ExprError> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
            operators: 0,
        };
        let expr = parser.parse_xor()?;
        match parser.tokens.get(parser.pos) {
            None => Ok(expr),
            Some(tok) => Err(ExprError::TrailingInput { pos: tok.pos }),
        }
    }

    /// Evaluates the tree.
    pub fn eval(&self) -> Result<Number, ExprError> {
        match self {
            Expr::Literal(n) => Ok(*n),
            Expr::Binary { op, lhs, rhs } => apply(*op, lhs.eval()?, rhs.eval()?),
        }
    }
}

fn apply(op: BinOp, lhs: Number, rhs: Number) -> Result<Number, ExprError> {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => apply_int(op, a, b),
        _ => {
            if op == BinOp::Xor {
                return Err(ExprError::XorOnFloat);
            }
            apply_float(op, lhs.as_f64(), rhs.as_f64())
        }
    }
}

fn apply_int(op: BinOp, a: i128, b: i128) -> Result<Number, ExprError> {
    let value = match op {
        BinOp::Add => a.checked_add(b).ok_or(ExprError::Overflow)?,
        BinOp::Sub => a.checked_sub(b).ok_or(ExprError::Overflow)?,
        BinOp::Mul => a.checked_mul(b).ok_or(ExprError::Overflow)?,
        BinOp::Xor => a ^ b,
        BinOp::Div => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            return finite(a as f64 / b as f64);
        }
        BinOp::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(ExprError::DivisionByZero);
                }
                return finite((a as f64).powf(b as f64));
            }
            let exp = u32::try_from(b).map_err(|_| ExprError::Overflow)?;
            a.checked_pow(exp).ok_or(ExprError::Overflow)?
        }
    };
    Ok(Number::Int(value))
}

fn apply_float(op: BinOp, a: f64, b: f64) -> Result<Number, ExprError> {
    match op {
        BinOp::Add => finite(a + b),
        BinOp::Sub => finite(a - b),
        BinOp::Mul => finite(a * b),
        BinOp::Div => {
            if b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            finite(a / b)
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            finite(a.powf(b))
        }
        BinOp::Xor => Err(ExprError::XorOnFloat),
    }
}

fn finite(v: f64) -> Result<Number, ExprError> {
    if v.is_finite() {
        Ok(Number::Float(v))
    } else {
        Err(ExprError::NonFinite)
    }
}

// --------------------------
// Lexer
// --------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
enum TokenKind {
    Num(Number),
    Op(BinOp),
    LParen,
    RParen,
}

#[derive(Clone, Copy, Debug)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

fn tokenize(text: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        let start = i;
        let kind = match b {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            b'+' => TokenKind::Op(BinOp::Add),
            b'-' => TokenKind::Op(BinOp::Sub),
            b'/' => TokenKind::Op(BinOp::Div),
            b'^' => TokenKind::Op(BinOp::Pow),
            b'*' => {
                if bytes.get(i + 1) == Some(&b'*') {
                    i += 1;
                    TokenKind::Op(BinOp::Pow)
                } else {
                    TokenKind::Op(BinOp::Mul)
                }
            }
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'0'..=b'9' | b'.' => {
                let (number, end) = lex_number(bytes, i)?;
                i = end;
                tokens.push(Token {
                    kind: TokenKind::Num(number),
                    pos: start,
                });
                continue;
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let end = bytes[i..]
                    .iter()
                    .position(|c| !(c.is_ascii_alphanumeric() || *c == b'_'))
                    .map_or(bytes.len(), |n| i + n);
                if &text[i..end] != "xor" {
                    return Err(ExprError::Unsupported {
                        what: "name",
                        pos: start,
                    });
                }
                i = end;
                tokens.push(Token {
                    kind: TokenKind::Op(BinOp::Xor),
                    pos: start,
                });
                continue;
            }
            _ => {
                let ch = text[i..].chars().next().unwrap_or('\u{fffd}');
                return Err(ExprError::UnexpectedChar { ch, pos: start });
            }
        };
        i += 1;
        tokens.push(Token { kind, pos: start });
    }

    Ok(tokens)
}

/// Lexes a numeric literal starting at `start`; returns it and the end index.
fn lex_number(bytes: &[u8], start: usize) -> Result<(Number, usize), ExprError> {
    let bad = ExprError::BadNumber { pos: start };

    if bytes[start] == b'0' {
        let radix = match bytes.get(start + 1) {
            Some(b'x' | b'X') => Some(16),
            Some(b'o' | b'O') => Some(8),
            Some(b'b' | b'B') => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            let digits_start = start + 2;
            let end = scan_while(bytes, digits_start, |c| c.is_ascii_alphanumeric() || c == b'_');
            let digits = clean_digits(&bytes[digits_start..end]).ok_or(bad.clone())?;
            let value = i128::from_str_radix(&digits, radix).map_err(|err| {
                if matches!(
                    err.kind(),
                    std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow
                ) {
                    ExprError::Overflow
                } else {
                    bad.clone()
                }
            })?;
            return Ok((Number::Int(value), end));
        }
    }

    let mut end = scan_while(bytes, start, |c| c.is_ascii_digit() || c == b'_');
    let mut is_float = false;

    if bytes.get(end) == Some(&b'.') {
        is_float = true;
        end = scan_while(bytes, end + 1, |c| c.is_ascii_digit() || c == b'_');
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = scan_while(bytes, exp, |c| c.is_ascii_digit() || c == b'_');
        if exp_end == exp {
            return Err(bad);
        }
        is_float = true;
        end = exp_end;
    }
    // A literal running straight into a name (`12abc`) is malformed.
    if bytes
        .get(end)
        .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_' || *c == b'.')
    {
        return Err(bad);
    }

    let raw = &bytes[start..end];
    if is_float {
        let text = clean_float(raw).ok_or(bad.clone())?;
        let value: f64 = text.parse().map_err(|_| bad)?;
        return Ok((Number::Float(value), end));
    }

    let digits = clean_digits(raw).ok_or(bad.clone())?;
    let value = digits.parse::<i128>().map_err(|_| ExprError::Overflow)?;
    Ok((Number::Int(value), end))
}

fn scan_while(bytes: &[u8], from: usize, pred: impl Fn(u8) -> bool) -> usize {
    bytes[from..]
        .iter()
        .position(|&c| !pred(c))
        .map_or(bytes.len(), |n| from + n)
}

/// Drops `_` separators; rejects empty runs and misplaced separators.
fn clean_digits(raw: &[u8]) -> Option<String> {
    if raw.is_empty() || raw[0] == b'_' || raw[raw.len() - 1] == b'_' {
        return None;
    }
    if raw.windows(2).any(|w| w == b"__") {
        return None;
    }
    Some(raw.iter().filter(|&&c| c != b'_').map(|&c| c as char).collect())
}

fn clean_float(raw: &[u8]) -> Option<String> {
    // Each separator must sit between two digits.
    for (i, &c) in raw.iter().enumerate() {
        if c == b'_' {
            let before = i.checked_sub(1).map(|j| raw[j]);
            let after = raw.get(i + 1).copied();
            if !before.is_some_and(|c| c.is_ascii_digit())
                || !after.is_some_and(|c| c.is_ascii_digit())
            {
                return None;
            }
        }
    }
    let text: String = raw.iter().filter(|&&c| c != b'_').map(|&c| c as char).collect();
    // Lone "." is not a number.
    if !text.bytes().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(text)
}

// --------------------------
// Parser
// --------------------------

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser<'_> {
    fn peek_op(&self) -> Option<BinOp> {
        match self.tokens.get(self.pos)?.kind {
            TokenKind::Op(op) => Some(op),
            _ => None,
        }
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        Ok(())
    }

    fn binary(&mut self, op: BinOp, lhs: Expr, rhs: Expr) -> Result<Expr, ExprError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(ExprError::TooManyOperators);
        }
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_xor(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_sum()?;
        while self.peek_op() == Some(BinOp::Xor) {
            self.pos += 1;
            let rhs = self.parse_sum()?;
            lhs = self.binary(BinOp::Xor, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_sum(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_term()?;
        while let Some(op @ (BinOp::Add | BinOp::Sub)) = self.peek_op() {
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_power()?;
        while let Some(op @ (BinOp::Mul | BinOp::Div)) = self.peek_op() {
            self.pos += 1;
            let rhs = self.parse_power()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_power(&mut self) -> Result<Expr, ExprError> {
        let base = self.parse_atom()?;
        if self.peek_op() != Some(BinOp::Pow) {
            return Ok(base);
        }
        self.pos += 1;
        self.enter()?;
        let exp = self.parse_power()?;
        self.depth -= 1;
        self.binary(BinOp::Pow, base, exp)
    }

    fn parse_atom(&mut self) -> Result<Expr, ExprError> {
        let tok = *self.tokens.get(self.pos).ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        match tok.kind {
            TokenKind::Num(n) => Ok(Expr::Literal(n)),
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.parse_xor()?;
                self.depth -= 1;
                match self.tokens.get(self.pos) {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some(tok) => Err(ExprError::TrailingInput { pos: tok.pos }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            TokenKind::Op(BinOp::Add | BinOp::Sub) => Err(ExprError::Unsupported {
                what: "unary operator",
                pos: tok.pos,
            }),
            TokenKind::Op(_) | TokenKind::RParen => {
                Err(ExprError::TrailingInput { pos: tok.pos })
            }
        }
    }
}
