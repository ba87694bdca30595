//! Numeric literal values and folding arithmetic.
//!
//! Integers are two's-complement `i64`; any float operand promotes the
//! result to `f64`. Literal text accepts `0x`/`0o`/`0b` radix prefixes.

/// Value of an `int` or `float` literal node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn add(self, other: Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => Num::Int(a.wrapping_add(b)),
            (a, b) => Num::Float(a.as_f64() + b.as_f64()),
        }
    }

    pub fn sub(self, other: Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => Num::Int(a.wrapping_sub(b)),
            (a, b) => Num::Float(a.as_f64() - b.as_f64()),
        }
    }

    pub fn mul(self, other: Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => Num::Int(a.wrapping_mul(b)),
            (a, b) => Num::Float(a.as_f64() * b.as_f64()),
        }
    }

    /// Negation, preserving the literal type.
    pub fn neg(self) -> Num {
        match self {
            Num::Int(v) => Num::Int(v.wrapping_neg()),
            Num::Float(v) => Num::Float(-v),
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Num::Int(v) => v == 0,
            Num::Float(v) => v == 0.0,
        }
    }

    pub fn is_one(self) -> bool {
        match self {
            Num::Int(v) => v == 1,
            Num::Float(v) => v == 1.0,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(v) => v as f64,
            Num::Float(v) => v,
        }
    }
}

/// Parse an integer literal, honoring `0x`/`0o`/`0b` prefixes and a sign.
///
/// Panics on malformed text; literal well-formedness is the front-end's
/// contract.
pub fn parse_int(s: &str) -> i64 {
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let v = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if let Some(oct) = body.strip_prefix("0o").or_else(|| body.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8)
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2)
    } else {
        body.parse()
    };
    let v = v.unwrap_or_else(|_| panic!("malformed int literal {s:?}"));
    if neg { v.wrapping_neg() } else { v }
}

/// Parse a float literal.
pub fn parse_float(s: &str) -> f64 {
    s.parse()
        .unwrap_or_else(|_| panic!("malformed float literal {s:?}"))
}

/// Render a float so it re-parses to the identical double.
///
/// Rust's shortest-round-trip display already guarantees this; integral
/// values keep a trailing `.0` so the literal stays float-tagged on re-read.
pub fn render_float(v: f64) -> String {
    let s = v.to_string();
    if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{s}.0")
    }
}
