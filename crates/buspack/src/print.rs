//! # Textual form
//!
//! Renders values the way bus tooling prints them, without type annotations
//! except where the text would otherwise be ambiguous (empty containers).
//!
//! ```text
//! 'text'   42   0x0a   true   1.5   '/org/x'   <'boxed'>
//! ['a', 'b']   @as []   {'k': <1>}   ('a', 1)   ('single',)
//! ```

use std::fmt;
use std::fmt::Write;

use crate::Value;

/// Prints a value to a string.
pub fn print(value: &Value) -> String {
    value.to_string()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Byte(v) => write!(f, "0x{:02x}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Double(v) => write_double(f, *v),
            Value::Str(s) => write_quoted(f, s),
            Value::ObjectPath(p) => write_quoted(f, p.as_str()),
            Value::Signature(s) => write_quoted(f, s.as_str()),
            Value::Variant(inner) => write!(f, "<{}>", inner),
            Value::Array(a) => {
                if a.is_empty() {
                    return write!(f, "@{} []", self.signature());
                }
                f.write_char('[')?;
                for (i, item) in a.items().iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{}", item)?;
                }
                f.write_char(']')
            }
            Value::Dict(d) => {
                if d.is_empty() {
                    return write!(f, "@{} {{}}", self.signature());
                }
                f.write_char('{')?;
                for (i, (k, v)) in d.entries().iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_char('}')
            }
            Value::Struct(fields) => {
                f.write_char('(')?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{}", field)?;
                }
                if fields.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
        }
    }
}

/// Significant digits of a printed double, enough to read back the same bits.
const DOUBLE_DIGITS: i32 = 17;

/// C `%.17g`, with `.0` appended when the result would read as an integer.
fn write_double(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("nan");
    }
    if v.is_infinite() {
        return f.write_str(if v < 0.0 { "-inf" } else { "inf" });
    }

    let scientific = format!("{:.*e}", (DOUBLE_DIGITS - 1) as usize, v);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return f.write_str(&scientific);
    };
    let exponent: i32 = exponent.parse().map_err(|_| fmt::Error)?;

    if exponent < -4 || exponent >= DOUBLE_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(f, "{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let fixed = format!("{:.*}", (DOUBLE_DIGITS - 1 - exponent) as usize, v);
        let fixed = trim_fraction(&fixed);
        f.write_str(fixed)?;
        if !fixed.contains('.') {
            f.write_str(".0")?;
        }
        Ok(())
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('\'')?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('\'')
}
