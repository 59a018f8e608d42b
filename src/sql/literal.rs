//! Literal decoding.
//!
//! The lexer hands literals over exactly as written. These functions turn
//! that text into [`Constant`] values: integers into `i64` (or an exact
//! decimal when they do not fit), decimals without any binary floating point,
//! hex digits into bytes in written order, and string bodies with their
//! quote and backslash escapes resolved.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::sql::lexer::StringKind;
use crate::types::Constant;

/// Significant digits a [`Decimal`] holds exactly.
const MAX_DECIMAL_DIGITS: u32 = 28;

/// Decode a numeric literal, applying a folded unary minus.
pub fn decode_number(text: &str, negative: bool) -> Result<Constant> {
    let is_exact_integer = text.bytes().all(|b| b.is_ascii_digit());
    let signed = if negative {
        format!("-{text}")
    } else {
        text.to_string()
    };

    if is_exact_integer {
        if let Ok(n) = signed.parse::<i64>() {
            return Ok(Constant::Int(n));
        }
    }
    decode_decimal(&signed).map(Constant::Decimal)
}

fn decode_decimal(text: &str) -> Result<Decimal> {
    let mut normalized = text.to_ascii_lowercase();
    if let Some(rest) = normalized.strip_prefix("-.") {
        normalized = format!("-0.{rest}");
    } else if let Some(rest) = normalized.strip_prefix('.') {
        normalized = format!("0.{rest}");
    }
    normalized = normalized.replace(".e", ".0e");
    if normalized.ends_with('.') {
        normalized.push('0');
    }

    let written = WrittenDecimal::read(&normalized)
        .ok_or_else(|| Error::semantic(format!("invalid numeric literal {text}")))?;
    let parsed = if normalized.contains('e') {
        Decimal::from_scientific(&normalized)
    } else {
        Decimal::from_str(&normalized)
    };
    match parsed {
        Ok(value) if written.matches(value) => Ok(value),
        _ => Err(Error::semantic(format!(
            "numeric literal {text} exceeds {MAX_DECIMAL_DIGITS} digits of precision"
        ))),
    }
}

/// The significant digits and scale of a decimal literal as written.
/// Leading zeros and trailing fractional zeros are dropped; a negative scale
/// stands for that many trailing integer zeros.
struct WrittenDecimal {
    digits: String,
    scale: i64,
}

impl WrittenDecimal {
    fn read(text: &str) -> Option<Self> {
        let text = text.strip_prefix('-').unwrap_or(text);
        let (mantissa, exponent) = match text.split_once('e') {
            Some((m, e)) => (m, e.parse::<i64>().ok()?),
            None => (text, 0),
        };
        let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int.is_empty() || !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let mut digits = format!("{int}{frac}");
        let mut scale = i64::try_from(frac.len()).ok()?.checked_sub(exponent)?;
        while digits.ends_with('0') {
            digits.pop();
            scale -= 1;
        }
        let digits = digits.trim_start_matches('0').to_string();
        Some(WrittenDecimal { digits, scale })
    }

    /// Whether `value` holds exactly the written digits.
    fn matches(&self, value: Decimal) -> bool {
        let value = value.normalize();
        if value.is_zero() || self.digits.is_empty() {
            return value.is_zero() && self.digits.is_empty();
        }
        let digits = value.mantissa().unsigned_abs().to_string();
        let scale = i64::from(value.scale());
        if self.scale >= 0 {
            return digits == self.digits && scale == self.scale;
        }
        let padding = self.scale.unsigned_abs();
        scale == 0
            && digits.len() as u64 == self.digits.len() as u64 + padding
            && digits.starts_with(&self.digits)
            && digits[self.digits.len()..].bytes().all(|b| b == b'0')
    }
}

/// Decode hex digits, two per byte, left to right.
pub fn decode_hex(digits: &str) -> Result<Vec<u8>> {
    if digits.len() % 2 != 0 {
        return Err(Error::semantic(format!(
            "hexadecimal literal '{digits}' has an odd number of digits"
        )));
    }
    hex::decode(digits)
        .map_err(|e| Error::semantic(format!("invalid hexadecimal literal '{digits}': {e}")))
}

/// Decode a string literal body.
///
/// `backslash_escapes` applies to every kind except [`StringKind::Escaped`],
/// which always resolves backslashes. An escaped string made only of `\x`
/// hex groups (`E'\x4202'`, `E'\x42\x02'`) is a binary literal.
pub fn decode_string(body: &str, kind: StringKind, backslash_escapes: bool) -> Result<Constant> {
    if kind == StringKind::Escaped {
        if let Some(groups) = hex_escape_groups(body) {
            let mut bytes = Vec::new();
            for digits in groups {
                bytes.extend(decode_hex(digits)?);
            }
            return Ok(Constant::Binary(bytes));
        }
    }
    let escapes = backslash_escapes || kind == StringKind::Escaped;
    Ok(Constant::String(unescape(body, kind.quote(), escapes)))
}

/// The digit groups of a body shaped `\xHH..\xHH..`, or `None`.
fn hex_escape_groups(body: &str) -> Option<Vec<&str>> {
    let rest = body.strip_prefix("\\x")?;
    let groups: Vec<&str> = rest.split("\\x").collect();
    groups
        .iter()
        .all(|g| !g.is_empty() && g.bytes().all(|b| b.is_ascii_hexdigit()))
        .then_some(groups)
}

fn unescape(body: &str, quote: char, backslash_escapes: bool) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == quote && chars.peek() == Some(&quote) {
            chars.next();
            out.push(quote);
            continue;
        }
        if c != '\\' || !backslash_escapes {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('b') => out.push('\u{8}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('Z') => out.push('\u{1a}'),
            // LIKE wildcards keep their backslash.
            Some(w @ ('%' | '_')) => {
                out.push('\\');
                out.push(w);
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// The single character of a LIKE `ESCAPE` clause.
pub fn escape_character(value: &Constant) -> Result<char> {
    if let Constant::String(s) = value {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(c);
        }
    }
    Err(Error::semantic(format!(
        "ESCAPE expects a single character, found {value}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Constant {
        Constant::Decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn integers() {
        assert_eq!(decode_number("42", false).unwrap(), Constant::Int(42));
        assert_eq!(decode_number("42", true).unwrap(), Constant::Int(-42));
        assert_eq!(
            decode_number("9223372036854775808", true).unwrap(),
            Constant::Int(i64::MIN)
        );
    }

    #[test]
    fn oversized_integers_become_decimals() {
        assert_eq!(
            decode_number("9223372036854775808", false).unwrap(),
            dec("9223372036854775808")
        );
    }

    #[test]
    fn decimals_are_exact() {
        assert_eq!(decode_number("12.50", false).unwrap(), dec("12.50"));
        assert_eq!(decode_number(".5", true).unwrap(), dec("-0.5"));
        assert_eq!(decode_number("7.", false).unwrap(), dec("7.0"));
        assert_eq!(decode_number("0.1", false).unwrap().to_string(), "0.1");
        assert_eq!(decode_number("1e3", false).unwrap(), dec("1000"));
        assert_eq!(decode_number("2.5E-3", false).unwrap(), dec("0.0025"));
    }

    #[test]
    fn decimals_keep_every_written_digit() {
        let long = "1.00000000000000000000000000001";
        assert_eq!(
            decode_number(long, false).unwrap_err(),
            Error::semantic(format!("numeric literal {long} exceeds 28 digits of precision"))
        );
        assert!(matches!(
            decode_number("0.0000000000000000000000000000001", false),
            Err(Error::Semantic(_))
        ));
        let wide = "9".repeat(32);
        assert_eq!(
            decode_number(&wide, false).unwrap_err(),
            Error::semantic(format!("numeric literal {wide} exceeds 28 digits of precision"))
        );

        let exact = "0.1234567890123456789012345678";
        assert_eq!(decode_number(exact, false).unwrap().to_string(), exact);
        assert_eq!(decode_number("1000.000", false).unwrap(), dec("1000"));
        assert_eq!(decode_number("0.000", false).unwrap(), dec("0"));
        assert_eq!(decode_number("12e2", false).unwrap(), dec("1200"));
    }

    #[test]
    fn out_of_range_exponents_report_precision() {
        assert_eq!(
            decode_number("1e40", false).unwrap_err(),
            Error::semantic("numeric literal 1e40 exceeds 28 digits of precision")
        );
        assert!(matches!(decode_number("1e-40", true), Err(Error::Semantic(_))));
    }

    #[test]
    fn hex_decodes_in_written_order() {
        assert_eq!(decode_hex("4202").unwrap(), vec![0x42, 0x02]);
        assert_eq!(decode_hex("ffff").unwrap(), vec![0xff, 0xff]);
        assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
        assert!(matches!(decode_hex("abc"), Err(Error::Semantic(_))));
    }

    #[test]
    fn doubled_quotes_always_collapse() {
        assert_eq!(
            decode_string("it''s", StringKind::Single, false).unwrap(),
            Constant::from("it's")
        );
        assert_eq!(
            decode_string("say \"\"hi\"\"", StringKind::Double, true).unwrap(),
            Constant::from("say \"hi\"")
        );
    }

    #[test]
    fn backslash_escape_set() {
        let decoded = decode_string(r#"a\\b\n\r\t\0\Z\"\'\b"#, StringKind::Single, true).unwrap();
        assert_eq!(decoded, Constant::from("a\\b\n\r\t\0\u{1a}\"'\u{8}"));
    }

    #[test]
    fn like_wildcards_keep_backslash() {
        assert_eq!(
            decode_string(r"50\%\_x", StringKind::Single, true).unwrap(),
            Constant::from(r"50\%\_x")
        );
    }

    #[test]
    fn unknown_escapes_drop_the_backslash() {
        assert_eq!(
            decode_string(r"\q\y", StringKind::Single, true).unwrap(),
            Constant::from("qy")
        );
    }

    #[test]
    fn backslashes_are_literal_without_escapes() {
        assert_eq!(
            decode_string(r"C:\new", StringKind::Single, false).unwrap(),
            Constant::from(r"C:\new")
        );
    }

    #[test]
    fn postgres_escape_string_hex() {
        assert_eq!(
            decode_string(r"\x4202", StringKind::Escaped, false).unwrap(),
            Constant::Binary(vec![0x42, 0x02])
        );
        assert!(decode_string(r"\x420", StringKind::Escaped, false).is_err());
        assert_eq!(
            decode_string(r"\x41\x42", StringKind::Escaped, false).unwrap(),
            Constant::Binary(vec![0x41, 0x42])
        );
        assert_eq!(
            decode_string(r"\x4142\x43", StringKind::Escaped, false).unwrap(),
            Constant::Binary(vec![0x41, 0x42, 0x43])
        );
        assert!(decode_string(r"\x41\x4", StringKind::Escaped, false).is_err());
        assert_eq!(
            decode_string(r"\x41 \x42", StringKind::Escaped, false).unwrap(),
            Constant::from("x41 x42")
        );
        assert_eq!(
            decode_string(r"\xyz", StringKind::Escaped, false).unwrap(),
            Constant::from("xyz")
        );
    }

    #[test]
    fn escape_character_must_be_single() {
        assert_eq!(escape_character(&Constant::from("!")).unwrap(), '!');
        assert!(escape_character(&Constant::from("ab")).is_err());
        assert!(escape_character(&Constant::Int(1)).is_err());
    }
}
