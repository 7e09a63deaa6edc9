//! Stop specifications for stop and stop-limit orders.
//!
//! A [`StopSpec`] is either an absolute dollar amount or a relative percentage. It is
//! built directly from a `(StopKind, magnitude)` pair, or parsed from user input with
//! the small grammar below:
//!
//! ```text
//! stop            := "$"? sign? "$"? numeric trailing_marker?
//! sign            := "+" | "-"
//! numeric         := digits ("." digits?)? exponent? | "." digits exponent?
//! exponent        := ("e" | "E") sign? digits
//! trailing_marker := "%" | "$"
//! ```
//!
//! Rules:
//! - a marker is mandatory; a leading `$` wins over any trailing marker,
//! - the sign is dropped, the magnitude is always non-negative,
//! - surrounding whitespace is rejected, callers trim if they want leniency.
//!
//! ```rust
//! use trader_common::stop::{StopKind, StopSpec};
//!
//! let stop: StopSpec = "-3.25%".parse().unwrap();
//! assert_eq!(stop.kind(), StopKind::RelativePercent);
//! assert_eq!(stop.magnitude(), 3.25);
//! assert_eq!(stop.to_string(), "3.25%");
//! ```
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{SyntaxIssue, TraderError};
use crate::result::Result;

/// What the stop magnitude is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum StopKind {
    /// Price offset or threshold in dollars (`$`).
    AbsoluteDollar,
    /// Percentage move (`%`).
    RelativePercent,
}

impl StopKind {
    /// Marker character used in the textual form.
    pub fn marker(self) -> char {
        match self {
            StopKind::AbsoluteDollar => '$',
            StopKind::RelativePercent => '%',
        }
    }
}

/// Trigger condition of a stop order. Always valid once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StopSpec {
    kind: StopKind,
    magnitude: f64,
}

impl StopSpec {
    /// Build a stop from an already resolved kind and magnitude.
    ///
    /// Fails with [`TraderError::InvalidArgument`] when `magnitude` is negative, NaN
    /// or infinite.
    pub fn new(kind: StopKind, magnitude: f64) -> Result<Self> {
        if !magnitude.is_finite() || magnitude < 0.0 {
            return Err(TraderError::InvalidArgument(format!(
                "stop magnitude must be a finite non-negative number, got {}",
                magnitude
            )));
        }
        // folds -0.0 into 0.0
        Ok(Self {
            kind,
            magnitude: magnitude.abs(),
        })
    }

    /// Parse a stop from its textual form, e.g. `"$5"`, `"-3.25%"`, `"+2$"`.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(TraderError::Parse("empty stop string".to_string()));
        }
        let syntax = |issue| TraderError::Syntax {
            input: raw.to_string(),
            issue,
        };

        let mut scanner = Scanner::new(raw);
        let mut leading_dollar = scanner.eat(b'$');
        if !scanner.eat(b'+') {
            scanner.eat(b'-');
        }
        if !leading_dollar {
            leading_dollar = scanner.eat(b'$');
        }

        let numeric_start = scanner.pos;
        let mut mantissa_digits = scanner.digits();
        if scanner.eat(b'.') {
            mantissa_digits += scanner.digits();
        }
        if mantissa_digits == 0 {
            return Err(match scanner.rest() {
                "" | "$" | "%" => syntax(SyntaxIssue::MissingDigits),
                _ => syntax(scanner.unexpected()),
            });
        }
        if scanner.eat(b'e') || scanner.eat(b'E') {
            if !scanner.eat(b'+') {
                scanner.eat(b'-');
            }
            if scanner.digits() == 0 {
                return Err(syntax(SyntaxIssue::MalformedExponent));
            }
        }
        let numeric = &raw[numeric_start..scanner.pos];

        let trailing = if scanner.eat(b'%') {
            Some(StopKind::RelativePercent)
        } else if scanner.eat(b'$') {
            Some(StopKind::AbsoluteDollar)
        } else {
            None
        };
        if !scanner.rest().is_empty() {
            return Err(syntax(scanner.unexpected()));
        }

        let kind = match (leading_dollar, trailing) {
            (true, _) => StopKind::AbsoluteDollar,
            (false, Some(kind)) => kind,
            (false, None) => return Err(syntax(SyntaxIssue::MissingMarker)),
        };
        let magnitude: f64 = numeric
            .parse()
            .map_err(|e| TraderError::Parse(format!("{}: {}", numeric, e)))?;
        if !magnitude.is_finite() {
            return Err(syntax(SyntaxIssue::NotFinite));
        }
        Self::new(kind, magnitude)
    }

    /// Stop type.
    pub fn kind(&self) -> StopKind {
        self.kind
    }

    /// Non-negative magnitude; dollars or percent depending on [`Self::kind`].
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }
}

impl fmt::Display for StopSpec {
    /// Canonical form: `$<magnitude>` or `<magnitude>%`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StopKind::AbsoluteDollar => write!(f, "${}", self.magnitude),
            StopKind::RelativePercent => write!(f, "{}%", self.magnitude),
        }
    }
}

impl FromStr for StopSpec {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StopSpec {
    type Error = TraderError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<StopSpec> for String {
    fn from(stop: StopSpec) -> Self {
        stop.to_string()
    }
}

/// Untyped input, e.g. a field of a JSON order ticket. Anything but a string is a
/// [`TraderError::Parse`].
impl TryFrom<&serde_json::Value> for StopSpec {
    type Error = TraderError;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(raw) => Self::parse(raw),
            other => Err(TraderError::Parse(format!(
                "stop must be a string, got {}",
                other
            ))),
        }
    }
}

/// Byte cursor over the raw stop string. Every grammar token is ASCII.
struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.input.as_bytes().get(self.pos) == Some(&expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn digits(&mut self) -> usize {
        let count = self.input.as_bytes()[self.pos..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        self.pos += count;
        count
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn unexpected(&self) -> SyntaxIssue {
        SyntaxIssue::UnexpectedChar {
            ch: self.rest().chars().next().unwrap_or('\0'),
            pos: self.pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(raw: &str) -> SyntaxIssue {
        match StopSpec::parse(raw) {
            Err(TraderError::Syntax { issue, .. }) => issue,
            other => panic!("expected syntax error for {:?}, got {:?}", raw, other),
        }
    }

    #[test]
    fn leading_dollar_is_absolute() {
        let stop = StopSpec::parse("$5").unwrap();
        assert_eq!(stop.kind(), StopKind::AbsoluteDollar);
        assert_eq!(stop.magnitude(), 5.0);
    }

    #[test]
    fn trailing_percent_is_relative() {
        let stop = StopSpec::parse("-3.25%").unwrap();
        assert_eq!(stop.kind(), StopKind::RelativePercent);
        assert_eq!(stop.magnitude(), 3.25);
    }

    #[test]
    fn trailing_dollar_is_absolute() {
        let stop = StopSpec::parse("+2$").unwrap();
        assert_eq!(stop, StopSpec::new(StopKind::AbsoluteDollar, 2.0).unwrap());
    }

    #[test]
    fn sign_is_dropped_from_magnitude() {
        assert_eq!(StopSpec::parse("-$5").unwrap().magnitude(), 5.0);
        assert_eq!(StopSpec::parse("$-5").unwrap().magnitude(), 5.0);
        assert_eq!(StopSpec::parse("-0.5%").unwrap().magnitude(), 0.5);
        assert_eq!(StopSpec::parse("-0%").unwrap().magnitude(), 0.0);
        assert_eq!(
            StopSpec::parse("-7%").unwrap(),
            StopSpec::parse("+7%").unwrap()
        );
    }

    #[test]
    fn leading_marker_wins_over_trailing() {
        let stop = StopSpec::parse("$5%").unwrap();
        assert_eq!(stop.kind(), StopKind::AbsoluteDollar);
        assert_eq!(stop.magnitude(), 5.0);
        assert_eq!(StopSpec::parse("$5$").unwrap().kind(), StopKind::AbsoluteDollar);
    }

    #[test]
    fn fraction_forms() {
        assert_eq!(StopSpec::parse("$.5").unwrap().magnitude(), 0.5);
        assert_eq!(StopSpec::parse("5.%").unwrap().magnitude(), 5.0);
        assert_eq!(StopSpec::parse("$12.125").unwrap().magnitude(), 12.125);
    }

    #[test]
    fn exponent_is_applied() {
        assert_eq!(StopSpec::parse("1e2%").unwrap().magnitude(), 100.0);
        assert_eq!(StopSpec::parse("$2.5E-1").unwrap().magnitude(), 0.25);
        assert_eq!(StopSpec::parse("5e+1$").unwrap().magnitude(), 50.0);
    }

    #[test]
    fn empty_is_parse_error() {
        assert!(matches!(StopSpec::parse(""), Err(TraderError::Parse(_))));
    }

    #[test]
    fn digits_without_marker() {
        assert_eq!(issue("2"), SyntaxIssue::MissingMarker);
        assert_eq!(issue("-3.25"), SyntaxIssue::MissingMarker);
    }

    #[test]
    fn marker_without_digits() {
        assert_eq!(issue("$"), SyntaxIssue::MissingDigits);
        assert_eq!(issue("%"), SyntaxIssue::MissingDigits);
        assert_eq!(issue("-$"), SyntaxIssue::MissingDigits);
        assert_eq!(issue("$."), SyntaxIssue::MissingDigits);
    }

    #[test]
    fn malformed_exponent() {
        assert_eq!(issue("5e%"), SyntaxIssue::MalformedExponent);
        assert_eq!(issue("$1e+"), SyntaxIssue::MalformedExponent);
        assert_eq!(issue("$1E-x"), SyntaxIssue::MalformedExponent);
    }

    #[test]
    fn whitespace_is_not_trimmed() {
        assert_eq!(issue(" $5"), SyntaxIssue::UnexpectedChar { ch: ' ', pos: 0 });
        assert_eq!(issue("$5 "), SyntaxIssue::UnexpectedChar { ch: ' ', pos: 2 });
    }

    #[test]
    fn stray_characters() {
        assert_eq!(issue("$$5"), SyntaxIssue::UnexpectedChar { ch: '$', pos: 1 });
        assert_eq!(issue("5%%"), SyntaxIssue::UnexpectedChar { ch: '%', pos: 2 });
        assert_eq!(issue("abc"), SyntaxIssue::UnexpectedChar { ch: 'a', pos: 0 });
        assert_eq!(issue("+-5%"), SyntaxIssue::UnexpectedChar { ch: '-', pos: 1 });
    }

    #[test]
    fn overflow_is_not_finite() {
        assert_eq!(issue("1e999%"), SyntaxIssue::NotFinite);
    }

    #[test]
    fn direct_construction_validates() {
        assert!(StopSpec::new(StopKind::RelativePercent, -1.0).is_err());
        assert!(StopSpec::new(StopKind::RelativePercent, f64::NAN).is_err());
        assert!(StopSpec::new(StopKind::AbsoluteDollar, f64::INFINITY).is_err());
        assert_eq!(
            StopSpec::new(StopKind::AbsoluteDollar, -0.0).unwrap().to_string(),
            "$0"
        );
    }

    #[test]
    fn pair_and_canonical_string_agree() {
        let direct = StopSpec::new(StopKind::RelativePercent, 3.25).unwrap();
        assert_eq!(direct.to_string(), "3.25%");
        assert_eq!(direct, "3.25%".parse().unwrap());

        let direct = StopSpec::new(StopKind::AbsoluteDollar, 5.0).unwrap();
        assert_eq!(direct.to_string(), "$5");
        assert_eq!(direct, "$5".parse().unwrap());
    }

    #[test]
    fn non_string_json_is_parse_error() {
        let number = serde_json::json!(5);
        assert!(matches!(
            StopSpec::try_from(&number),
            Err(TraderError::Parse(_))
        ));
        assert!(matches!(
            StopSpec::try_from(&serde_json::Value::Null),
            Err(TraderError::Parse(_))
        ));
        let text = serde_json::json!("$5");
        assert_eq!(StopSpec::try_from(&text).unwrap().magnitude(), 5.0);
    }

    #[test]
    fn serde_uses_canonical_string() {
        let stop = StopSpec::parse("-3.25%").unwrap();
        let json = serde_json::to_string(&stop).unwrap();
        assert_eq!(json, "\"3.25%\"");
        let back: StopSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stop);
        assert!(serde_json::from_str::<StopSpec>("\"12\"").is_err());
        assert!(serde_json::from_str::<StopSpec>("12").is_err());
    }

    #[test]
    fn kind_names_parse_case_insensitively() {
        assert_eq!(
            "relativepercent".parse::<StopKind>().unwrap(),
            StopKind::RelativePercent
        );
        assert_eq!(StopKind::AbsoluteDollar.to_string(), "AbsoluteDollar");
        assert_eq!(StopKind::RelativePercent.marker(), '%');
    }
}
