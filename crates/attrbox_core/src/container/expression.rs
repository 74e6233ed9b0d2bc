//! Single-comparison filter expressions.
//!
//! # Responsibility
//! - Parse `attribute_name == "literal"` style filters into a typed
//!   [`Comparison`].
//! - Evaluate a comparison against a name-to-value lookup.
//!
//! # Invariants
//! - Parsing never panics; malformed input is reported as
//!   [`ExpressionError`].
//! - Evaluation against an unknown attribute yields `None`, never an error.

use crate::container::value::AttributeValue;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static COMPARISON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(==|!=)\s*(\S.*?)\s*$")
        .expect("valid comparison regex")
});
static INTEGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("valid integer regex"));
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
        .expect("valid float regex")
});

/// Operator of a single comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
}

impl ComparisonOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            _ => None,
        }
    }
}

/// Parsed `attribute operator literal` node.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub attribute_name: String,
    pub operator: ComparisonOperator,
    pub literal: AttributeValue,
}

impl Comparison {
    /// Evaluates this comparison using `lookup` to read live values.
    ///
    /// Returns `None` when `lookup` does not know the attribute.
    pub fn evaluate<F>(&self, lookup: F) -> Option<bool>
    where
        F: FnOnce(&str) -> Option<AttributeValue>,
    {
        let value = lookup(self.attribute_name.as_str())?;
        let equal = value == self.literal;
        Some(match self.operator {
            ComparisonOperator::Equal => equal,
            ComparisonOperator::NotEqual => !equal,
        })
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {:?}",
            self.attribute_name,
            self.operator.as_str(),
            self.literal
        )
    }
}

/// Parses one comparison expression.
///
/// Supported literals: quoted strings (`"..."` or `'...'`), integers,
/// floats, `True`/`False`/`true`/`false` and `None`/`null`.
///
/// # Errors
/// - `Empty` for blank input.
/// - `Unsupported` when the input is not a single comparison.
/// - `InvalidLiteral` when the right-hand side is not a supported literal.
pub fn parse_expression(expression: &str) -> Result<Comparison, ExpressionError> {
    if expression.trim().is_empty() {
        return Err(ExpressionError::Empty);
    }

    let captures = COMPARISON_RE
        .captures(expression)
        .ok_or(ExpressionError::Unsupported)?;
    let operator =
        ComparisonOperator::parse(&captures[2]).ok_or(ExpressionError::Unsupported)?;
    let literal = parse_literal(&captures[3])?;

    Ok(Comparison {
        attribute_name: captures[1].to_string(),
        operator,
        literal,
    })
}

fn parse_literal(raw: &str) -> Result<AttributeValue, ExpressionError> {
    match raw {
        "True" | "true" => return Ok(AttributeValue::Bool(true)),
        "False" | "false" => return Ok(AttributeValue::Bool(false)),
        "None" | "null" => return Ok(AttributeValue::Null),
        _ => {}
    }

    if let Some(quote) = raw.chars().next().filter(|c| *c == '"' || *c == '\'') {
        return parse_quoted(raw, quote).map(AttributeValue::String);
    }

    if INTEGER_RE.is_match(raw) {
        return raw
            .parse::<i64>()
            .map(AttributeValue::Integer)
            .map_err(|_| ExpressionError::InvalidLiteral(raw.to_string()));
    }
    if FLOAT_RE.is_match(raw) {
        return raw
            .parse::<f64>()
            .map(AttributeValue::Float)
            .map_err(|_| ExpressionError::InvalidLiteral(raw.to_string()));
    }

    Err(ExpressionError::InvalidLiteral(raw.to_string()))
}

fn parse_quoted(raw: &str, quote: char) -> Result<String, ExpressionError> {
    let invalid = || ExpressionError::InvalidLiteral(raw.to_string());
    let mut chars = raw.chars().skip(1);
    let mut value = String::new();

    loop {
        match chars.next() {
            None => return Err(invalid()),
            Some('\\') => match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(c) if c == '\\' || c == '"' || c == '\'' => value.push(c),
                _ => return Err(invalid()),
            },
            Some(c) if c == quote => break,
            Some(c) => value.push(c),
        }
    }

    // Closing quote must be the last character.
    if chars.next().is_some() {
        return Err(invalid());
    }
    Ok(value)
}

/// Expression parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    Empty,
    Unsupported,
    InvalidLiteral(String),
}

impl ExpressionError {
    /// Metadata-only code, safe to log without echoing user input.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Unsupported => "unsupported",
            Self::InvalidLiteral(_) => "invalid_literal",
        }
    }
}

impl Display for ExpressionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "expression must not be empty"),
            Self::Unsupported => write!(
                f,
                "expression is unsupported (expected `name == literal` or `name != literal`)"
            ),
            Self::InvalidLiteral(value) => write!(f, "expression literal is invalid: {value}"),
        }
    }
}

impl Error for ExpressionError {}

#[cfg(test)]
mod tests {
    use super::{parse_expression, Comparison, ComparisonOperator, ExpressionError};
    use crate::container::value::AttributeValue;

    fn lookup_value(name: &str) -> Option<AttributeValue> {
        match name {
            "attribute_name" => Some(AttributeValue::from("value")),
            "count" => Some(AttributeValue::from(3_i64)),
            _ => None,
        }
    }

    #[test]
    fn parses_double_quoted_equality() {
        let comparison = parse_expression(r#"attribute_name == "value""#).unwrap();
        assert_eq!(
            comparison,
            Comparison {
                attribute_name: "attribute_name".to_string(),
                operator: ComparisonOperator::Equal,
                literal: AttributeValue::from("value"),
            }
        );
    }

    #[test]
    fn parses_single_quotes_and_escapes() {
        let comparison = parse_expression(r#"  name=='it\'s'  "#).unwrap();
        assert_eq!(comparison.literal, AttributeValue::from("it's"));
    }

    #[test]
    fn parses_scalar_literals() {
        assert_eq!(
            parse_expression("count == 3").unwrap().literal,
            AttributeValue::Integer(3)
        );
        assert_eq!(
            parse_expression("ratio == -0.5").unwrap().literal,
            AttributeValue::Float(-0.5)
        );
        assert_eq!(
            parse_expression("flag == True").unwrap().literal,
            AttributeValue::Bool(true)
        );
        assert_eq!(
            parse_expression("missing == None").unwrap().literal,
            AttributeValue::Null
        );
        assert_eq!(
            parse_expression("a != 'b'").unwrap().operator,
            ComparisonOperator::NotEqual
        );
    }

    #[test]
    fn parses_exponent_and_leading_dot_floats() {
        assert_eq!(
            parse_expression("x == 1e5").unwrap().literal,
            AttributeValue::Float(100_000.0)
        );
        assert_eq!(
            parse_expression("x == .5").unwrap().literal,
            AttributeValue::Float(0.5)
        );
        assert_eq!(
            parse_expression("x == -2.5E-1").unwrap().literal,
            AttributeValue::Float(-0.25)
        );
        assert!(matches!(
            parse_expression("x == 1e").unwrap_err(),
            ExpressionError::InvalidLiteral(_)
        ));
        assert!(matches!(
            parse_expression("x == .").unwrap_err(),
            ExpressionError::InvalidLiteral(_)
        ));
    }

    #[test]
    fn rejects_unsupported_shapes() {
        assert_eq!(parse_expression("").unwrap_err(), ExpressionError::Empty);
        assert_eq!(
            parse_expression("bogus").unwrap_err(),
            ExpressionError::Unsupported
        );
        assert_eq!(
            parse_expression("a > 1").unwrap_err(),
            ExpressionError::Unsupported
        );
        assert_eq!(
            parse_expression(r#"a == "x" and b == "y""#).unwrap_err(),
            ExpressionError::InvalidLiteral(r#""x" and b == "y""#.to_string())
        );
        assert!(matches!(
            parse_expression(r#"a == "unterminated"#).unwrap_err(),
            ExpressionError::InvalidLiteral(_)
        ));
        assert!(matches!(
            parse_expression("a == bare_word").unwrap_err(),
            ExpressionError::InvalidLiteral(_)
        ));
    }

    #[test]
    fn evaluates_against_lookup() {
        let matching = parse_expression(r#"attribute_name == "value""#).unwrap();
        assert_eq!(matching.evaluate(lookup_value), Some(true));

        let differing = parse_expression(r#"attribute_name == "bogus""#).unwrap();
        assert_eq!(differing.evaluate(lookup_value), Some(false));

        let negated = parse_expression(r#"attribute_name != "bogus""#).unwrap();
        assert_eq!(negated.evaluate(lookup_value), Some(true));

        let numeric = parse_expression("count == 3.0").unwrap();
        assert_eq!(numeric.evaluate(lookup_value), Some(true));

        let unknown = parse_expression(r#"bogus == "value""#).unwrap();
        assert_eq!(unknown.evaluate(lookup_value), None);
    }

    #[test]
    fn error_codes_do_not_echo_input() {
        let err = parse_expression("a == secret_word").unwrap_err();
        assert_eq!(err.code(), "invalid_literal");
        assert!(!err.code().contains("secret"));
    }
}
