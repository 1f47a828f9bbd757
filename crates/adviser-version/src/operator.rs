//! Comparison operators used in requirement specifiers

use std::fmt;

use crate::error::VersionError;

/// Comparison operators for requirement specifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal (==)
    Equal,
    /// Not equal (!=)
    NotEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Compatible release (~=)
    Compatible,
    /// Arbitrary string equality (===)
    Arbitrary,
}

impl Operator {
    /// Parse operator from string
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        match s {
            "==" => Ok(Operator::Equal),
            "!=" => Ok(Operator::NotEqual),
            "<" => Ok(Operator::LessThan),
            "<=" => Ok(Operator::LessThanOrEqual),
            ">" => Ok(Operator::GreaterThan),
            ">=" => Ok(Operator::GreaterThanOrEqual),
            "~=" => Ok(Operator::Compatible),
            "===" => Ok(Operator::Arbitrary),
            _ => Err(VersionError::InvalidOperator(s.to_string())),
        }
    }

    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::Compatible => "~=",
            Operator::Arbitrary => "===",
        }
    }

    /// Whether the operator accepts a trailing `.*` wildcard
    pub fn allows_wildcard(&self) -> bool {
        matches!(self, Operator::Equal | Operator::NotEqual)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_operator() {
        for op in ["==", "!=", "<", "<=", ">", ">=", "~=", "==="] {
            assert_eq!(Operator::parse(op).unwrap().as_str(), op);
        }
    }

    #[test]
    fn test_parse_rejects_composer_style_operators() {
        assert!(Operator::parse("<>").is_err());
        assert!(Operator::parse("^").is_err());
        assert!(Operator::parse("=").is_err());
    }

    #[test]
    fn test_wildcards() {
        assert!(Operator::Equal.allows_wildcard());
        assert!(Operator::NotEqual.allows_wildcard());
        assert!(!Operator::GreaterThan.allows_wildcard());
    }
}
