//! # Operator Catalog
//!
//! The closed set of filter operators. For each one the catalog knows how
//! many values it consumes from the raw value string and which
//! [`Predicate`] it becomes. The grammar only checks that a keyword is
//! listed here; all value decomposition happens in [`Operator::predicate`].

use serde::Serialize;
use std::fmt;

use crate::engine::{CompareOp, Predicate, PredicateKind};
use crate::error::{QueryError, Result};

/// How many comma-separated values an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    None,
    One,
    Two,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    #[serde(rename = "eq")]
    Eq,
    #[serde(rename = "neq")]
    Neq,
    #[serde(rename = "gt")]
    Gt,
    #[serde(rename = "gte")]
    Gte,
    #[serde(rename = "lt")]
    Lt,
    #[serde(rename = "lte")]
    Lte,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "nlike")]
    NotLike,
    #[serde(rename = "starts")]
    Starts,
    #[serde(rename = "ends")]
    Ends,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "nin")]
    NotIn,
    #[serde(rename = "isnull")]
    IsNull,
    #[serde(rename = "isnotnull")]
    IsNotNull,
}

impl Operator {
    pub const ALL: [Operator; 15] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Like,
        Self::NotLike,
        Self::Starts,
        Self::Ends,
        Self::Between,
        Self::In,
        Self::NotIn,
        Self::IsNull,
        Self::IsNotNull,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::NotLike => "nlike",
            Self::Starts => "starts",
            Self::Ends => "ends",
            Self::Between => "between",
            Self::In => "in",
            Self::NotIn => "nin",
            Self::IsNull => "isnull",
            Self::IsNotNull => "isnotnull",
        }
    }

    /// Look up a keyword. Keywords are lowercase and matched exactly.
    pub fn from_keyword(keyword: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.keyword() == keyword)
            .ok_or_else(|| QueryError::UnknownOperator(keyword.to_string()))
    }

    pub fn arity(self) -> Arity {
        match self {
            Self::IsNull | Self::IsNotNull => Arity::None,
            Self::Between => Arity::Two,
            Self::In | Self::NotIn => Arity::List,
            _ => Arity::One,
        }
    }

    pub fn takes_value(self) -> bool {
        self.arity() != Arity::None
    }

    /// Build the predicate for `column`. `value` is the raw remainder of the
    /// filter token; it is ignored by the null checks and required by every
    /// other operator.
    pub fn predicate(self, column: String, value: Option<&str>) -> Result<Predicate> {
        let raw = match value {
            Some(raw) => raw,
            None if !self.takes_value() => "",
            None => {
                return Err(QueryError::MissingValue {
                    path: column,
                    operator: self.keyword().to_string(),
                })
            }
        };
        let kind = self.kind(raw)?;
        Ok(Predicate { column, kind })
    }

    fn kind(self, value: &str) -> Result<PredicateKind> {
        let compare = |op| PredicateKind::Compare {
            op,
            value: value.to_string(),
        };
        let like = |pattern: String, negated| PredicateKind::Like { pattern, negated };

        let kind = match self {
            Self::Eq => compare(CompareOp::Eq),
            Self::Neq => compare(CompareOp::Neq),
            Self::Gt => compare(CompareOp::Gt),
            Self::Gte => compare(CompareOp::Gte),
            Self::Lt => compare(CompareOp::Lt),
            Self::Lte => compare(CompareOp::Lte),
            Self::Like => like(format!("%{value}%"), false),
            Self::NotLike => like(format!("%{value}%"), true),
            Self::Starts => like(format!("{value}%"), false),
            Self::Ends => like(format!("%{value}"), false),
            Self::Between => {
                // Only the first comma separates; "1,2,3" is ("1", "2,3").
                let (low, high) = value
                    .split_once(',')
                    .ok_or_else(|| QueryError::MalformedRangeValue(value.to_string()))?;
                PredicateKind::Between {
                    low: low.to_string(),
                    high: high.to_string(),
                }
            }
            Self::In | Self::NotIn => PredicateKind::In {
                values: value.split(',').map(str::to_string).collect(),
                negated: self == Self::NotIn,
            },
            Self::IsNull => PredicateKind::Null { negated: false },
            Self::IsNotNull => PredicateKind::Null { negated: true },
        };
        Ok(kind)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
