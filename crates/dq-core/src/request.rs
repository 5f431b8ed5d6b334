//! # Request Forms
//!
//! The two shapes a query arrives in: raw query-string tokens
//! ([`QueryParams`]) or a JSON body with the parts already separated
//! ([`StructuredQuery`]). Both end up as an unresolved [`QuerySpec`].

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};
use crate::grammar::{
    parse_filter, parse_select, parse_sort, Direction, FilterSpec, SortSpec,
};
use crate::operator::Operator;
use crate::path::Path;
use crate::translate::QuerySpec;

/// Raw, repeatable query-string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub filter: Vec<String>,
    pub sort: Vec<String>,
    pub select: Vec<String>,
    pub page: Option<String>,
    pub take: Option<String>,
}

impl QueryParams {
    /// Collect decoded `key=value` pairs. Repeated `page`/`take` keep their
    /// first value; unrelated keys are ignored.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "filter" => params.filter.push(value.into()),
                "sort" => params.sort.push(value.into()),
                "select" => params.select.push(value.into()),
                "page" if params.page.is_none() => params.page = Some(value.into()),
                "take" if params.take.is_none() => params.take = Some(value.into()),
                _ => {}
            }
        }
        params
    }

    /// Parse every token: filters first, then sorts, then selects. The
    /// first bad token aborts.
    pub fn parse(&self) -> Result<QuerySpec> {
        Ok(QuerySpec {
            filters: self
                .filter
                .iter()
                .map(|raw| parse_filter(raw))
                .collect::<Result<_>>()?,
            sorts: self
                .sort
                .iter()
                .map(|raw| parse_sort(raw))
                .collect::<Result<_>>()?,
            selects: self
                .select
                .iter()
                .map(|raw| parse_select(raw))
                .collect::<Result<_>>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredFilter {
    pub path: String,
    pub op: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredSort {
    pub path: String,
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_direction() -> String {
    "asc".into()
}

/// JSON request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredQuery {
    #[serde(default)]
    pub filters: Vec<StructuredFilter>,
    #[serde(default)]
    pub sorts: Vec<StructuredSort>,
    #[serde(default)]
    pub selects: Vec<String>,
    pub page: Option<i64>,
    pub take: Option<i64>,
}

impl StructuredQuery {
    pub fn parse(&self) -> Result<QuerySpec> {
        let filters = self
            .filters
            .iter()
            .map(StructuredFilter::parse)
            .collect::<Result<_>>()?;
        let sorts = self
            .sorts
            .iter()
            .map(StructuredSort::parse)
            .collect::<Result<_>>()?;
        let selects = self
            .selects
            .iter()
            .map(|raw| parse_select(raw))
            .collect::<Result<_>>()?;
        Ok(QuerySpec {
            filters,
            sorts,
            selects,
        })
    }
}

impl StructuredFilter {
    fn parse(&self) -> Result<FilterSpec> {
        let path = Path::parse(&self.path)
            .ok_or_else(|| QueryError::InvalidFilterToken(self.token()))?;
        let operator = Operator::from_keyword(&self.op)?;
        let value = match (&self.value, operator.takes_value()) {
            (_, false) => None,
            (Some(v), true) => Some(v.clone()),
            (None, true) => {
                return Err(QueryError::MissingValue {
                    path: self.path.clone(),
                    operator: self.op.clone(),
                })
            }
        };
        Ok(FilterSpec {
            path,
            operator,
            value,
        })
    }

    fn token(&self) -> String {
        match &self.value {
            Some(v) => format!("{}:{}:{}", self.path, self.op, v),
            None => format!("{}:{}", self.path, self.op),
        }
    }
}

impl StructuredSort {
    fn parse(&self) -> Result<SortSpec> {
        let invalid = || QueryError::InvalidSortToken(format!("{}.{}", self.path, self.direction));
        let path = Path::parse(&self.path).ok_or_else(invalid)?;
        let direction = Direction::parse(&self.direction).ok_or_else(invalid)?;
        Ok(SortSpec { path, direction })
    }
}
