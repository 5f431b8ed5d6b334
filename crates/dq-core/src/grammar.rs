//! # Token Grammar
//!
//! Parses the three client token shapes into specs:
//!
//! ```text
//! filter  <path>:<op>[:<value>]     age:gte:18, user.email:ends:@x.io, deleted_at:isnull
//! sort    <path>.<asc|desc>         name.asc, user.created_at.DESC
//! select  <ident>(.<ident>)*        id, user.email
//! ```
//!
//! Parsers are total: a token either yields a spec or the matching
//! `Invalid*Token` error carrying the raw token.

use serde::Serialize;
use std::fmt;

use crate::error::{QueryError, Result};
use crate::operator::Operator;
use crate::path::Path;

/// Anything addressed by a [`Path`]; lets alias resolution treat the three
/// spec kinds alike.
pub trait PathSpec {
    fn path(&self) -> &Path;
    fn path_mut(&mut self) -> &mut Path;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSpec {
    pub path: Path,
    pub operator: Operator,
    /// `None` only for the null checks.
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortSpec {
    pub path: Path,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectSpec {
    pub path: Path,
}

macro_rules! impl_path_spec {
    ($($ty:ty),*) => {$(
        impl PathSpec for $ty {
            fn path(&self) -> &Path {
                &self.path
            }
            fn path_mut(&mut self) -> &mut Path {
                &mut self.path
            }
        }
    )*};
}

impl_path_spec!(FilterSpec, SortSpec, SelectSpec);

/// Parse `path:op` or `path:op:value`. The value is everything after the
/// second colon, colons included.
pub fn parse_filter(raw: &str) -> Result<FilterSpec> {
    let invalid = || QueryError::InvalidFilterToken(raw.to_string());

    let (path, rest) = raw.split_once(':').ok_or_else(invalid)?;
    let (keyword, value) = match rest.split_once(':') {
        Some((keyword, value)) => (keyword, Some(value)),
        None => (rest, None),
    };

    let path = Path::parse(path).ok_or_else(invalid)?;
    let operator = Operator::from_keyword(keyword).map_err(|_| invalid())?;

    // `age:eq` carries an empty value; null checks drop theirs.
    let value = operator
        .takes_value()
        .then(|| value.unwrap_or_default().to_string());

    Ok(FilterSpec {
        path,
        operator,
        value,
    })
}

/// Parse `path.asc` or `path.desc`; the direction is case-insensitive and
/// must be the last segment.
pub fn parse_sort(raw: &str) -> Result<SortSpec> {
    let invalid = || QueryError::InvalidSortToken(raw.to_string());

    let (path, direction) = raw.rsplit_once('.').ok_or_else(invalid)?;
    let direction = Direction::parse(direction).ok_or_else(invalid)?;
    let path = Path::parse(path).ok_or_else(invalid)?;

    Ok(SortSpec { path, direction })
}

/// Parse a dotted run of `[A-Za-z0-9_]+` segments.
pub fn parse_select(raw: &str) -> Result<SelectSpec> {
    let invalid = || QueryError::InvalidSelectToken(raw.to_string());

    let path = Path::parse(raw).ok_or_else(invalid)?;
    let identifiers = path
        .segments()
        .iter()
        .all(|seg| seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    if !identifiers {
        return Err(invalid());
    }

    Ok(SelectSpec { path })
}
