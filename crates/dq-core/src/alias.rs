//! # Alias Resolution
//!
//! Rewrites client field names into storage paths. Only unqualified
//! (single-segment) paths are touched: a listed alias is replaced by its
//! dotted target, anything else is converted from camelCase to snake_case.
//! Qualified paths such as `user.email` pass through as given.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::grammar::PathSpec;
use crate::path::Path;
use crate::translate::QuerySpec;

/// Immutable token → path table, built once per endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HashMap<String, String>", into = "HashMap<String, String>")]
pub struct AliasMap {
    entries: HashMap<String, Path>,
}

impl AliasMap {
    pub fn builder() -> AliasMapBuilder {
        AliasMapBuilder::default()
    }

    pub fn get(&self, token: &str) -> Option<&Path> {
        self.entries.get(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve one path.
    pub fn resolve_path(&self, path: &Path) -> Path {
        let mut resolved = path.clone();
        if let Some(segment) = resolved.single_mut() {
            match self.entries.get(segment.as_str()) {
                Some(target) => return target.clone(),
                None => *segment = to_snake_case(segment),
            }
        }
        resolved
    }

    /// Resolve every spec, returning new specs and leaving the caller's
    /// values untouched.
    pub fn resolve<S: PathSpec + Clone>(&self, specs: &[S]) -> Vec<S> {
        specs
            .iter()
            .map(|spec| {
                let mut spec = spec.clone();
                *spec.path_mut() = self.resolve_path(spec.path());
                spec
            })
            .collect()
    }

    /// Resolve the filters, sorts and selects of a parsed query.
    pub fn resolve_spec(&self, spec: &QuerySpec) -> QuerySpec {
        QuerySpec {
            filters: self.resolve(&spec.filters),
            sorts: self.resolve(&spec.sorts),
            selects: self.resolve(&spec.selects),
        }
    }
}

#[derive(Debug, Default)]
pub struct AliasMapBuilder {
    entries: HashMap<String, Path>,
    invalid: Vec<String>,
}

impl AliasMapBuilder {
    /// Map `token` to the dotted `target`.
    pub fn alias(mut self, token: impl Into<String>, target: &str) -> Self {
        let token = token.into();
        match Path::parse(target) {
            Some(path) => {
                self.entries.insert(token, path);
            }
            None => self.invalid.push(token),
        }
        self
    }

    /// Fails with the tokens whose target was not a valid dotted path.
    pub fn build(self) -> Result<AliasMap, InvalidAliases> {
        if self.invalid.is_empty() {
            Ok(AliasMap {
                entries: self.entries,
            })
        } else {
            Err(InvalidAliases(self.invalid))
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("aliases with empty target segments: {}", .0.join(", "))]
pub struct InvalidAliases(pub Vec<String>);

impl TryFrom<HashMap<String, String>> for AliasMap {
    type Error = InvalidAliases;

    fn try_from(raw: HashMap<String, String>) -> Result<Self, Self::Error> {
        raw.iter()
            .fold(AliasMap::builder(), |b, (token, target)| b.alias(token, target))
            .build()
    }
}

impl From<AliasMap> for HashMap<String, String> {
    fn from(map: AliasMap) -> Self {
        map.entries
            .into_iter()
            .map(|(token, path)| (token, path.column()))
            .collect()
    }
}

/// camelCase → snake_case. Every uppercase letter is lowercased and, unless
/// it opens the string, prefixed with `_`, so `ID` becomes `i_d`.
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{parse_filter, parse_select, parse_sort};

    fn aliases() -> AliasMap {
        AliasMap::builder()
            .alias("email", "user.email")
            .alias("fullName", "full_name")
            .build()
            .unwrap()
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("userName"), "user_name");
        assert_eq!(to_snake_case("ID"), "i_d");
        assert_eq!(to_snake_case("createdAtUtc"), "created_at_utc");
        assert_eq!(to_snake_case("Name"), "name");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_alias_expands_to_join_path() {
        let specs = vec![parse_filter("email:ends:@x.io").unwrap()];
        let out = aliases().resolve(&specs);
        assert_eq!(out[0].path.segments(), ["user", "email"]);
    }

    #[test]
    fn test_alias_wins_over_case_conversion() {
        let specs = vec![parse_sort("fullName.asc").unwrap()];
        let out = aliases().resolve(&specs);
        assert_eq!(out[0].path.segments(), ["full_name"]);
    }

    #[test]
    fn test_unaliased_single_segment_is_snake_cased() {
        let specs = vec![parse_select("userName").unwrap()];
        let out = aliases().resolve(&specs);
        assert_eq!(out[0].path.segments(), ["user_name"]);
    }

    #[test]
    fn test_qualified_paths_pass_through() {
        let specs = vec![parse_filter("userProfile.firstName:eq:x").unwrap()];
        let once = aliases().resolve(&specs);
        assert_eq!(once[0].path.segments(), ["userProfile", "firstName"]);
        let twice = aliases().resolve(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let specs = vec![parse_filter("userName:eq:ann").unwrap()];
        let _ = aliases().resolve(&specs);
        assert_eq!(specs[0].path.segments(), ["userName"]);
    }

    #[test]
    fn test_builder_rejects_empty_targets() {
        let err = AliasMap::builder()
            .alias("ok", "a.b")
            .alias("bad", "a..b")
            .build()
            .unwrap_err();
        assert_eq!(err.0, vec!["bad".to_string()]);
    }

    #[test]
    fn test_deserialize_from_table() {
        let map: AliasMap = serde_json::from_str(r#"{"email": "user.email"}"#).unwrap();
        assert_eq!(map.get("email").unwrap().column(), "user.email");
    }
}
