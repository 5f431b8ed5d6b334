//! # SQL Preview
//!
//! Renders the parameterized statements a SQL-backed engine would run for a
//! query, without running them. Useful for debugging aliases and operator
//! mapping; the catalog rules are the same as for a real translation.

use serde::Serialize;

use crate::engine::{Predicate, PredicateKind, Window};
use crate::error::Result;
use crate::shape::RecordShape;
use crate::translate::{predicates, QuerySpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlPreview {
    pub count: String,
    pub select: String,
    /// Bind values for `?` placeholders of the WHERE clause, in order.
    /// Both statements bind these first.
    pub args: Vec<String>,
    /// `LIMIT ? OFFSET ?` binds, appended after `args` for `select` only.
    pub page_args: [u64; 2],
}

impl Predicate {
    /// `column <op> ?` fragment and its bind values.
    pub fn to_sql(&self) -> (String, Vec<String>) {
        let col = &self.column;
        match &self.kind {
            PredicateKind::Compare { op, value } => {
                (format!("{} {} ?", col, op.symbol()), vec![value.clone()])
            }
            PredicateKind::Like { pattern, negated } => {
                let not = if *negated { "NOT " } else { "" };
                (format!("{} {}LIKE ?", col, not), vec![pattern.clone()])
            }
            PredicateKind::Between { low, high } => (
                format!("{} BETWEEN ? AND ?", col),
                vec![low.clone(), high.clone()],
            ),
            PredicateKind::In { values, negated } => {
                let not = if *negated { "NOT " } else { "" };
                let slots = vec!["?"; values.len()].join(", ");
                (format!("{} {}IN ({})", col, not, slots), values.clone())
            }
            PredicateKind::Null { negated: false } => (format!("{} IS NULL", col), Vec::new()),
            PredicateKind::Null { negated: true } => (format!("{} IS NOT NULL", col), Vec::new()),
        }
    }
}

/// Render the count and the paginated select for `spec` over `table`.
pub fn render(table: &str, shape: &RecordShape, spec: &QuerySpec, window: Window) -> Result<SqlPreview> {
    let mut clauses = Vec::new();
    let mut args = Vec::new();
    for predicate in predicates(&spec.filters)? {
        let (clause, values) = predicate.to_sql();
        clauses.push(clause);
        args.extend(values);
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let columns = if spec.selects.is_empty() {
        let names: Vec<&str> = shape.names().collect();
        if names.is_empty() {
            "*".to_string()
        } else {
            names.join(", ")
        }
    } else {
        spec.projected_columns().join(", ")
    };

    let order_sql = if spec.sorts.is_empty() {
        String::new()
    } else {
        let keys: Vec<String> = spec
            .sorts
            .iter()
            .map(|s| format!("{} {}", s.path.column(), s.direction))
            .collect();
        format!(" ORDER BY {}", keys.join(", "))
    };

    Ok(SqlPreview {
        count: format!("SELECT count(*) FROM {}{}", table, where_sql),
        select: format!(
            "SELECT {} FROM {}{}{} LIMIT ? OFFSET ?",
            columns, table, where_sql, order_sql
        ),
        args,
        page_args: [window.limit, window.offset],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::grammar::{parse_filter, parse_select, parse_sort};
    use crate::shape::DecodeTarget;

    fn spec(filters: &[&str], sorts: &[&str], selects: &[&str]) -> QuerySpec {
        QuerySpec {
            filters: filters.iter().map(|f| parse_filter(f).unwrap()).collect(),
            sorts: sorts.iter().map(|s| parse_sort(s).unwrap()).collect(),
            selects: selects.iter().map(|s| parse_select(s).unwrap()).collect(),
        }
    }

    fn fragment(token: &str) -> (String, Vec<String>) {
        let f = parse_filter(token).unwrap();
        f.operator
            .predicate(f.path.column(), f.value.as_deref())
            .unwrap()
            .to_sql()
    }

    #[test]
    fn test_fragments() {
        assert_eq!(fragment("age:neq:3").0, "age <> ?");
        assert_eq!(fragment("age:lte:3").0, "age <= ?");
        assert_eq!(fragment("name:nlike:x"), ("name NOT LIKE ?".into(), vec!["%x%".into()]));
        assert_eq!(fragment("name:ends:x").1, vec!["%x".to_string()]);
        assert_eq!(
            fragment("age:between:1,9"),
            ("age BETWEEN ? AND ?".into(), vec!["1".into(), "9".into()])
        );
        assert_eq!(fragment("id:nin:1,2,3").0, "id NOT IN (?, ?, ?)");
        assert_eq!(fragment("deleted_at:isnotnull").0, "deleted_at IS NOT NULL");
        assert!(fragment("deleted_at:isnull").1.is_empty());
    }

    #[test]
    fn test_render_full_statement() {
        let shape = RecordShape::default()
            .column("id", DecodeTarget::Integer)
            .column("name", DecodeTarget::Text);
        let preview = render(
            "users",
            &shape,
            &spec(&["age:gte:18", "user.email:like:@x"], &["name.asc"], &[]),
            Window {
                limit: 10,
                offset: 20,
            },
        )
        .unwrap();

        assert_eq!(
            preview.count,
            "SELECT count(*) FROM users WHERE age >= ? AND user.email LIKE ?"
        );
        assert_eq!(
            preview.select,
            "SELECT id, name FROM users WHERE age >= ? AND user.email LIKE ? ORDER BY name ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(preview.args, ["18", "%@x%"]);
        assert_eq!(preview.page_args, [10, 20]);
    }

    #[test]
    fn test_render_projection() {
        let preview = render(
            "users",
            &RecordShape::default(),
            &spec(&[], &[], &["user.email", "id"]),
            Window::default(),
        )
        .unwrap();
        assert_eq!(preview.select, "SELECT user.email, id FROM users LIMIT ? OFFSET ?");
        assert!(preview.args.is_empty());
        assert_eq!(preview.page_args, [0, 0]);
    }

    #[test]
    fn test_render_surfaces_catalog_errors() {
        let err = render(
            "users",
            &RecordShape::default(),
            &spec(&["age:between:1"], &[], &[]),
            Window::default(),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::MalformedRangeValue(_)));
    }
}
