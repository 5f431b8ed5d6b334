//! # Query Translator
//!
//! Drives a [`QueryEngine`] through one paginated read:
//!
//! 1. every filter becomes an ANDed predicate, in list order
//! 2. the filtered, unpaginated row count is taken
//! 3. every sort becomes an ORDER BY key, in list order
//! 4. the read runs, projected when selects are present
//!
//! All operator-catalog errors are raised before the engine is touched.
//! Any engine error aborts the whole translation.

use serde::Serialize;
use std::sync::Arc;

use crate::engine::{EngineError, Predicate, QueryEngine, RowSet, Window};
use crate::error::{QueryError, Result};
use crate::grammar::{FilterSpec, SelectSpec, SortSpec};
use crate::shape::{decode_cell, RecordShape};
use crate::value::Record;

/// The resolved specs of one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuerySpec {
    pub filters: Vec<FilterSpec>,
    pub sorts: Vec<SortSpec>,
    pub selects: Vec<SelectSpec>,
}

impl QuerySpec {
    pub fn projected_columns(&self) -> Vec<String> {
        self.selects.iter().map(|s| s.path.column()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translated {
    pub rows: Vec<Record>,
    pub total: u64,
}

/// Turn filters into engine predicates, stopping at the first bad one.
pub fn predicates(filters: &[FilterSpec]) -> Result<Vec<Predicate>> {
    filters
        .iter()
        .map(|f| f.operator.predicate(f.path.column(), f.value.as_deref()))
        .collect()
}

/// Translates specs against one record shape of one engine.
#[derive(Clone)]
pub struct Translator {
    engine: Arc<dyn QueryEngine>,
    shape: RecordShape,
}

impl Translator {
    pub fn new(engine: Arc<dyn QueryEngine>, shape: RecordShape) -> Self {
        Self { engine, shape }
    }

    pub fn shape(&self) -> &RecordShape {
        &self.shape
    }

    pub async fn translate(&self, spec: &QuerySpec, window: Window) -> Result<Translated> {
        let predicates = predicates(&spec.filters)?;

        let mut scope = self
            .engine
            .scope(&self.shape)
            .map_err(|e| QueryError::execution("opening a query scope", e))?;

        for predicate in &predicates {
            tracing::debug!("where {:?}", predicate);
            scope.filter(predicate).map_err(|e| {
                QueryError::translation(format!("filter on '{}'", predicate.column), e)
            })?;
        }

        let total = scope
            .count()
            .await
            .map_err(|e| QueryError::execution("count", e))?;
        tracing::debug!("{} rows match before pagination", total);

        for sort in &spec.sorts {
            let column = sort.path.column();
            tracing::debug!("order by {} {}", column, sort.direction);
            scope
                .order(&column, sort.direction)
                .map_err(|e| QueryError::translation(format!("sort on '{}'", column), e))?;
        }

        let rows = if spec.selects.is_empty() {
            let records = scope
                .records(window)
                .await
                .map_err(|e| QueryError::execution("read", e))?;
            records
                .into_iter()
                .map(|cells| self.shape.decode_record(cells))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| QueryError::execution("decode", e))?
        } else {
            let columns = spec.projected_columns();
            tracing::debug!("select {}", columns.join(", "));
            scope
                .project(&columns)
                .map_err(|e| QueryError::translation("projection", e))?;
            let set = scope
                .rows(window)
                .await
                .map_err(|e| QueryError::execution("read", e))?;
            decode_rows(set).map_err(|e| QueryError::execution("decode", e))?
        };

        Ok(Translated { rows, total })
    }
}

fn decode_rows(set: RowSet) -> Result<Vec<Record>, EngineError> {
    let RowSet { columns, rows } = set;
    rows.into_iter()
        .map(|cells| {
            if cells.len() != columns.len() {
                return Err(EngineError::Backend(format!(
                    "row has {} cells for {} columns",
                    cells.len(),
                    columns.len()
                )));
            }
            let mut record = Record::with_capacity(cells.len());
            for (column, cell) in columns.iter().zip(cells) {
                record.insert(column.clone(), decode_cell(column, cell)?);
            }
            Ok(record)
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::{PredicateKind, QueryScope};
    use crate::grammar::{parse_filter, parse_select, parse_sort, Direction};
    use crate::shape::DecodeTarget;
    use crate::value::{Cell, Value};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fake engine that logs every call and serves canned results.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub calls: Arc<Mutex<Vec<String>>>,
        pub total: u64,
        pub records: Vec<Vec<Cell>>,
        pub rows: Vec<Vec<Cell>>,
        pub reject_column: Option<String>,
        pub fail_count: bool,
    }

    impl Recorder {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct RecorderScope {
        calls: Arc<Mutex<Vec<String>>>,
        total: u64,
        records: Vec<Vec<Cell>>,
        rows: Vec<Vec<Cell>>,
        reject_column: Option<String>,
        fail_count: bool,
        projection: Vec<String>,
    }

    impl RecorderScope {
        fn log(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn check(&self, column: &str) -> Result<(), EngineError> {
            match &self.reject_column {
                Some(bad) if bad == column => Err(EngineError::UnknownColumn(column.into())),
                _ => Ok(()),
            }
        }
    }

    impl QueryEngine for Recorder {
        fn scope(&self, _shape: &RecordShape) -> Result<Box<dyn QueryScope>, EngineError> {
            Ok(Box::new(RecorderScope {
                calls: self.calls.clone(),
                total: self.total,
                records: self.records.clone(),
                rows: self.rows.clone(),
                reject_column: self.reject_column.clone(),
                fail_count: self.fail_count,
                projection: Vec::new(),
            }))
        }
    }

    #[async_trait]
    impl QueryScope for RecorderScope {
        fn filter(&mut self, predicate: &Predicate) -> Result<(), EngineError> {
            self.log(format!("where {}", predicate.column));
            self.check(&predicate.column)
        }

        fn order(&mut self, column: &str, direction: Direction) -> Result<(), EngineError> {
            self.log(format!("order {} {}", column, direction));
            self.check(column)
        }

        fn project(&mut self, columns: &[String]) -> Result<(), EngineError> {
            self.log(format!("select {}", columns.join(",")));
            for column in columns {
                self.check(column)?;
            }
            self.projection = columns.to_vec();
            Ok(())
        }

        async fn count(&mut self) -> Result<u64, EngineError> {
            self.log("count".into());
            if self.fail_count {
                return Err(EngineError::Backend("connection reset".into()));
            }
            Ok(self.total)
        }

        async fn rows(&mut self, window: Window) -> Result<RowSet, EngineError> {
            self.log(format!("rows {} {}", window.limit, window.offset));
            Ok(RowSet {
                columns: self.projection.clone(),
                rows: self.rows.clone(),
            })
        }

        async fn records(&mut self, window: Window) -> Result<Vec<Vec<Cell>>, EngineError> {
            self.log(format!("records {} {}", window.limit, window.offset));
            Ok(self.records.clone())
        }
    }

    fn shape() -> RecordShape {
        RecordShape::default()
            .column("id", DecodeTarget::Integer)
            .column("name", DecodeTarget::Text)
    }

    fn spec(filters: &[&str], sorts: &[&str], selects: &[&str]) -> QuerySpec {
        QuerySpec {
            filters: filters.iter().map(|f| parse_filter(f).unwrap()).collect(),
            sorts: sorts.iter().map(|s| parse_sort(s).unwrap()).collect(),
            selects: selects.iter().map(|s| parse_select(s).unwrap()).collect(),
        }
    }

    const WINDOW: Window = Window {
        limit: 2,
        offset: 4,
    };

    #[tokio::test]
    async fn test_call_order() {
        let engine = Arc::new(Recorder {
            total: 7,
            records: vec![vec![Cell::Int(1), Cell::Text("ann".into())]],
            ..Default::default()
        });
        let t = Translator::new(engine.clone(), shape());
        let out = t
            .translate(
                &spec(&["age:gte:18", "name:like:an"], &["name.asc", "id.desc"], &[]),
                WINDOW,
            )
            .await
            .unwrap();

        assert_eq!(out.total, 7);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(
            engine.calls(),
            [
                "where age",
                "where name",
                "count",
                "order name ASC",
                "order id DESC",
                "records 2 4"
            ]
        );
    }

    #[tokio::test]
    async fn test_projection_uses_qualified_columns() {
        let engine = Arc::new(Recorder {
            rows: vec![vec![Cell::Bytes(b"a@x.io".to_vec())]],
            ..Default::default()
        });
        let t = Translator::new(engine.clone(), shape());
        let out = t
            .translate(&spec(&[], &[], &["user.email"]), WINDOW)
            .await
            .unwrap();

        assert_eq!(engine.calls(), ["count", "select user.email", "rows 2 4"]);
        assert_eq!(
            out.rows[0].get("user.email"),
            Some(&Value::Text("a@x.io".into()))
        );
    }

    #[tokio::test]
    async fn test_catalog_errors_make_no_engine_calls() {
        let engine = Arc::new(Recorder::default());
        let t = Translator::new(engine.clone(), shape());
        let err = t
            .translate(&spec(&["age:gte:1", "age:between:5"], &[], &[]), WINDOW)
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::MalformedRangeValue(_)));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_column_is_translation_failure() {
        let engine = Arc::new(Recorder {
            reject_column: Some("nope".into()),
            ..Default::default()
        });
        let t = Translator::new(engine.clone(), shape());
        let err = t
            .translate(&spec(&["nope:eq:1", "age:eq:2"], &[], &[]), WINDOW)
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::TranslationFailure { .. }));
        assert!(!err.is_client_error());
        assert_eq!(engine.calls(), ["where nope"]);
    }

    #[tokio::test]
    async fn test_rejected_sort_is_translation_failure() {
        let engine = Arc::new(Recorder {
            reject_column: Some("nope".into()),
            ..Default::default()
        });
        let t = Translator::new(engine.clone(), shape());
        let err = t
            .translate(&spec(&["age:gte:1"], &["nope.asc", "id.desc"], &[]), WINDOW)
            .await
            .unwrap_err();

        assert!(
            matches!(&err, QueryError::TranslationFailure { step, .. } if step == "sort on 'nope'")
        );
        assert!(!err.is_client_error());
        assert_eq!(engine.calls(), ["where age", "count", "order nope ASC"]);
    }

    #[tokio::test]
    async fn test_rejected_projection_is_translation_failure() {
        let engine = Arc::new(Recorder {
            reject_column: Some("nope".into()),
            ..Default::default()
        });
        let t = Translator::new(engine.clone(), shape());
        let err = t
            .translate(&spec(&[], &[], &["id", "nope"]), WINDOW)
            .await
            .unwrap_err();

        assert!(
            matches!(&err, QueryError::TranslationFailure { step, .. } if step == "projection")
        );
        assert_eq!(engine.calls(), ["count", "select id,nope"]);
    }

    #[tokio::test]
    async fn test_count_failure_is_execution_failure() {
        let engine = Arc::new(Recorder {
            fail_count: true,
            ..Default::default()
        });
        let t = Translator::new(engine.clone(), shape());
        let err = t
            .translate(&spec(&[], &["name.asc"], &[]), WINDOW)
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::ExecutionFailure { .. }));
        assert_eq!(engine.calls(), ["count"]);
    }

    #[tokio::test]
    async fn test_decode_failure_is_surfaced() {
        let engine = Arc::new(Recorder {
            records: vec![vec![Cell::Text("x".into()), Cell::Null]],
            ..Default::default()
        });
        let t = Translator::new(engine, shape());
        let err = t.translate(&QuerySpec::default(), WINDOW).await.unwrap_err();
        assert!(matches!(err, QueryError::ExecutionFailure { step, .. } if step == "decode"));
    }

    #[test]
    fn test_predicates_in_order() {
        let p = predicates(&spec(&["a:isnull", "b:in:1,2"], &[], &[]).filters).unwrap();
        assert_eq!(p[0].kind, PredicateKind::Null { negated: false });
        assert_eq!(p[1].column, "b");
    }
}
