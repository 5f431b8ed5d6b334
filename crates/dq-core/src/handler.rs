//! # Query Handler
//!
//! Composes the pipeline for one endpoint: parse → resolve aliases →
//! translate and execute → page metadata. The alias map, the record shape
//! and the page limits are fixed when the handler is built and only read
//! afterwards, so one handler serves concurrent requests without locking.

use serde::Serialize;
use std::sync::Arc;

use crate::alias::AliasMap;
use crate::engine::QueryEngine;
use crate::error::Result;
use crate::pagination::{Page, PageLimits, PageMeta, DEFAULT_TAKE};
use crate::request::{QueryParams, StructuredQuery};
use crate::shape::RecordShape;
use crate::sql::{self, SqlPreview};
use crate::translate::{QuerySpec, Translator};
use crate::value::Record;

/// Response payload: the page of rows and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResponse {
    pub data: Vec<Record>,
    pub meta: PageMeta,
}

pub struct QueryHandler {
    translator: Translator,
    aliases: AliasMap,
    limits: PageLimits,
}

pub struct QueryHandlerBuilder {
    engine: Arc<dyn QueryEngine>,
    shape: RecordShape,
    aliases: AliasMap,
    default_take: u64,
    max_take: u64,
}

impl QueryHandlerBuilder {
    pub fn aliases(mut self, aliases: AliasMap) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn default_take(mut self, take: u64) -> Self {
        self.default_take = take;
        self
    }

    pub fn max_take(mut self, take: u64) -> Self {
        self.max_take = take;
        self
    }

    pub fn build(self) -> QueryHandler {
        QueryHandler {
            translator: Translator::new(self.engine, self.shape),
            aliases: self.aliases,
            limits: PageLimits::new(self.default_take, self.max_take),
        }
    }
}

impl QueryHandler {
    pub fn builder(engine: Arc<dyn QueryEngine>, shape: RecordShape) -> QueryHandlerBuilder {
        QueryHandlerBuilder {
            engine,
            shape,
            aliases: AliasMap::default(),
            default_take: DEFAULT_TAKE,
            max_take: DEFAULT_TAKE,
        }
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    pub fn shape(&self) -> &RecordShape {
        self.translator.shape()
    }

    /// Rewrite every path of `spec` through the alias map.
    pub fn resolve(&self, spec: &QuerySpec) -> QuerySpec {
        self.aliases.resolve_spec(spec)
    }

    /// Parse and resolve query-string tokens.
    pub fn prepare(&self, params: &QueryParams) -> Result<(QuerySpec, Page)> {
        let spec = self.resolve(&params.parse()?);
        let page = self
            .limits
            .page_from_params(params.page.as_deref(), params.take.as_deref());
        Ok((spec, page))
    }

    /// Parse and resolve a JSON request body.
    pub fn prepare_structured(&self, query: &StructuredQuery) -> Result<(QuerySpec, Page)> {
        let spec = self.resolve(&query.parse()?);
        let page = self.limits.page(query.page, query.take);
        Ok((spec, page))
    }

    pub async fn handle(&self, params: &QueryParams) -> Result<PageResponse> {
        let (spec, page) = self.prepare(params)?;
        self.execute(&spec, page).await
    }

    pub async fn handle_structured(&self, query: &StructuredQuery) -> Result<PageResponse> {
        let (spec, page) = self.prepare_structured(query)?;
        self.execute(&spec, page).await
    }

    /// Run an already resolved spec.
    pub async fn execute(&self, spec: &QuerySpec, page: Page) -> Result<PageResponse> {
        let translated = self.translator.translate(spec, page.window()).await?;
        let meta = page.meta(translated.rows.len(), translated.total);
        tracing::debug!(
            "page {} of {} ({} rows, {} total)",
            meta.page,
            meta.page_count,
            meta.item_count,
            translated.total
        );
        Ok(PageResponse {
            data: translated.rows,
            meta,
        })
    }

    /// SQL the query would run as against `table`.
    pub fn explain(&self, table: &str, params: &QueryParams) -> Result<SqlPreview> {
        let (spec, page) = self.prepare(params)?;
        sql::render(table, self.shape(), &spec, page.window())
    }
}
