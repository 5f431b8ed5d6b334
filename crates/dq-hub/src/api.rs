//! # API Handlers
//!
//! Axum handlers exposing configured datasets. Query strings are decoded
//! by hand rather than through `Query<T>` so repeated `filter`/`sort`/
//! `select` keys are all kept.

use crate::datasets::{Dataset, DatasetInfo};
use crate::AppState;
use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    Json,
};
use dq_core::sql::SqlPreview;
use dq_core::{PageResponse, QueryError, QueryParams, StructuredQuery};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: error.into(),
        }),
    )
}

fn query_error(dataset: &str, e: QueryError) -> (StatusCode, Json<ApiError>) {
    if e.is_client_error() {
        tracing::warn!("Rejected query on '{}': {}", dataset, e);
        api_error(StatusCode::BAD_REQUEST, e.to_string())
    } else {
        match std::error::Error::source(&e) {
            Some(cause) => tracing::error!("Query on '{}' failed: {}: {}", dataset, e, cause),
            None => tracing::error!("Query on '{}' failed: {}", dataset, e),
        }
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

fn lookup(state: &AppState, name: &str) -> Result<Arc<Dataset>, (StatusCode, Json<ApiError>)> {
    state.datasets.get(name).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("Dataset '{}' not found", name),
        )
    })
}

fn query_params(raw: Option<String>) -> QueryParams {
    let raw = raw.unwrap_or_default();
    QueryParams::from_pairs(url::form_urlencoded::parse(raw.as_bytes()))
}

// =============================================================================
// Health & Catalog
// =============================================================================

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub datasets: usize,
    pub started_at: String,
    pub uptime_seconds: i64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    let now = chrono::Utc::now();
    Json(Health {
        status: "ok",
        datasets: state.datasets.len(),
        started_at: state.started_at.to_rfc3339(),
        uptime_seconds: (now - state.started_at).num_seconds(),
    })
}

pub async fn list_datasets(State(state): State<Arc<AppState>>) -> Json<Vec<DatasetInfo>> {
    Json(state.datasets.list())
}

// =============================================================================
// Queries
// =============================================================================

pub async fn query_dataset(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    RawQuery(raw): RawQuery,
) -> ApiResult<PageResponse> {
    let dataset = lookup(&state, &name)?;
    let params = query_params(raw);
    tracing::debug!("GET {} {:?}", name, params);
    dataset
        .handler()
        .handle(&params)
        .await
        .map(Json)
        .map_err(|e| query_error(&name, e))
}

pub async fn query_dataset_structured(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(query): Json<StructuredQuery>,
) -> ApiResult<PageResponse> {
    let dataset = lookup(&state, &name)?;
    tracing::debug!("POST {} {:?}", name, query);
    dataset
        .handler()
        .handle_structured(&query)
        .await
        .map(Json)
        .map_err(|e| query_error(&name, e))
}

pub async fn explain_dataset(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    RawQuery(raw): RawQuery,
) -> ApiResult<SqlPreview> {
    let dataset = lookup(&state, &name)?;
    dataset
        .handler()
        .explain(dataset.name(), &query_params(raw))
        .map(Json)
        .map_err(|e| query_error(&name, e))
}

#[cfg(test)]
mod tests {
    use crate::datasets::registry::DatasetRegistry;
    use crate::datasets::{Dataset, DatasetConfig};
    use crate::{router, AppState};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn users() -> Vec<Value> {
        vec![
            json!({"id": 1, "name": "Marianne", "age": 29, "user": {"email": "marianne@x.io"}}),
            json!({"id": 2, "name": "Hannah", "age": 31, "user": {"email": "hannah@x.io"}}),
            json!({"id": 3, "name": "Annabel", "age": 40, "user": {"email": "annabel@y.io"}}),
            json!({"id": 4, "name": "Joanna", "age": 22, "user": {"email": "joanna@x.io"}}),
            json!({"id": 5, "name": "Danny", "age": 16, "user": {"email": "danny@y.io"}}),
            json!({"id": 6, "name": "Suzanne", "age": 54, "user": {"email": null}}),
            json!({"id": 7, "name": "Leanne", "age": 18, "user": {"email": "leanne@x.io"}}),
            json!({"id": 8, "name": "Bob", "age": 35, "user": {"email": "bob@x.io"}}),
        ]
    }

    fn app() -> axum::Router {
        let config: DatasetConfig = toml::from_str(
            r#"
            name = "users"
            data = "users.json"
            default_take = 20
            max_take = 50

            [aliases]
            email = "user.email"
            "#,
        )
        .unwrap();
        let mut datasets = DatasetRegistry::new();
        datasets.add(Dataset::from_rows(&config, users(), 100, 100));
        router(Arc::new(AppState {
            datasets,
            started_at: chrono::Utc::now(),
        }))
    }

    async fn send(req: Request<Body>) -> (StatusCode, Value) {
        let resp = app().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get(uri: &str) -> (StatusCode, Value) {
        send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    fn names(body: &Value) -> Vec<&str> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["datasets"], 1);
    }

    #[tokio::test]
    async fn test_list_datasets() {
        let (status, body) = get("/api/datasets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "users");
        assert_eq!(body[0]["rows"], 8);
        assert_eq!(body[0]["aliases"]["email"], "user.email");
        assert_eq!(body[0]["max_take"], 50);
    }

    #[tokio::test]
    async fn test_end_to_end_filter_sort_page() {
        let (status, body) =
            get("/api/datasets/users?filter=age:gte:18&filter=name:like:ann&sort=name.asc&page=0&take=2")
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body), ["Hannah", "Joanna"]);
        assert_eq!(body["data"][0]["id"], 2);
        assert_eq!(
            body["meta"],
            json!({
                "page": 0,
                "take": 2,
                "itemCount": 2,
                "pageCount": 3,
                "hasPreviousPage": false,
                "hasNextPage": true
            })
        );
    }

    #[tokio::test]
    async fn test_last_page() {
        let (_, body) =
            get("/api/datasets/users?filter=age:gte:18&filter=name:like:ann&sort=name.asc&page=2&take=2")
                .await;
        assert_eq!(names(&body), ["Suzanne"]);
        assert_eq!(body["meta"]["hasNextPage"], false);
        assert_eq!(body["meta"]["hasPreviousPage"], true);
    }

    #[tokio::test]
    async fn test_alias_and_projection() {
        let (status, body) =
            get("/api/datasets/users?filter=email:ends:%40y.io&sort=id.desc&select=id&select=email").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"],
            json!([
                {"id": 5, "user.email": "danny@y.io"},
                {"id": 3, "user.email": "annabel@y.io"}
            ])
        );
        assert_eq!(body["meta"]["take"], 20);
    }

    #[tokio::test]
    async fn test_bad_tokens_are_400() {
        for uri in [
            "/api/datasets/users?filter=age:foo:18",
            "/api/datasets/users?filter=age",
            "/api/datasets/users?sort=name",
            "/api/datasets/users?select=user.e-mail",
            "/api/datasets/users?filter=age:between:18",
        ] {
            let (status, body) = get(uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_unknown_column_is_500() {
        let (status, body) = get("/api/datasets/users?filter=phone:eq:1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "query engine rejected filter on 'phone'");
    }

    #[tokio::test]
    async fn test_unknown_dataset_is_404() {
        let (status, body) = get("/api/datasets/orders").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Dataset 'orders' not found");
    }

    #[tokio::test]
    async fn test_structured_query() {
        let req = Request::post("/api/datasets/users/query")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "filters": [{"path": "age", "op": "between", "value": "20,35"}],
                    "sorts": [{"path": "age", "direction": "desc"}],
                    "take": 3
                })
                .to_string(),
            ))
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body), ["Bob", "Hannah", "Marianne"]);
        assert_eq!(body["meta"]["pageCount"], 2);
    }

    #[tokio::test]
    async fn test_structured_unknown_operator() {
        let req = Request::post("/api/datasets/users/query")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"filters": [{"path": "age", "op": "foo", "value": "1"}]}).to_string(),
            ))
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown operator: \"foo\"");
    }

    #[tokio::test]
    async fn test_explain() {
        let (status, body) = get("/api/datasets/users/explain?filter=email:starts:ann&take=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], "SELECT count(*) FROM users WHERE user.email LIKE ?");
        assert_eq!(
            body["select"],
            "SELECT id, name, age, user FROM users WHERE user.email LIKE ? LIMIT ? OFFSET ?"
        );
        assert_eq!(body["args"], json!(["ann%"]));
        assert_eq!(body["page_args"], json!([5, 0]));
    }
}
