//! HTTP surface - inbound API, bearer auth, action envelopes
//!
//! Thin glue: handlers validate the request shape, check the credential,
//! and delegate to the confirmation workflow. Typed errors map onto HTTP
//! statuses here and nowhere else.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::core::{Error, SuggestionStore};
use crate::workflow::ConfirmationWorkflow;

pub const SERVICE_NAME: &str = "aria-tx";

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<ConfirmationWorkflow>,
    pub store: Arc<dyn SuggestionStore>,
    pub auth_token: String,
}

/// Create the router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/memory", get(memory))
        .route("/assistant", post(assistant))
        .route("/confirm", post(confirm))
        .with_state(state)
}

async fn home() -> Json<serde_json::Value> {
    Json(json!({
        "status": format!("{SERVICE_NAME} is online"),
        "mode": "crypto-only",
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "service": SERVICE_NAME}))
}

async fn memory(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "memory_summary": state.store.summary(),
        "recent": state.store.document(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AssistantRequest {
    #[serde(default)]
    pub prompt: String,
}

async fn assistant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AssistantRequest>,
) -> Result<Response, ApiError> {
    authorize(&headers, &state.auth_token)?;
    if req.prompt.trim().is_empty() {
        return Err(Error::Validation("prompt is required".to_string()).into());
    }

    let reply = state.workflow.request_suggestion(&req.prompt).await?;
    Ok(Json(reply).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub suggestion_id: String,
    #[serde(default)]
    pub confirm: bool,
}

async fn confirm(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConfirmRequest>,
) -> Result<Response, ApiError> {
    authorize(&headers, &state.auth_token)?;
    if req.suggestion_id.is_empty() {
        return Err(Error::Validation("suggestion_id is required".to_string()).into());
    }

    let reply = state.workflow.confirm(&req.suggestion_id, req.confirm).await?;
    Ok(Json(reply).into_response())
}

fn authorize(headers: &HeaderMap, token: &str) -> Result<(), ApiError> {
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();

    if provided != token {
        return Err(Error::Unauthorized.into());
    }
    Ok(())
}

/// Wrapper mapping the error taxonomy onto HTTP statuses and the action
/// envelope the operator's client expects.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({"action": "error", "reason": "unauthorized"}),
            ),
            Error::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({"action": "error", "reason": msg}),
            ),
            // Order-validation failures keep the rejected envelope.
            Error::SymbolNotAllowed(_) | Error::MissingReason => (
                StatusCode::BAD_REQUEST,
                json!({"action": "rejected", "reason": self.0.to_string()}),
            ),
            Error::NotFound(id) => (
                StatusCode::NOT_FOUND,
                json!({"action": "error", "reason": "suggestion not found", "suggestion_id": id}),
            ),
            // Recoverable: raw oracle text goes back verbatim, never as an order.
            Error::MalformedDecision { raw } => {
                (StatusCode::OK, json!({"action": "error", "raw": raw}))
            }
            // Domain rejection: the suggestion stays pending.
            Error::DrawdownExceeded { .. } => (
                StatusCode::OK,
                json!({"action": "rejected", "reason": self.0.to_string()}),
            ),
            Error::PriceUnavailable(_)
            | Error::UnsupportedSymbol(_)
            | Error::EquityUnavailable(_)
            | Error::OracleUnavailable(_)
            | Error::Broker(_) => (
                StatusCode::BAD_GATEWAY,
                json!({"action": "error", "reason": self.0.to_string()}),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"action": "error", "reason": self.0.to_string()}),
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Config, RiskConfig};
    use crate::core::{
        AccountSnapshot, BrokerOrder, Broker, DecisionOracle, PriceFeed, Result, Side, Symbol,
    };
    use crate::risk::RiskSizer;
    use crate::runner::ExecutionRunner;
    use crate::store::JsonFileStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    struct ScriptedOracle(String);

    #[async_trait]
    impl DecisionOracle for ScriptedOracle {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FixedFeed;

    #[async_trait]
    impl PriceFeed for FixedFeed {
        async fn spot_price(&self, _symbol: &Symbol) -> Result<Decimal> {
            Ok(Decimal::from(50_000))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct OkBroker;

    #[async_trait]
    impl Broker for OkBroker {
        async fn account(&self) -> Result<AccountSnapshot> {
            Ok(AccountSnapshot {
                equity: Decimal::from(10_000),
            })
        }

        async fn submit_order(
            &self,
            _symbol: &Symbol,
            _side: Side,
            _qty: Decimal,
        ) -> Result<BrokerOrder> {
            Ok(BrokerOrder {
                id: "b-1".to_string(),
                raw: serde_json::json!({"id": "b-1"}),
            })
        }
    }

    fn app(oracle_reply: &str) -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn SuggestionStore> =
            Arc::new(JsonFileStore::open(dir.path().join("memory.json")).unwrap());
        let (tx, rx) = flume::unbounded();
        ExecutionRunner::new(Arc::clone(&store), Arc::new(OkBroker), rx).spawn();

        let workflow = Arc::new(ConfirmationWorkflow::new(
            Arc::new(ScriptedOracle(oracle_reply.to_string())),
            Arc::new(OkBroker),
            RiskSizer::new(Arc::new(FixedFeed), RiskConfig::default()),
            Arc::clone(&store),
            &Config::default(),
            tx,
        ));

        let router = create_router(AppState {
            workflow,
            store,
            auth_token: "phone-secret".to_string(),
        });
        (router, dir)
    }

    fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let (app, _dir) = app(r#"{"action":"analysis","text":"hi"}"#);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn assistant_requires_bearer_token() {
        let (app, _dir) = app(r#"{"action":"analysis","text":"hi"}"#);

        let missing = app
            .clone()
            .oneshot(post_json("/assistant", None, json!({"prompt": "hello"})))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .oneshot(post_json(
                "/assistant",
                Some("wrong-token"),
                json!({"prompt": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_prompt_is_bad_request() {
        let (app, _dir) = app(r#"{"action":"analysis","text":"hi"}"#);
        let response = app
            .oneshot(post_json(
                "/assistant",
                Some("phone-secret"),
                json!({"prompt": "  "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analysis_reply_round_trips() {
        let (app, _dir) = app(r#"{"action":"analysis","text":"BTC is quiet"}"#);
        let response = app
            .oneshot(post_json(
                "/assistant",
                Some("phone-secret"),
                json!({"prompt": "analyze BTCUSD"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["action"], "analysis");
        assert_eq!(body["text"], "BTC is quiet");
    }

    #[tokio::test]
    async fn disallowed_symbol_is_rejected_with_400() {
        let (app, _dir) = app(
            r#"{"action":"order","side":"buy","symbol":"DOGEUSD","reason":"much wow"}"#,
        );
        let response = app
            .oneshot(post_json(
                "/assistant",
                Some("phone-secret"),
                json!({"prompt": "buy doge"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["action"], "rejected");
        assert_eq!(body["reason"], "symbol not allowed");
    }

    #[tokio::test]
    async fn malformed_oracle_output_surfaces_raw_text() {
        let (app, _dir) = app("just buy the dip");
        let response = app
            .oneshot(post_json(
                "/assistant",
                Some("phone-secret"),
                json!({"prompt": "thoughts?"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["action"], "error");
        assert_eq!(body["raw"], "just buy the dip");
    }

    #[tokio::test]
    async fn confirm_unknown_suggestion_is_404() {
        let (app, _dir) = app(r#"{"action":"analysis","text":"hi"}"#);
        let response = app
            .oneshot(post_json(
                "/confirm",
                Some("phone-secret"),
                json!({"suggestion_id": "sugg-unknown", "confirm": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn assistant_then_confirm_happy_path() {
        let (app, _dir) = app(
            r#"{"action":"order","side":"buy","symbol":"BTCUSD","reason":"breakout","suggested_stop":49000}"#,
        );

        let response = app
            .clone()
            .oneshot(post_json(
                "/assistant",
                Some("phone-secret"),
                json!({"prompt": "should I buy BTC?"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["action"], "require_confirm");
        let id = body["suggestion"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["suggestion"]["status"], "pending");

        let response = app
            .oneshot(post_json(
                "/confirm",
                Some("phone-secret"),
                json!({"suggestion_id": id, "confirm": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["action"], "placed_request");
    }

    #[tokio::test]
    async fn memory_reports_counts() {
        let (app, _dir) = app(r#"{"action":"analysis","text":"quiet day"}"#);
        app.clone()
            .oneshot(post_json(
                "/assistant",
                Some("phone-secret"),
                json!({"prompt": "analyze"}),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(Request::builder().uri("/memory").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["memory_summary"]["analyses_count"], 1);
        assert_eq!(body["memory_summary"]["suggested_orders_count"], 0);
    }
}
