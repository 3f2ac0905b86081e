//! HTTP signal server implementation

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use growltalk_core::{ProxyConfig, SessionError};

use crate::lifecycle::SessionLifecycle;
use crate::messages::{
    CallerIdParams, CallersParams, CallersResponse, EnvResponse, ErrorResponse, HealthResponse,
    SignInParams, SignInResponse, SignOutResponse, StatsResponse, UpdateCallerRequest,
};
use crate::registry::Registry;

/// Shared handler state
#[derive(Clone)]
struct AppState {
    sessions: Arc<SessionLifecycle>,
    client_env: Arc<EnvResponse>,
}

/// Session error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub SessionError);

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code(),
        };
        (status, Json(body)).into_response()
    }
}

/// Signal server state
pub struct SignalServer {
    sessions: Arc<SessionLifecycle>,
    client_env: Arc<EnvResponse>,
}

impl SignalServer {
    pub fn new(registry: Arc<Registry>, proxy: &ProxyConfig) -> Self {
        let client_env = EnvResponse::new(registry.ttl_ms(), proxy);
        Self {
            sessions: Arc::new(SessionLifecycle::new(registry)),
            client_env: Arc::new(client_env),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionLifecycle> {
        &self.sessions
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        let state = AppState {
            sessions: self.sessions.clone(),
            client_env: self.client_env.clone(),
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::PUT, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        Router::new()
            .route("/sign-in", get(sign_in))
            .route("/keep-session", get(keep_session))
            .route("/sign-out", get(sign_out))
            .route("/callers", get(callers))
            .route("/caller", put(update_caller))
            .route("/env", get(client_env))
            .route("/health", get(health))
            .route("/stats", get(stats))
            .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the sweeper and serve until ctrl-c
    pub async fn serve(&self, addr: SocketAddr) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        info!("Signal server listening on {}", listener.local_addr()?);

        let sweeper = self.sessions.spawn_sweeper();

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.abort();
        info!("Signal server stopped");
        result
    }

    /// Get caller count (for monitoring)
    pub fn caller_count(&self) -> usize {
        self.sessions.registry().len()
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn sign_in(
    State(state): State<AppState>,
    Query(params): Query<SignInParams>,
) -> Result<Json<SignInResponse>, ApiError> {
    let record = state
        .sessions
        .sign_in(params.caller_type.as_deref(), params.caller_name.as_deref())?;
    Ok(Json(SignInResponse {
        caller_id: record.caller_id,
    }))
}

async fn keep_session(
    State(state): State<AppState>,
    Query(params): Query<CallerIdParams>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.sessions.keep_session(params.caller_id.as_deref())?;
    Ok(Json(record))
}

async fn sign_out(
    State(state): State<AppState>,
    Query(params): Query<CallerIdParams>,
) -> Result<Json<SignOutResponse>, ApiError> {
    let caller_id = state.sessions.sign_out(params.caller_id.as_deref())?;
    Ok(Json(SignOutResponse {
        caller_id,
        message: format!("Caller {} signed out", caller_id),
    }))
}

async fn callers(
    State(state): State<AppState>,
    Query(params): Query<CallersParams>,
) -> Json<CallersResponse> {
    let query = params.into_query();
    let result = state.sessions.callers(&query).await;
    Json(CallersResponse {
        total_clients: result.total,
        filtered_sdp_clients: result.callers,
    })
}

async fn update_caller(
    State(state): State<AppState>,
    payload: Result<Json<UpdateCallerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected caller update: {}", rejection.body_text());
        SessionError::invalid(rejection.body_text())
    })?;
    let (caller_id, fields) = request.into_parts()?;
    let record = state.sessions.caller(caller_id.as_ref(), fields)?;
    Ok(Json(record))
}

async fn client_env(State(state): State<AppState>) -> Json<EnvResponse> {
    Json(state.client_env.as_ref().clone())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.sessions.registry().stats().into())
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.sessions.registry().stats().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use growltalk_core::ManualClock;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn server() -> SignalServer {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let registry = Arc::new(Registry::with_clock(Duration::from_secs(10), clock));
        let proxy = ProxyConfig {
            server_ip: Some("10.0.0.5".into()),
            server_port: Some(9999),
        };
        SignalServer::new(registry, &proxy)
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        call(app, request).await
    }

    async fn put_json(app: &Router, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("PUT")
            .uri("/caller")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        call(app, request).await
    }

    #[tokio::test]
    async fn test_sign_in_errors() {
        let app = server().router();

        let (status, body) = get_json(&app, "/sign-in?callerName=Baloo").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("invalid_request"));

        let (status, _) = get_json(&app, "/sign-in?callerType=robot&callerName=Baloo").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(&app, "/sign-in?callerType=kiosk").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_keep_session_and_sign_out_errors() {
        let app = server().router();

        let (status, _) = get_json(&app, "/keep-session").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get_json(&app, "/keep-session?callerId=123").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], json!("not_found"));

        let (status, _) = get_json(&app, "/sign-out?callerId=123").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sign_out() {
        let app = server().router();
        let (_, body) = get_json(&app, "/sign-in?callerType=operator&callerName=Akela").await;
        let id = body["callerId"].as_u64().unwrap();

        let (status, body) = get_json(&app, &format!("/sign-out?callerId={}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["callerId"], json!(id));
        assert!(body["message"].as_str().unwrap().contains("signed out"));

        let (_, body) = get_json(&app, "/callers").await;
        assert_eq!(body["totalClients"], json!(0));
    }

    #[tokio::test]
    async fn test_update_errors() {
        let app = server().router();

        let (status, _) = put_json(&app, json!({"callerStatus": "BUSY"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = get_json(&app, "/sign-in?callerType=kiosk&callerName=Baloo").await;
        let id = body["callerId"].clone();

        let (status, _) = put_json(&app, json!({"callerId": id})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = put_json(&app, json!({"callerId": 42, "callerStatus": "BUSY"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = put_json(&app, json!({"callerId": id, "callerStatus": null})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("invalid_request"));
        assert!(body["error"].as_str().unwrap().contains("callerStatus cannot be null"));

        let request = Request::builder()
            .method("PUT")
            .uri("/caller")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("invalid_request"));
    }

    #[tokio::test]
    async fn test_kiosk_operator_scenario() {
        let app = server().router();

        let (status, body) = get_json(&app, "/sign-in?callerType=kiosk&callerName=Baloo").await;
        assert_eq!(status, StatusCode::OK);
        let kiosk_id = body["callerId"].as_u64().unwrap();

        let (_, body) = get_json(&app, "/sign-in?callerType=operator&callerName=Akela").await;
        let operator_id = body["callerId"].as_u64().unwrap();

        let (status, body) = get_json(
            &app,
            "/callers?callerStatus=AVAILABLE&callerType=kiosk&limit=1&wait=5",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalClients"], json!(2));
        let found = body["filteredSdpClients"].as_array().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["callerId"], json!(kiosk_id));
        assert_eq!(found[0]["callerName"], json!("Baloo"));

        let answer = json!({"type": "answer", "sdp": "v=0\r\n", "caller": kiosk_id, "callee": operator_id});
        let (status, body) = put_json(
            &app,
            json!({"callerId": kiosk_id.to_string(), "sdpAnswer": answer, "callerStatus": "BUSY"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["callerStatus"], json!("BUSY"));

        let (status, body) = put_json(&app, json!({"callerId": operator_id, "callerStatus": "BUSY"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["callerType"], json!("operator"));

        let (status, body) = get_json(&app, &format!("/keep-session?callerId={}", kiosk_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["callerStatus"], json!("BUSY"));
        assert_eq!(body["sdpAnswer"], answer);

        let (_, body) = get_json(&app, "/callers?callerStatus=AVAILABLE&callerType=kiosk").await;
        assert!(body["filteredSdpClients"].as_array().unwrap().is_empty());

        let (_, body) = get_json(&app, "/stats").await;
        assert_eq!(body["busy"], json!(2));
        assert_eq!(body["kiosks"], json!(1));
    }

    #[tokio::test]
    async fn test_env_and_health() {
        let app = server().router();

        let (status, body) = get_json(&app, "/env").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["DELETE_TIMER"], json!(10_000));
        assert_eq!(body["PROXY_SERVER_IP"], json!("10.0.0.5"));
        assert_eq!(body["PROXY_SERVER_PORT"], json!(9999));

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
        assert_eq!(body["callers"], json!(0));

        let (status, _) = get_json(&app, "/favicon.ico").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_server_creation() {
        let server = server();
        assert_eq!(server.caller_count(), 0);
    }
}
