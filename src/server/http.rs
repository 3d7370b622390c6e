//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Each connection runs on
//! its own task, so requests are served concurrently.
//!
//! Routes:
//! - `POST /mcp`, `POST /` - one JSON-RPC message per request
//! - `GET /health`, `GET /ready` - probes
//! - `OPTIONS *` - CORS preflight

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::jsonrpc::RpcResponse;
use super::AppState;
use crate::routes::{self, json_response};
use crate::types::Result;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Bind `listen` and serve until the process exits
pub async fn run(state: Arc<AppState>, listen: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!("taskkeep listening on http://{}", listener.local_addr()?);
    serve(state, listener).await
}

/// Accept loop on an already-bound listener
pub async fn serve(state: Arc<AppState>, listener: TcpListener) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        (Method::POST, "/mcp") | (Method::POST, "/") => handle_rpc(state, req).await,

        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state)).await
        }

        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state)).await
        }

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        _ => not_found_response(&path),
    };

    Ok(to_boxed(response))
}

/// One JSON-RPC message in the body, one response (or 202 for a
/// notification) out
async fn handle_rpc(state: Arc<AppState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let declared_len = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > MAX_BODY_BYTES) {
        return payload_too_large_response();
    }

    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Rejected request body: {}", e);
            return payload_too_large_response();
        }
    };

    match state.rpc.handle_bytes(&body).await {
        Some(response) => rpc_response(&response),
        None => {
            let mut response = json_response(StatusCode::ACCEPTED, Bytes::new());
            response.headers_mut().remove(hyper::header::CONTENT_TYPE);
            response
        }
    }
}

/// JSON-RPC replies are always HTTP 200; the error, if any, is in the body
fn rpc_response(response: &RpcResponse) -> Response<Full<Bytes>> {
    match serde_json::to_vec(response) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => {
            error!("Failed to serialize JSON-RPC response: {}", e);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#,
            )
        }
    }
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    response
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
        "hint": "POST JSON-RPC messages to /mcp"
    });
    json_response(StatusCode::NOT_FOUND, body.to_string())
}

fn payload_too_large_response() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Payload Too Large",
        "limit": MAX_BODY_BYTES
    });
    json_response(StatusCode::PAYLOAD_TOO_LARGE, body.to_string())
}
