use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

/// Log the start and outcome of every request, tagged with its request id.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let req_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::debug!(request_id = %req_id, method = %method, uri = %uri, "incoming request");

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();

    match outcome(status) {
        Outcome::ServerError => tracing::error!(
            request_id = %req_id, method = %method, uri = %uri,
            status = %status, duration_ms = %duration_ms,
            "request failed"
        ),
        Outcome::ClientError => tracing::warn!(
            request_id = %req_id, method = %method, uri = %uri,
            status = %status, duration_ms = %duration_ms,
            "request rejected"
        ),
        Outcome::Success => tracing::info!(
            request_id = %req_id, method = %method, uri = %uri,
            status = %status, duration_ms = %duration_ms,
            "request completed"
        ),
    }

    response
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Success,
    ClientError,
    ServerError,
}

fn outcome(status: StatusCode) -> Outcome {
    if status.is_server_error() {
        Outcome::ServerError
    } else if status.is_client_error() {
        Outcome::ClientError
    } else {
        Outcome::Success
    }
}

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
