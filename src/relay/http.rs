use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::service::{Origination, Relay};
use crate::foundation::error::RelayError;
use crate::route::Route;

#[derive(Debug, Default, serde::Deserialize)]
struct RelayQuery {
    #[serde(default)]
    init: String,
    #[serde(default)]
    id: String,
    #[serde(default, rename = "type")]
    kind: String,
}

/// Routes served by every host.
pub fn router(relay: Arc<Relay>) -> Router {
    let body_limit = relay.settings().max_body_bytes;
    Router::new()
        .route("/", get(health))
        .route("/favicon.ico", get(favicon))
        .route("/list", get(list))
        .route("/relay", get(relay_route).post(relay_route))
        .fallback(health)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

async fn health() -> &'static str {
    "ok"
}

async fn favicon() -> StatusCode {
    StatusCode::OK
}

/// Always answers: a route that cannot be built is logged and listed empty.
async fn list(State(relay): State<Arc<Relay>>) -> Response {
    let route = relay.default_route().await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "could not build default route");
        Route::default()
    });
    json_response(StatusCode::OK, &route)
}

async fn relay_route(
    State(relay): State<Arc<Relay>>,
    Query(query): Query<RelayQuery>,
    body: String,
) -> Response {
    if !query.init.is_empty() {
        let request = Origination {
            id: (!query.id.is_empty()).then_some(query.id),
            image: body,
            random: query.kind == "random",
        };
        return match relay.originate(request).await {
            Ok(route) => json_response(StatusCode::OK, &*route),
            Err(e) => e.into_response(),
        };
    }

    let route: Route = match serde_json::from_str(&body) {
        Ok(route) => route,
        Err(e) => {
            tracing::warn!(error = %e, "could not parse incoming route");
            return RelayError::from(e).into_response();
        }
    };
    match relay.relay(route).await {
        Ok(_) => (StatusCode::OK, "ok").into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NoMoreToStamp => StatusCode::CONFLICT,
            Self::NoOperationSelected
            | Self::DecodeFailure(_)
            | Self::Validation(_)
            | Self::Serde(_) => StatusCode::BAD_REQUEST,
            Self::NodeNotFound(_) | Self::AssetNotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

/// Four-space indented JSON.
fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    if let Err(e) = value.serialize(&mut ser) {
        return RelayError::Other(anyhow::Error::new(e).context("serialize response"))
            .into_response();
    }
    (status, [(header::CONTENT_TYPE, "application/json")], buf).into_response()
}

#[cfg(test)]
#[path = "../../tests/unit/relay/http.rs"]
mod tests;
