use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::time::Duration;
use tracing::{error, info};

use crate::error::Error;
use crate::ics::CONTENT_TYPE;
use crate::registry::Subscriptions;
use crate::service::FeedService;

pub const ICS_PATH: &str = "/ics";
pub const SUBSCRIBE_PATH: &str = "/subscribe";

pub struct AppState {
    pub service: Arc<FeedService>,
    pub subscriptions: Subscriptions,
    /// TTL passed to every build; zero keeps the stored or default TTL.
    pub ttl: Duration,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route(&format!("{ICS_PATH}/:key"), get(handle_ics))
        .route(&format!("{SUBSCRIBE_PATH}/:key"), get(handle_subscribe))
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not found") })
        .with_state(state)
}

#[derive(Serialize)]
struct Listing<'a> {
    key: &'a str,
    name: &'a str,
    description: &'a str,
    url: String,
    subscribe: String,
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Response {
    let listings = state
        .subscriptions
        .iter()
        .map(|(key, subscriber)| Listing {
            key,
            name: subscriber.name(),
            description: subscriber.description(),
            url: format!("{ICS_PATH}/{key}"),
            subscribe: format!("{SUBSCRIBE_PATH}/{key}"),
        })
        .collect::<Vec<_>>();

    Json(listings).into_response()
}

async fn handle_ics(State(state): State<Arc<AppState>>, Path(key): Path<String>) -> Response {
    let subscriber = match state.subscriptions.get(&key) {
        Ok(subscriber) => subscriber,
        Err(err) => return error_response(&err),
    };

    match state.service.get_or_build(&key, &**subscriber, state.ttl).await {
        Ok(content) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], content.to_string()).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn handle_subscribe(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(err) = state.subscriptions.get(&key) {
        return error_response(&err);
    }

    let Some(host) = headers.get(header::HOST).and_then(|host| host.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, "Missing host header").into_response();
    };

    let location = format!("webcal://{host}{ICS_PATH}/{key}");
    info!(key, %location, "Redirecting to calendar subscription");

    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn error_response(err: &Error) -> Response {
    match err.root() {
        Error::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()).into_response(),
        _ => {
            let message = err.chain();
            error!(error = %message, "Failed to serve feed");
            (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
        }
    }
}
