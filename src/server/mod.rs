//! HTTP front for the asset cache.
//!
//! Every request falls through to the cache: shell assets come from the
//! current cache version when present, everything else is fetched from the
//! origin.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::assets::{AssetCache, AssetFetcher, Served};

/// Shared state for the asset handler.
#[derive(Clone)]
pub struct ServerContext {
    pub cache: Arc<AssetCache>,
    pub fetcher: Arc<dyn AssetFetcher>,
}

/// Build the router serving everything through the cache.
pub fn create_router(ctx: ServerContext) -> Router {
    Router::new()
        .fallback(serve_asset)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Serve until Ctrl+C or SIGTERM.
pub async fn start_server(ctx: ServerContext, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid server address")?;

    let app = create_router(ctx);

    tracing::info!("Starting asset server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn serve_asset(State(ctx): State<ServerContext>, method: Method, uri: Uri) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    match ctx.cache.respond(method.as_str(), path, ctx.fetcher.as_ref()).await {
        Ok((asset, served)) => {
            let status = StatusCode::from_u16(asset.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = Response::builder()
                .status(status)
                .header("x-localreel-cache", served_label(served));
            if let Some(content_type) = &asset.content_type {
                response = response.header(header::CONTENT_TYPE, content_type);
            }
            response
                .body(Body::from(asset.body))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(e) => {
            tracing::warn!("Failed to serve {} {}: {}", method, path, e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

fn served_label(served: Served) -> &'static str {
    match served {
        Served::Passthrough => "passthrough",
        Served::Cache => "hit",
        Served::Network => "miss",
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
