//! HTTP surface: router assembly, cookies, shared state, and the serve loop.

pub mod cookies;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::{AppState, PROVIDER_NAME, ServerSettings};

// crates.io
use axum::{Router, extract::Request};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Span;

/// Router with CORS and request tracing layers applied.
pub fn app(state: AppState) -> Router {
	router(state)
		.layer(CorsLayer::permissive())
		.layer(TraceLayer::new_for_http().make_span_with(request_span))
}

/// Request span carrying the method and path only; query strings hold callback codes.
fn request_span(request: &Request) -> Span {
	tracing::info_span!(
		"request",
		method = %request.method(),
		path = request.uri().path(),
	)
}

/// Binds `addr` and serves `state` until Ctrl+C or SIGTERM.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
	let listener = TcpListener::bind(addr).await?;

	tracing::info!(addr = %listener.local_addr()?, "Listening.");

	axum::serve(listener, app(state)).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = signal::ctrl_c().await {
			tracing::error!(error = %err, "Failed to listen for Ctrl+C.");
			std::future::pending::<()>().await;
		}
	};
	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			},
			Err(err) => {
				tracing::error!(error = %err, "Failed to listen for SIGTERM.");
				std::future::pending::<()>().await;
			},
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}

	tracing::info!("Shutdown signal received.");
}
