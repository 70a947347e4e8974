//! `sf-oauth` service binary.

// std
use std::sync::Arc;
// crates.io
use clap::Parser;
use color_eyre::{Result, eyre::WrapErr};
// self
use sf_oauth::{
	cli::{Cli, SessionBackend},
	config::{self, AppConfig},
	flows::ReqwestAuthFlow,
	http::ReqwestHttpClient,
	server::{self, AppState},
	session::{PrincipalCodec, Sessions},
	store::{MemoryStore, SessionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let dotenv = config::load_dotenv();
	let cli = Cli::parse();

	config::setup_tracing(&cli.log_level, cli.log_format.as_deref())?;

	if let Some(path) = dotenv {
		tracing::debug!(path = %path.display(), "Loaded environment file.");
	}

	let config = AppConfig::from_cli(&cli)?;
	let store = connect_store(&config).await?;
	let codec = PrincipalCodec::new(config.session_secret.expose().as_bytes())?;
	let sessions = Sessions::new(store, codec, config.sessions.clone());
	let http_client = ReqwestHttpClient::with_timeout(config.http_timeout)?;
	let flow = ReqwestAuthFlow::new(config.registry.clone(), sessions, http_client);

	for environment in flow.registry.iter() {
		tracing::info!(
			environment = %environment.id,
			login_url = %environment.login_url,
			default = environment.id == *flow.registry.default_id(),
			"Environment registered."
		);
	}

	let state = AppState::new(
		flow,
		config.cookie.clone(),
		config.redirects.clone(),
		&config.session_secret,
	);

	server::serve(&config.bind_addr, state)
		.await
		.wrap_err_with(|| format!("Server on {} stopped unexpectedly", config.bind_addr))
}

async fn connect_store(config: &AppConfig) -> Result<Arc<dyn SessionStore>> {
	match config.session_backend {
		SessionBackend::Memory => {
			if !config.production {
				tracing::info!("Using in-memory sessions.");
			}

			Ok(Arc::new(MemoryStore::default()))
		},
		#[cfg(feature = "redis")]
		SessionBackend::Redis => {
			let store = sf_oauth::store::RedisStore::connect(&config.redis_url)
				.await
				.wrap_err("Failed to connect to the Redis session store")?;

			tracing::info!("Using Redis sessions.");

			Ok(Arc::new(store))
		},
		#[cfg(not(feature = "redis"))]
		SessionBackend::Redis =>
			Err(color_eyre::eyre::eyre!("This build has no Redis session support")),
	}
}
