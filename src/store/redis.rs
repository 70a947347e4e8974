//! Redis-backed [`SessionStore`] for multi-replica and production deployments.

// crates.io
use redis::{AsyncCommands, Client, RedisError, aio::MultiplexedConnection};
// self
use crate::{
	_prelude::*,
	store::{SessionStore, StoreError, StoreFuture},
};

/// Session storage on a shared Redis server using `SET EX`, `GET`, and `DEL`.
///
/// The multiplexed connection is cloned per call; clones share one socket.
#[derive(Clone)]
pub struct RedisStore {
	connection: MultiplexedConnection,
}
impl RedisStore {
	/// Opens a multiplexed connection to `url` and pings the server.
	///
	/// Fails fast when the server is unreachable so a misconfigured deployment never starts.
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		let client = Client::open(url).map_err(backend_error)?;
		let mut connection =
			client.get_multiplexed_async_connection().await.map_err(backend_error)?;
		let pong: String =
			redis::cmd("PING").query_async(&mut connection).await.map_err(backend_error)?;

		tracing::debug!(reply = %pong, "Redis session store connected.");

		Ok(Self { connection })
	}
}
impl Debug for RedisStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RedisStore").finish_non_exhaustive()
	}
}
impl SessionStore for RedisStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let mut connection = self.connection.clone();

		Box::pin(async move { connection.get(key).await.map_err(backend_error) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> StoreFuture<'a, ()> {
		let mut connection = self.connection.clone();
		// Redis rejects zero and negative expirations.
		let seconds = ttl.whole_seconds().max(1) as u64;

		Box::pin(async move { connection.set_ex(key, value, seconds).await.map_err(backend_error) })
	}

	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		let mut connection = self.connection.clone();

		Box::pin(async move {
			let _: u64 = connection.del(key).await.map_err(backend_error)?;

			Ok(())
		})
	}
}

fn backend_error(err: RedisError) -> StoreError {
	StoreError::Backend { message: err.to_string() }
}
