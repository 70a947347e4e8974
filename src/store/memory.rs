//! Thread-safe in-memory [`SessionStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{SessionStore, StoreFuture},
};

#[derive(Clone, Debug)]
struct Entry {
	value: String,
	expires_at: OffsetDateTime,
}

type StoreMap = Arc<RwLock<HashMap<String, Entry>>>;

/// Process-local session storage; entries vanish on restart and are not shared across replicas.
///
/// Expired entries are invisible to readers and purged lazily on the next write.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of entries still alive at `now`.
	pub fn live_len(&self) -> usize {
		let now = OffsetDateTime::now_utc();

		self.0.read().values().filter(|entry| entry.expires_at > now).count()
	}

	fn get_now(map: &StoreMap, key: &str) -> Option<String> {
		let now = OffsetDateTime::now_utc();

		map.read().get(key).filter(|entry| entry.expires_at > now).map(|entry| entry.value.clone())
	}

	fn set_now(map: &StoreMap, key: &str, value: String, ttl: Duration) {
		let now = OffsetDateTime::now_utc();
		let mut guard = map.write();

		guard.retain(|_, entry| entry.expires_at > now);
		guard.insert(key.to_owned(), Entry { value, expires_at: now + ttl });
	}
}
impl SessionStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(Self::get_now(&self.0, key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			Self::set_now(&self.0, key, value, ttl);

			Ok(())
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().remove(key);

			Ok(())
		})
	}
}
