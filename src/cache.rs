//! Time-bounded, single-flight memoization of user-info lookups.
//!
//! The cache is keyed by access token. Each key owns its own async guard (the
//! per-key variant of a singleflight lock), so concurrent requests for the
//! same token block on one computation while unrelated tokens proceed in
//! parallel. Entries expire a fixed duration after insertion; a dedicated
//! reaper thread owned by the cache drops idle expired entries and must be
//! stopped at shutdown, though correctness never depends on it.

// std
use std::thread::JoinHandle;
// self
use crate::_prelude::*;

/// Default entry lifetime applied when the filter is not configured otherwise.
pub const DEFAULT_EXPIRATION: Duration = Duration::seconds(20);

type SlotMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<CacheSlot>>>>>;

#[derive(Default)]
struct CacheSlot {
	entry: Option<(JsonObject, OffsetDateTime)>,
}

/// Concurrency-safe cache of user-info claim maps keyed by access token.
pub struct UserInfoCache {
	expiration: Duration,
	slots: SlotMap,
	reaper: Mutex<Option<Reaper>>,
}
impl UserInfoCache {
	/// Creates a cache whose entries live for `expiration` after insertion.
	///
	/// A zero (or negative) expiration disables caching entirely: every call
	/// recomputes and no reaper thread is spawned.
	pub fn new(expiration: Duration) -> Self {
		let slots = SlotMap::default();
		let reaper =
			expiration.is_positive().then(|| Reaper::spawn(slots.clone(), expiration));

		Self { expiration, slots, reaper: Mutex::new(reaper) }
	}

	/// Configured entry lifetime.
	pub fn expiration(&self) -> Duration {
		self.expiration
	}

	/// Returns the cached claims for the token, computing them on a miss.
	///
	/// At most one computation runs per distinct key at a time; concurrent
	/// callers for the same key wait for it and reuse its result. Failures are
	/// never cached, so the next access retries.
	pub async fn get<F, Fut>(&self, access_token: &str, compute: F) -> Result<JsonObject>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<JsonObject>>,
	{
		if !self.expiration.is_positive() {
			return compute().await;
		}

		let slot = self.slots.lock().entry(access_token.to_owned()).or_default().clone();
		let mut guard = slot.lock().await;
		let now = OffsetDateTime::now_utc();

		if let Some((value, expires_at)) = &guard.entry
			&& now < *expires_at
		{
			return Ok(value.clone());
		}

		let value = compute().await?;

		guard.entry = Some((value.clone(), now + self.expiration));

		Ok(value)
	}

	/// Number of keys currently held, in-flight computations included.
	pub fn entry_count(&self) -> usize {
		self.slots.lock().len()
	}

	/// Stops the reaper thread and drops every cached entry.
	///
	/// Idempotent; also invoked on drop.
	pub fn shutdown(&self) {
		if let Some(reaper) = self.reaper.lock().take() {
			reaper.stop();
		}

		self.slots.lock().clear();
	}
}
impl Debug for UserInfoCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserInfoCache")
			.field("expiration", &self.expiration)
			.field("entries", &self.entry_count())
			.finish()
	}
}
impl Drop for UserInfoCache {
	fn drop(&mut self) {
		self.shutdown();
	}
}

struct ReaperSignal {
	stopped: Mutex<bool>,
	condvar: Condvar,
}

/// Background expiry thread owned by one cache instance.
struct Reaper {
	handle: Option<JoinHandle<()>>,
	signal: Arc<ReaperSignal>,
}
impl Reaper {
	fn spawn(slots: SlotMap, expiration: Duration) -> Self {
		let signal =
			Arc::new(ReaperSignal { stopped: Mutex::new(false), condvar: Condvar::new() });
		let interval = std::time::Duration::try_from(expiration)
			.unwrap_or(std::time::Duration::from_secs(1));
		let shared = signal.clone();
		let handle = std::thread::spawn(move || {
			loop {
				let mut stopped = shared.stopped.lock();

				if *stopped {
					return;
				}

				shared.condvar.wait_for(&mut stopped, interval);

				if *stopped {
					return;
				}

				drop(stopped);

				let now = OffsetDateTime::now_utc();

				// A slot that cannot be locked has a computation in flight and
				// must survive the sweep.
				slots.lock().retain(|_, slot| match slot.try_lock() {
					Some(guard) =>
						guard.entry.as_ref().is_some_and(|(_, expires_at)| now < *expires_at),
					None => true,
				});
			}
		});

		Self { handle: Some(handle), signal }
	}

	fn stop(mut self) {
		*self.signal.stopped.lock() = true;

		self.signal.condvar.notify_all();

		if let Some(handle) = self.handle.take() {
			let _ = handle.join();
		}
	}
}
