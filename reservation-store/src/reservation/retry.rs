use crate::reservation::error::ReservationError;
use crate::room::key::RoomKey;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// How often an operation that lost against a concurrent modification is run again.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
	/// Total number of attempts, including the first one.
	pub maximum_attempts: u32,
	/// Waiting time after the first lost attempt, grows linearly with every further one.
	#[serde(with = "humantime_serde")]
	pub backoff: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			maximum_attempts: 5,
			backoff: Duration::from_millis(10),
		}
	}
}

impl RetryPolicy {
	/// Run `operation` on `key` until it finishes with anything but [`ReservationError::Aborted`].
	pub async fn run<'operation, Operation, Output>(
		&self,
		key: &RoomKey,
		mut operation: Operation,
	) -> Result<Output, ReservationError>
	where
		Output: Send,
		Operation: FnMut() -> BoxFuture<'operation, Result<Output, ReservationError>> + Send,
	{
		// At least one attempt is always made.
		let limit = self.maximum_attempts.max(1);
		for attempt in 1..=limit {
			match operation().await {
				Err(ReservationError::Aborted(_)) if attempt < limit => {
					warn!(attempt, %key, "Lost against a concurrent modification, retrying");
					tokio::time::sleep(self.backoff_after(attempt)).await;
				}
				Err(ReservationError::Aborted(_)) => {
					warn!(attempt, %key, "Lost against a concurrent modification, giving up");
				}
				result => return result,
			}
		}

		Err(ReservationError::AttemptsExhausted {
			key: key.clone(),
			limit,
		})
	}

	/// Waiting time after losing `attempt`, capped instead of overflowing.
	fn backoff_after(&self, attempt: u32) -> Duration {
		self.backoff.saturating_mul(attempt)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::room::key::{RoomId, Tenant};
	use futures_util::FutureExt;
	use std::sync::atomic::AtomicU32;
	use std::sync::atomic::Ordering::SeqCst;

	fn key() -> RoomKey {
		RoomKey::new(&Tenant::from("trivago"), RoomId::from(1))
	}

	fn policy(maximum_attempts: u32) -> RetryPolicy {
		RetryPolicy {
			maximum_attempts,
			backoff: Duration::ZERO,
		}
	}

	/// Operation that gets aborted `aborts` times before succeeding.
	async fn flaky(attempts: &AtomicU32, aborts: u32) -> Result<u32, ReservationError> {
		let attempt = attempts.fetch_add(1, SeqCst) + 1;
		if attempt <= aborts {
			Err(ReservationError::Aborted(key()))
		} else {
			Ok(attempt)
		}
	}

	#[tokio::test]
	async fn should_retry_aborted_operations() {
		let attempts = AtomicU32::new(0);

		let result = policy(5).run(&key(), || flaky(&attempts, 2).boxed()).await;

		assert_eq!(3, result.expect("Operation failed"));
		assert_eq!(3, attempts.load(SeqCst));
	}

	#[tokio::test]
	async fn should_give_up_after_maximum_attempts() {
		let attempts = AtomicU32::new(0);

		let result = policy(3).run(&key(), || flaky(&attempts, u32::MAX).boxed()).await;

		assert!(matches!(result, Err(ReservationError::AttemptsExhausted { limit: 3, .. })));
		assert_eq!(3, attempts.load(SeqCst));
	}

	#[tokio::test]
	async fn should_not_retry_other_errors() {
		let attempts = AtomicU32::new(0);

		let result = policy(5)
			.run(&key(), || {
				attempts.fetch_add(1, SeqCst);
				async { Err::<(), _>(ReservationError::AlreadyBooked(key())) }.boxed()
			})
			.await;

		assert!(matches!(result, Err(ReservationError::AlreadyBooked(_))));
		assert_eq!(1, attempts.load(SeqCst));
	}

	#[tokio::test]
	async fn zero_attempts_still_tries_once() {
		let attempts = AtomicU32::new(0);

		let result = policy(0).run(&key(), || flaky(&attempts, 0).boxed()).await;

		assert_eq!(1, result.expect("Operation failed"));
	}

	#[test]
	fn backoff_should_grow_linearly() {
		let policy = RetryPolicy {
			maximum_attempts: 5,
			backoff: Duration::from_millis(10),
		};

		assert_eq!(Duration::from_millis(10), policy.backoff_after(1));
		assert_eq!(Duration::from_millis(30), policy.backoff_after(3));
	}

	#[test]
	fn huge_backoff_should_saturate() {
		let policy = RetryPolicy {
			maximum_attempts: 5,
			backoff: Duration::MAX / 2,
		};

		assert_eq!(Duration::MAX, policy.backoff_after(4));
	}

	#[test]
	fn should_deserialize_humantime_backoff() {
		let policy = toml::from_str::<RetryPolicy>(r#"backoff = "50ms""#).expect("Failed to deserialize");

		assert_eq!(
			RetryPolicy {
				maximum_attempts: 5,
				backoff: Duration::from_millis(50),
			},
			policy
		);
	}
}
