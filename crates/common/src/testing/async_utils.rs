//! Async test helpers

use std::time::Duration;

/// Poll `condition` until it holds or `timeout` passes
///
/// Uses tokio time, so under `start_paused` the wait is virtual. Useful for
/// side effects of spawned tasks, such as activity-triggered session checks.
///
/// # Examples
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use std::time::Duration;
///
/// use webgate_common::testing::wait_until;
///
/// assert!(wait_until(Duration::from_millis(10), || true).await);
/// # }
/// ```
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_wait_until_sees_spawned_effect() {
        let flag = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&flag);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            setter.store(true, Ordering::SeqCst);
        });

        assert!(wait_until(Duration::from_secs(1), || flag.load(Ordering::SeqCst)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_times_out() {
        assert!(!wait_until(Duration::from_secs(5), || false).await);
    }
}
