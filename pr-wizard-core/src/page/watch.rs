// element watcher - wait for a selector to show up in a stream of page snapshots

use std::time::Duration;
use tokio::sync::watch;

use super::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Timeout,
    /// the snapshot source went away before a match
    SourceClosed,
}

/// exactly one of these is produced per watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Found(usize),
    Cancelled(CancelReason),
}

/// resolve once `selector` matches the latest snapshot, or cancel after `timeout`
pub async fn wait_for_element(
    mut snapshots: watch::Receiver<String>,
    selector: &str,
    timeout: Duration,
) -> WaitOutcome {
    let search = async {
        loop {
            let matches = {
                let html = snapshots.borrow_and_update();
                Page::parse(&html).select(selector).len()
            };
            if matches > 0 {
                return WaitOutcome::Found(matches);
            }
            if snapshots.changed().await.is_err() {
                return WaitOutcome::Cancelled(CancelReason::SourceClosed);
            }
        }
    };

    match tokio::time::timeout(timeout, search).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::debug!("gave up waiting for '{selector}' after {timeout:?}");
            WaitOutcome::Cancelled(CancelReason::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_found_in_initial_snapshot() {
        let (_tx, rx) = watch::channel("<div class='file'></div>".to_string());
        let outcome = wait_for_element(rx, ".file", Duration::from_millis(100)).await;
        assert_eq!(outcome, WaitOutcome::Found(1));
    }

    #[tokio::test]
    async fn test_found_after_update() {
        let (tx, rx) = watch::channel("<p>loading</p>".to_string());
        let waiter = tokio::spawn(async move {
            wait_for_element(rx, ".file", Duration::from_secs(5)).await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send("<div class='file'></div><div class='file'></div>".to_string())
            .unwrap();
        assert_eq!(waiter.await.unwrap(), WaitOutcome::Found(2));
    }

    #[tokio::test]
    async fn test_times_out() {
        let (_tx, rx) = watch::channel("<p>loading</p>".to_string());
        let outcome = wait_for_element(rx, ".file", Duration::from_millis(30)).await;
        assert_eq!(outcome, WaitOutcome::Cancelled(CancelReason::Timeout));
    }

    #[tokio::test]
    async fn test_source_closed() {
        let (tx, rx) = watch::channel("<p>loading</p>".to_string());
        drop(tx);
        let outcome = wait_for_element(rx, ".file", Duration::from_secs(5)).await;
        assert_eq!(outcome, WaitOutcome::Cancelled(CancelReason::SourceClosed));
    }
}
