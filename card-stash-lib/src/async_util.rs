//! Driving a run while consuming its event channel.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// How long to keep draining events after the task has finished. Guards
/// against a sender clone that outlives the task.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Drive `task` to completion, calling `on_event` for every event it sends.
///
/// The task and the receiver are polled on the same task, so `on_event` runs
/// whenever the task yields. Events still queued when the task returns are
/// delivered before this function returns.
pub async fn run_with_events<F, E, R>(
    task: F,
    mut event_rx: mpsc::UnboundedReceiver<E>,
    mut on_event: impl FnMut(E),
) -> R
where
    F: Future<Output = R>,
{
    tokio::pin!(task);
    let mut received: u64 = 0;

    let result = loop {
        tokio::select! {
            r = &mut task => break Some(r),
            event = event_rx.recv() => match event {
                Some(e) => {
                    received += 1;
                    on_event(e);
                }
                None => break None,
            }
        }
    };

    let Some(result) = result else {
        log::debug!("Event channel closed after {} events; awaiting task", received);
        return task.await;
    };

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        match tokio::time::timeout_at(deadline, event_rx.recv()).await {
            Ok(Some(e)) => {
                received += 1;
                on_event(e);
            }
            Ok(None) => break,
            Err(_) => {
                log::warn!(
                    "Stopped draining events after {}s; a sender is still alive",
                    DRAIN_TIMEOUT.as_secs()
                );
                break;
            }
        }
    }
    log::debug!("Task finished, {} events handled", received);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_every_event_and_returns_result() {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = async move {
            for i in 0..3 {
                tx.send(i).unwrap();
                tokio::task::yield_now().await;
            }
            "done"
        };

        let mut seen = Vec::new();
        let result = run_with_events(task, rx, |e| seen.push(e)).await;
        assert_eq!(result, "done");
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
