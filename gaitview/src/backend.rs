//! Background thread that owns the HTTP client for its lifetime.
//!
//! Every backend call blocks, so none of them run on the UI loop. Requests
//! arrive over a crossbeam channel and each reply goes back to the main loop
//! as `AppEvent::Backend`.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use gaitview_core::api::{GitApi, HttpTransport, Transport};
use gaitview_core::engine::{execute, BackendRequest};
use tokio::sync::mpsc::UnboundedSender;

use crate::event::AppEvent;

const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Starts the worker thread and returns the request sender. Dropping the
/// sender ends the thread once the queue drains.
pub fn spawn_backend_worker(
    server: &str,
    event_tx: UnboundedSender<AppEvent>,
) -> anyhow::Result<Sender<BackendRequest>> {
    let transport = HttpTransport::new(server, READ_TIMEOUT)?;
    let (tx, rx) = unbounded();
    std::thread::Builder::new()
        .name("gaitview-backend".into())
        .spawn(move || backend_worker_loop(GitApi::new(transport), rx, event_tx))?;
    Ok(tx)
}

/// Runs requests in arrival order until the channel closes.
pub fn backend_worker_loop<T: Transport>(
    api: GitApi<T>,
    rx: Receiver<BackendRequest>,
    event_tx: UnboundedSender<AppEvent>,
) {
    for request in rx {
        tracing::trace!(?request, "backend request");
        let reply = execute(&api, request);
        if event_tx.send(AppEvent::Backend(Box::new(reply))).is_err() {
            break;
        }
    }
    tracing::debug!("backend worker stopped");
}

/// Queues `requests` for the worker. Returns false once the worker is gone.
pub fn dispatch(tx: &Sender<BackendRequest>, requests: Vec<BackendRequest>) -> bool {
    for request in requests {
        if tx.send(request).is_err() {
            tracing::error!("backend worker is gone; request dropped");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaitview_core::api::{Endpoint, Method};
    use gaitview_core::engine::BackendReply;
    use gaitview_core::error::BackendError;
    use serde_json::Value;

    struct Offline;

    impl Transport for Offline {
        fn get(&self, _endpoint: &Endpoint) -> Result<String, BackendError> {
            Err(BackendError::Transport("connection refused".into()))
        }

        fn send(&self, _method: Method, _endpoint: &Endpoint, _body: &Value) -> Result<String, BackendError> {
            Err(BackendError::Transport("connection refused".into()))
        }
    }

    #[test]
    fn bad_server_address_fails_before_any_thread_starts() {
        let (event_tx, _event_rx) = tokio::sync::mpsc::unbounded_channel();
        let err = spawn_backend_worker("not a url", event_tx).unwrap_err();
        assert!(err.downcast_ref::<BackendError>().is_some());
    }

    #[test]
    fn worker_answers_every_request_then_stops() {
        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
        let (tx, rx) = unbounded();
        assert!(dispatch(&tx, vec![BackendRequest::Dashboard, BackendRequest::Patterns]));
        drop(tx);

        backend_worker_loop(GitApi::new(Offline), rx, event_tx);

        let mut replies = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            match event {
                AppEvent::Backend(reply) => replies.push(*reply),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(matches!(replies[0], BackendReply::Dashboard(Err(_))));
        assert!(matches!(replies[1], BackendReply::Patterns(Err(_))));
        assert_eq!(replies.len(), 2);
    }

    #[test]
    fn dispatch_reports_a_closed_worker() {
        let (tx, rx) = unbounded();
        drop(rx);
        assert!(!dispatch(&tx, vec![BackendRequest::Dashboard]));
    }
}
