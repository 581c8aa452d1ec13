/// The running bridge
///
/// Consumes requests from the UI, spawns one task per backend-bound
/// request, and funnels every response (including the ones produced by the
/// session listener) onto a single outbound channel.

use crate::backend::Backend;
use crate::bridge::dispatch::{dispatch, session_outcome};
use crate::bridge::notifier::Notifier;
use crate::bridge::protocol::{Request, Response};
use crate::core::SessionChange;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Relay between UI requests and the backend
///
/// Holds no per-request state; the backend handle and notifier are shared
/// by every request.
pub struct Bridge {
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    responses: mpsc::UnboundedSender<Response>,
}

impl Bridge {
    /// Create a bridge and the receiver its responses are delivered on
    pub fn new(
        backend: Arc<dyn Backend>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, mpsc::UnboundedReceiver<Response>) {
        let (responses, rx) = mpsc::unbounded_channel();
        (
            Self {
                backend,
                notifier,
                responses,
            },
            rx,
        )
    }

    /// Handle one request
    ///
    /// `showMessage` is presented before this returns. Every other request
    /// runs in its own task and emits exactly one response when done; the
    /// task handle is returned so callers can wait for it.
    pub fn handle(&self, request: Request) -> Option<JoinHandle<()>> {
        self.present_or_defer(request).map(tokio::spawn)
    }

    /// Present `showMessage` inline, or build the task for a backend call
    ///
    /// This is the only place `showMessage` is presented.
    fn present_or_defer(&self, request: Request) -> Option<impl Future<Output = ()> + Send + 'static> {
        if let Request::ShowMessage { text } = &request {
            self.notifier.alert(text);
            return None;
        }

        let backend = self.backend.clone();
        let responses = self.responses.clone();

        Some(async move {
            let port = request.port();
            if let Some(response) = dispatch(request, backend.as_ref()).await {
                debug!("{} -> {}", port, response.port());
                if responses.send(response).is_err() {
                    warn!("UI channel closed, dropping {} response", port);
                }
            }
        })
    }

    /// Start relaying backend session changes for the lifetime of the bridge
    ///
    /// Subscribes before returning, so no change published after this call
    /// is missed.
    pub fn start_session_listener(&self) -> JoinHandle<()> {
        let mut rx = self.backend.subscribe_session();
        let responses = self.responses.clone();

        tokio::spawn(async move {
            info!("Starting session listener");

            loop {
                match rx.recv().await {
                    Ok(change) => {
                        if !forward_session_change(&change, &responses) {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Session listener lagged, skipped {} change(s)", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            info!("Session listener stopped");
        })
    }

    /// Relay requests until the inbound channel closes
    ///
    /// In-flight requests are allowed to finish and emit their responses
    /// before this returns.
    pub async fn run(self, mut requests: mpsc::Receiver<Request>) {
        let listener = self.start_session_listener();
        let mut in_flight = JoinSet::new();

        info!("Bridge running");

        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => {
                        debug!("Received {}", request.port());
                        if let Some(task) = self.present_or_defer(request) {
                            in_flight.spawn(task);
                        }
                    }
                    None => break,
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!("Request task failed: {}", e);
                    }
                }
            }
        }

        debug!("Inbound closed, waiting for {} request(s)", in_flight.len());
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!("Request task failed: {}", e);
            }
        }

        listener.abort();
        info!("Bridge stopped");
    }
}

/// Emit the response for a session change, if any
///
/// Returns false once the UI side has gone away.
fn forward_session_change(
    change: &SessionChange,
    responses: &mpsc::UnboundedSender<Response>,
) -> bool {
    match session_outcome(change) {
        Some(response) => {
            debug!("Session change -> {}", response.port());
            responses.send(response).is_ok()
        }
        None => {
            debug!("Session change without user, nothing to emit");
            true
        }
    }
}
