use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Sender, unbounded};
use f2f_core::{ControlMessage, Marker};
use reqwest::blocking::Client;
use tracing::{debug, warn};

use super::Coordinator;

/// POSTs one control message and waits for the reply.
pub fn post_message(
    client: &Client,
    endpoint: &str,
    message: &ControlMessage,
) -> Result<(), reqwest::Error> {
    client
        .post(endpoint)
        .json(message)
        .send()?
        .error_for_status()?;
    Ok(())
}

/// Sends markers to the coordinator's HTTP control endpoint.
///
/// Requests are made on a worker thread so that `dispatch` never blocks the
/// UI loop. Failures are logged and dropped. Dropping the coordinator waits
/// for queued messages to go out.
pub struct HttpCoordinator {
    tx: Option<Sender<ControlMessage>>,
    worker: Option<JoinHandle<()>>,
}

impl HttpCoordinator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let endpoint = endpoint.into();
        let (tx, rx) = unbounded::<ControlMessage>();

        let worker = thread::Builder::new()
            .name("marker-dispatch".into())
            .spawn(move || {
                let client = match Client::builder().timeout(timeout).build() {
                    Ok(client) => client,
                    Err(e) => {
                        warn!("cannot build HTTP client, markers will be dropped: {e}");
                        return;
                    }
                };
                for message in rx {
                    match post_message(&client, &endpoint, &message) {
                        Ok(()) => debug!(?message, "delivered"),
                        Err(e) => warn!(?message, "marker delivery to {endpoint} failed: {e}"),
                    }
                }
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("cannot spawn marker worker: {e}");
                None
            }
        };

        Self {
            tx: Some(tx),
            worker,
        }
    }

    fn send(&self, message: ControlMessage) {
        if let Some(tx) = &self.tx {
            if tx.send(message).is_err() {
                warn!("marker worker has stopped; message dropped");
            }
        }
    }
}

impl Coordinator for HttpCoordinator {
    fn dispatch(&mut self, marker: Marker) {
        self.send(marker.into());
    }

    fn terminate(&mut self) {
        self.send(ControlMessage::Terminate);
    }
}

impl Drop for HttpCoordinator {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
