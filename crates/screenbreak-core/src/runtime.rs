//! Async service that owns a [`BreakCoordinator`].
//!
//! Requests and alarm polling share one task, so handlers never interleave.
//! Callers talk to it through a cloneable [`CoordinatorHandle`]; each request
//! carries a oneshot sender that the service answers exactly once.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::coordinator::BreakCoordinator;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::protocol::{Request, Response};

const REQUEST_QUEUE: usize = 32;

type Command = (Request, oneshot::Sender<Response>);

#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
}

impl CoordinatorHandle {
    /// Send a request and wait for its response.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| CoreError::Custom("coordinator is not running".into()))?;
        reply_rx
            .await
            .map_err(|_| CoreError::Custom("coordinator dropped the request".into()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

pub struct CoordinatorService {
    coordinator: BreakCoordinator,
    requests: mpsc::Receiver<Command>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl CoordinatorService {
    pub fn new(
        coordinator: BreakCoordinator,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> (Self, CoordinatorHandle) {
        let (tx, requests) = mpsc::channel(REQUEST_QUEUE);
        let handle = CoordinatorHandle {
            tx,
            events: coordinator.event_sender(),
        };
        let service = Self {
            coordinator,
            requests,
            poll_interval,
            cancel,
        };
        (service, handle)
    }

    /// Spawn the service on the current runtime. The task yields the
    /// coordinator back once cancelled or once every handle is dropped.
    pub fn spawn(
        coordinator: BreakCoordinator,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> (CoordinatorHandle, JoinHandle<BreakCoordinator>) {
        let (service, handle) = Self::new(coordinator, poll_interval, cancel);
        (handle, tokio::spawn(service.run()))
    }

    pub async fn run(mut self) -> BreakCoordinator {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("coordinator shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.coordinator.fire_due_alarms() {
                        tracing::warn!(error = %e, "alarm poll failed");
                    }
                }
                command = self.requests.recv() => {
                    let Some((request, reply)) = command else {
                        tracing::debug!("all handles dropped");
                        break;
                    };
                    tracing::debug!(?request, "request");
                    let response = self.coordinator.handle(request);
                    if reply.send(response).is_err() {
                        tracing::debug!("requester went away before the response");
                    }
                }
            }
        }
        self.coordinator
    }
}
