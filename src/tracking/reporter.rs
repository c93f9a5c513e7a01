//! # Location Reporter Actor
//!
//! Owns everything about the delivery person's outgoing location stream:
//! whether tracking is on and for which order, the upload throttle, and the
//! listeners that want every sample (the map on the delivery screen).
//!
//! The platform sampler pushes samples through [`LocationReporterClient::sample`].
//! While tracking, every sample is handed to the listeners and at most one
//! per [`MIN_UPLOAD_INTERVAL`](super::MIN_UPLOAD_INTERVAL) is uploaded. An
//! upload failure is logged and forgotten; the next sample goes through the
//! same path as if nothing happened.

use crate::clients::DeliveryClient;
use crate::model::{DeliveryLocation, OrderId};
use crate::tracking::{ListenerRegistry, SamplingProfile, Subscription, UploadThrottle};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ReporterError {
    #[error("Location reporter closed")]
    ActorClosed,
    #[error("Location reporter dropped response channel")]
    ActorDropped,
}

#[derive(Debug)]
pub enum ReporterRequest {
    Start {
        order_id: OrderId,
        respond_to: oneshot::Sender<SamplingProfile>,
    },
    Stop {
        respond_to: oneshot::Sender<Option<OrderId>>,
    },
    Sample {
        location: DeliveryLocation,
    },
    Status {
        respond_to: oneshot::Sender<Option<OrderId>>,
    },
}

pub struct LocationReporter {
    receiver: mpsc::Receiver<ReporterRequest>,
    delivery: DeliveryClient,
    throttle: UploadThrottle,
    listeners: ListenerRegistry<DeliveryLocation>,
    tracking: Option<OrderId>,
}

impl LocationReporter {
    pub fn new(
        buffer_size: usize,
        delivery: DeliveryClient,
        throttle: UploadThrottle,
    ) -> (Self, LocationReporterClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let listeners = ListenerRegistry::new();
        let actor = Self {
            receiver,
            delivery,
            throttle,
            listeners: listeners.clone(),
            tracking: None,
        };
        (actor, LocationReporterClient { sender, listeners })
    }

    pub async fn run(mut self) {
        info!("Location reporter started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ReporterRequest::Start {
                    order_id,
                    respond_to,
                } => {
                    info!(%order_id, "Tracking started");
                    self.tracking = Some(order_id);
                    let _ = respond_to.send(SamplingProfile::BALANCED);
                }
                ReporterRequest::Stop { respond_to } => {
                    let previous = self.tracking.take();
                    if let Some(order_id) = &previous {
                        info!(%order_id, "Tracking stopped");
                    }
                    let _ = respond_to.send(previous);
                }
                ReporterRequest::Sample { location } => {
                    self.on_sample(location).await;
                }
                ReporterRequest::Status { respond_to } => {
                    let _ = respond_to.send(self.tracking.clone());
                }
            }
        }

        info!("Location reporter shutdown");
    }

    async fn on_sample(&mut self, location: DeliveryLocation) {
        let Some(order_id) = self.tracking.clone() else {
            debug!("Sample while not tracking, dropped");
            return;
        };

        self.listeners.notify(&location);

        if !self.throttle.try_acquire(Instant::now()) {
            debug!(%order_id, "Upload throttled");
            return;
        }
        match self.delivery.report_location(&order_id, &location).await {
            Ok(()) => debug!(%order_id, lat = location.latitude, lng = location.longitude, "Location uploaded"),
            Err(e) => warn!(%order_id, error = %e, "Location upload failed"),
        }
    }
}

/// Handle used by the platform sampler and the delivery screens.
#[derive(Clone)]
pub struct LocationReporterClient {
    sender: mpsc::Sender<ReporterRequest>,
    listeners: ListenerRegistry<DeliveryLocation>,
}

impl LocationReporterClient {
    /// Starts tracking for `order_id` and returns the sampler settings.
    pub async fn start(&self, order_id: OrderId) -> Result<SamplingProfile, ReporterError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ReporterRequest::Start {
                order_id,
                respond_to,
            })
            .await
            .map_err(|_| ReporterError::ActorClosed)?;
        response.await.map_err(|_| ReporterError::ActorDropped)
    }

    /// Stops tracking. Returns the order that was being tracked, if any.
    pub async fn stop(&self) -> Result<Option<OrderId>, ReporterError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ReporterRequest::Stop { respond_to })
            .await
            .map_err(|_| ReporterError::ActorClosed)?;
        response.await.map_err(|_| ReporterError::ActorDropped)
    }

    pub async fn tracking(&self) -> Result<Option<OrderId>, ReporterError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ReporterRequest::Status { respond_to })
            .await
            .map_err(|_| ReporterError::ActorClosed)?;
        response.await.map_err(|_| ReporterError::ActorDropped)
    }

    /// Feeds one platform sample. Does not wait for the upload.
    pub async fn sample(&self, location: DeliveryLocation) -> Result<(), ReporterError> {
        self.sender
            .send(ReporterRequest::Sample { location })
            .await
            .map_err(|_| ReporterError::ActorClosed)
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&DeliveryLocation) + Send + Sync + 'static,
    ) -> Subscription<DeliveryLocation> {
        self.listeners.subscribe(listener)
    }
}
