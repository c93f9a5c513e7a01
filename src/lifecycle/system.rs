use crate::api::{ApiError, SessionStore, SupabaseTransport, Transport};
use crate::clients::{AuthClient, DeliveryClient, OrderClient, QueryClient};
use crate::config::{Config, ConfigError};
use crate::framework::CacheActor;
use crate::notifications::NotificationRouter;
use crate::places::{Autocomplete, GooglePlaces, PlacesError};
use crate::polling::PollingRegistry;
use crate::tracking::{LocationReporter, LocationReporterClient, TrackingView, UploadThrottle};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

const CACHE_BUFFER: usize = 64;
const REPORTER_BUFFER: usize = 32;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Places(#[from] PlacesError),

    #[error("Actor task failed: {0}")]
    Task(String),
}

/// Owns the running actors and hands out the clients built on them.
///
/// # Architecture
///
/// - **Cache actor**: the query cache every client reads through
/// - **Location reporter**: throttled upload of the delivery person's position
///
/// Everything else (endpoint clients, pollers, the notification router) is a
/// cheap handle onto those two tasks.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let system = DeliverySystem::connect(&config)?;
///
/// let order = system.orders.get_order(&"order-123".into(), false).await?;
///
/// system.shutdown().await?;
/// ```
pub struct DeliverySystem {
    pub session: SessionStore,
    pub orders: OrderClient,
    pub delivery: DeliveryClient,
    pub auth: AuthClient,
    pub polling: PollingRegistry,
    pub notifications: NotificationRouter,
    pub tracking: TrackingView,
    pub reporter: LocationReporterClient,
    /// Present when a maps key is configured.
    pub places: Option<Arc<Autocomplete<GooglePlaces>>>,

    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl DeliverySystem {
    /// Builds the Supabase transport from `config` and starts the system.
    pub fn connect(config: &Config) -> Result<Self, SystemError> {
        let session = SessionStore::new();
        let transport = SupabaseTransport::new(
            &config.supabase_url,
            &config.supabase_anon_key,
            session.clone(),
        )?;
        Self::new(config, Arc::new(transport), session)
    }

    /// Starts the actors over any transport. Must be called inside a Tokio runtime.
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        session: SessionStore,
    ) -> Result<Self, SystemError> {
        let (cache_actor, cache) = CacheActor::new(CACHE_BUFFER);
        let cache_handle = tokio::spawn(cache_actor.run());

        let query = QueryClient::new(transport, cache.clone());
        let orders = OrderClient::new(query.clone());
        let delivery = DeliveryClient::new(query.clone());
        let auth = AuthClient::new(query, session.clone());

        let (reporter_actor, reporter) = LocationReporter::new(
            REPORTER_BUFFER,
            delivery.clone(),
            UploadThrottle::new(config.location_throttle),
        );
        let reporter_handle = tokio::spawn(reporter_actor.run());

        let places = match &config.google_maps_api_key {
            Some(key) => Some(Arc::new(Autocomplete::new(GooglePlaces::new(key.clone())?))),
            None => None,
        };

        info!(
            url = %config.supabase_url,
            places = places.is_some(),
            "Delivery system started"
        );

        Ok(Self {
            polling: PollingRegistry::new(orders.clone(), config.poll),
            notifications: NotificationRouter::new(cache, session.clone()),
            tracking: TrackingView::new(delivery.clone(), config.poll.tracking),
            session,
            orders,
            delivery,
            auth,
            reporter,
            places,
            // Reporter first: it holds a client onto the cache.
            handles: vec![reporter_handle, cache_handle],
        })
    }

    /// Drops every client and waits for the actors to drain.
    ///
    /// Watches handed out by [`PollingRegistry`] or [`TrackingView`] keep
    /// the cache alive; drop them before calling this.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down delivery system...");

        // Dropping the clients closes the actor channels; each actor then
        // leaves its loop.
        drop(self.reporter);
        drop(self.polling);
        drop(self.tracking);
        drop(self.notifications);
        drop(self.orders);
        drop(self.delivery);
        drop(self.auth);
        drop(self.places);
        drop(self.session);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(SystemError::Task(e.to_string()));
            }
        }

        info!("Delivery system shutdown complete.");
        Ok(())
    }
}
