pub mod graphql;
pub mod routes;

use std::sync::Arc;

use civicsignal_core::lifecycle::LifecycleEngine;
use civicsignal_core::notify::Dispatcher;
use civicsignal_core::store::NotificationStore;

/// Shared dependencies handed to the GraphQL layer.
pub struct ApiDeps {
    pub engine: Arc<LifecycleEngine>,
    pub dispatcher: Arc<Dispatcher>,
    pub notifications: Arc<dyn NotificationStore>,
}
