use std::sync::Arc;

use smbridge_auth::{AuthenticationBridge, Settings};
use smbridge_infra::{InMemoryAccountDirectory, InMemorySessionStore};

/// Shared, cloneable handles for request handlers.
#[derive(Clone)]
pub struct AppServices {
    pub settings: Arc<Settings>,
    pub directory: Arc<InMemoryAccountDirectory>,
    pub sessions: Arc<InMemorySessionStore>,
    pub bridge: Arc<AuthenticationBridge>,
}

pub fn build_services(settings: Settings) -> AppServices {
    build_services_with(settings, Arc::new(InMemoryAccountDirectory::new()))
}

pub fn build_services_with(
    settings: Settings,
    directory: Arc<InMemoryAccountDirectory>,
) -> AppServices {
    let settings = Arc::new(settings);
    let bridge = AuthenticationBridge::new(settings.clone(), directory.clone(), directory.clone());

    AppServices {
        settings,
        directory,
        sessions: Arc::new(InMemorySessionStore::new()),
        bridge: Arc::new(bridge),
    }
}
