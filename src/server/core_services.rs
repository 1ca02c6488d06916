use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::store::RegistryStore;
use crate::push::PushRelay;
use crate::server::command_dispatcher::CommandDispatcher;
use crate::server::identity::IdentityResolver;

/// Explicit composition root: every collaborator is constructed and wired
/// here by direct construction, no runtime discovery. Built once at
/// startup and shared across request handlers.
#[derive(Clone)]
pub struct CoreServices {
    pub config: Arc<ServerConfig>,
    pub store: Arc<RegistryStore>,
    pub dispatcher: CommandDispatcher,
}

impl CoreServices {
    pub fn new(config: ServerConfig, relay: Arc<dyn PushRelay>) -> Self {
        let store = Arc::new(RegistryStore::new());
        Self::with_store(config, store, relay)
    }

    pub fn with_store(
        config: ServerConfig,
        store: Arc<RegistryStore>,
        relay: Arc<dyn PushRelay>,
    ) -> Self {
        let resolver = IdentityResolver::new(store.clone());
        let dispatcher = CommandDispatcher::new(resolver, relay);
        CoreServices {
            config: Arc::new(config),
            store,
            dispatcher,
        }
    }
}
