//! Process wide defaults
//!
//! Jobs without an explicit configuration fall back to the registry's
//! default configuration, and jobs without an explicit transport ask the
//! registry's transport factory. A job captures the registry it uses at
//! construction time, so tests can inject their own instance instead of
//! touching the global one.

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use berth_core::Configuration;

use crate::transport::TransportFactory;

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

/// Default configuration and transport factory
#[derive(Default)]
pub struct Registry {
    configuration: RwLock<Option<Arc<dyn Configuration>>>,
    transport_factory: RwLock<Option<Arc<dyn TransportFactory>>>,
}

impl Registry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Process wide registry used by jobs that were not given one
    pub fn global() -> Arc<Registry> {
        GLOBAL.get_or_init(|| Arc::new(Registry::new())).clone()
    }

    pub fn default_configuration(&self) -> Option<Arc<dyn Configuration>> {
        self.configuration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the default configuration, `None` clears it
    pub fn set_default_configuration(&self, configuration: Option<Arc<dyn Configuration>>) {
        *self
            .configuration
            .write()
            .unwrap_or_else(PoisonError::into_inner) = configuration;
    }

    pub fn transport_factory(&self) -> Option<Arc<dyn TransportFactory>> {
        self.transport_factory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_transport_factory(&self, factory: Option<Arc<dyn TransportFactory>>) {
        *self
            .transport_factory
            .write()
            .unwrap_or_else(PoisonError::into_inner) = factory;
    }

    /// Clears every default
    pub fn reset(&self) {
        self.set_default_configuration(None);
        self.set_transport_factory(None);
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("configuration", &self.default_configuration())
            .field("transport_factory", &self.transport_factory().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ReqwestTransportFactory;
    use berth_core::StaticConfiguration;

    #[test]
    fn test_default_configuration() {
        let registry = Registry::new();
        assert!(registry.default_configuration().is_none());

        let config: Arc<dyn Configuration> = Arc::new(StaticConfiguration::new("dockerd", 2376));
        registry.set_default_configuration(Some(config.clone()));

        let stored = registry.default_configuration().unwrap();
        assert!(Arc::ptr_eq(&stored, &config));
        assert_eq!(stored.host(), "dockerd");
    }

    #[test]
    fn test_reset() {
        let registry = Registry::new();
        registry.set_default_configuration(Some(Arc::new(StaticConfiguration::default())));
        registry.set_transport_factory(Some(Arc::new(ReqwestTransportFactory)));

        registry.reset();
        assert!(registry.default_configuration().is_none());
        assert!(registry.transport_factory().is_none());
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&Registry::global(), &Registry::global()));
    }
}
