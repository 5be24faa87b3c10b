use super::registry::{Registry, STATE_INJECTOR};
use crate::config::ResourceConfig;
use crate::core::{InitiatorId, PathPrefix, Result};
use crate::engine::{Invalidator, Resource, ResourceEngine};
use log::debug;
use std::fmt;
use std::sync::{Arc, Mutex};

struct ProviderShared<S> {
    config: ResourceConfig<S>,
    prefix: PathPrefix,
    engine: Mutex<Option<ResourceEngine<S>>>,
}

impl<S: Send + Sync + 'static> ProviderShared<S> {
    /// The engine of this provider, bound on first use
    fn engine(&self, registry: &Registry) -> Result<ResourceEngine<S>> {
        let mut engine = self.engine.lock()?;
        if let Some(engine) = engine.as_ref() {
            return Ok(engine.clone());
        }

        let store = registry.get_injector::<S>(STATE_INJECTOR)?;
        let bound = ResourceEngine::with_prefix(self.config.clone(), store, self.prefix)?;
        debug!("Provider bound to store under {}", self.prefix);
        *engine = Some(bound.clone());
        Ok(bound)
    }
}

/// Widget-style resource provider. Every instance shares one partition and
/// one set of bound processes; the store is resolved from the `"state"`
/// injector on first render.
pub struct ResourceProvider<S> {
    shared: Arc<ProviderShared<S>>,
}

impl<S> Clone for ResourceProvider<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> fmt::Debug for ResourceProvider<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceProvider")
            .field("prefix", &self.shared.prefix)
            .finish_non_exhaustive()
    }
}

pub fn provider<S: Send + Sync + 'static>(config: ResourceConfig<S>) -> Result<ResourceProvider<S>> {
    config.validate()?;
    Ok(ResourceProvider {
        shared: Arc::new(ProviderShared {
            config,
            prefix: PathPrefix::generate(),
            engine: Mutex::new(None),
        }),
    })
}

impl<S: Send + Sync + 'static> ResourceProvider<S> {
    pub fn path_prefix(&self) -> PathPrefix {
        self.shared.prefix
    }

    /// New provider instance with its own stable initiator id
    pub fn create_instance(&self, invalidator: Option<Invalidator>) -> ProviderInstance<S> {
        ProviderInstance {
            shared: Arc::clone(&self.shared),
            initiator: InitiatorId::generate(),
            invalidator,
            resource: None,
        }
    }
}

pub struct ProviderInstance<S> {
    shared: Arc<ProviderShared<S>>,
    initiator: InitiatorId,
    invalidator: Option<Invalidator>,
    resource: Option<Resource<S>>,
}

impl<S> fmt::Debug for ProviderInstance<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderInstance")
            .field("prefix", &self.shared.prefix)
            .field("initiator", &self.initiator)
            .field("bound", &self.resource.is_some())
            .finish()
    }
}

impl<S: Send + Sync + 'static> ProviderInstance<S> {
    pub fn initiator(&self) -> &InitiatorId {
        &self.initiator
    }

    /// Hand this instance's resource to `renderer`
    pub fn render<R>(&mut self, registry: &Registry, renderer: impl FnOnce(&Resource<S>) -> R) -> Result<R> {
        let resource = match self.resource.take() {
            Some(resource) => resource,
            None => self
                .shared
                .engine(registry)?
                .resource(self.initiator.clone(), self.invalidator.clone()),
        };
        let rendered = renderer(&resource);
        self.resource = Some(resource);
        Ok(rendered)
    }

    /// Wait for every read of the provider's engine
    pub async fn settle(&self) -> Result<()> {
        match &self.resource {
            Some(resource) => resource.settle().await,
            None => Ok(()),
        }
    }

    /// Remove every subscription made on behalf of this instance
    pub fn destroy(&mut self) -> Result<()> {
        match self.resource.take() {
            Some(resource) => resource.teardown(),
            None => Ok(()),
        }
    }
}
