use crate::config::ResourceConfig;
use crate::core::{InitiatorId, Result};
use crate::engine::{Invalidator, Resource, ResourceEngine};
use crate::store::Store;
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Data middleware: owns a private store and one engine over it.
///
/// Consumer handles live in the middleware, keyed by widget id, so the
/// subscriptions a widget makes while rendering outlive the render itself.
pub struct DataMiddleware<S> {
    engine: ResourceEngine<S>,
    consumers: Arc<Mutex<HashMap<InitiatorId, Arc<Resource<S>>>>>,
}

impl<S> Clone for DataMiddleware<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            consumers: Arc::clone(&self.consumers),
        }
    }
}

impl<S> fmt::Debug for DataMiddleware<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataMiddleware")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

pub fn create_data_middleware<S: Send + Sync + 'static>(config: ResourceConfig<S>) -> Result<DataMiddleware<S>> {
    Ok(DataMiddleware {
        engine: ResourceEngine::new(config, Store::new())?,
        consumers: Arc::new(Mutex::new(HashMap::new())),
    })
}

impl<S: Send + Sync + 'static> DataMiddleware<S> {
    /// Resource handle for the widget `id`.
    ///
    /// The first call for an id creates the handle with `invalidator`; later
    /// calls return that same handle until [`destroy`](Self::destroy).
    pub fn consumer(&self, id: impl Into<InitiatorId>, invalidator: Option<Invalidator>) -> Result<Arc<Resource<S>>> {
        let id = id.into();
        let mut consumers = self.consumers.lock()?;
        let resource = consumers
            .entry(id.clone())
            .or_insert_with(|| Arc::new(self.engine.resource(id, invalidator)));
        Ok(Arc::clone(resource))
    }

    /// Forget the widget `id` and remove every subscription made for it
    pub fn destroy(&self, id: impl Into<InitiatorId>) -> Result<()> {
        let id = id.into();
        let removed = self.consumers.lock()?.remove(&id);
        if let Some(resource) = removed {
            debug!("Destroying data consumer {}", id);
            resource.teardown()?;
        }
        Ok(())
    }

    pub fn consumer_count(&self) -> Result<usize> {
        Ok(self.consumers.lock()?.len())
    }

    pub fn engine(&self) -> &ResourceEngine<S> {
        &self.engine
    }

    pub fn store(&self) -> &Store<S> {
        self.engine.store()
    }

    pub async fn settle(&self) -> Result<()> {
        self.engine.settle().await
    }
}
