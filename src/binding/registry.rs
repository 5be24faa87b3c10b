use crate::core::{ResourceError, Result};
use crate::store::Store;
use log::debug;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Injector name the provider resolves its store from
pub const STATE_INJECTOR: &str = "state";

/// Named injector table shared by the widgets of one application
#[derive(Clone, Default)]
pub struct Registry {
    injectors: Arc<RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the store behind `name`
    pub fn define_injector<S>(&self, name: &str, store: Store<S>) -> Result<()>
    where
        S: Send + Sync + 'static,
    {
        debug!("Defining injector '{}'", name);
        self.injectors
            .write()?
            .insert(name.to_string(), Arc::new(store));
        Ok(())
    }

    /// Look up the store behind `name`. An injector holding a store of a
    /// different entity type counts as missing.
    pub fn get_injector<S>(&self, name: &str) -> Result<Store<S>>
    where
        S: Send + Sync + 'static,
    {
        let injectors = self.injectors.read()?;
        injectors
            .get(name)
            .and_then(|injector| injector.downcast_ref::<Store<S>>())
            .cloned()
            .ok_or_else(|| ResourceError::MissingInjector(name.to_string()))
    }

    pub fn has_injector(&self, name: &str) -> Result<bool> {
        Ok(self.injectors.read()?.contains_key(name))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .injectors
            .read()
            .map(|injectors| injectors.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("Registry").field("injectors", &names).finish()
    }
}
