//! Module name resolution with default substitution.

use crate::config::{Configuration, ModuleConfig, ModuleNotFound, ModuleStore};

/// A module picked for a scrape.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedModule<'a> {
    /// Name the module was found under, after default substitution.
    pub name: &'a str,
    pub config: &'a ModuleConfig,
}

/// Resolves requested module names, substituting the default when none is given.
#[derive(Debug, Clone, Copy)]
pub struct ModuleResolver<'a> {
    store: &'a ModuleStore,
    default_module: &'a str,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(store: &'a ModuleStore, default_module: &'a str) -> Self {
        Self {
            store,
            default_module,
        }
    }

    /// Resolve `requested`, or the default module when it is absent or empty.
    ///
    /// A missing module is an error even for the default name.
    pub fn resolve_or_default(
        &self,
        requested: Option<&str>,
    ) -> Result<ResolvedModule<'a>, ModuleNotFound> {
        let name = match requested {
            Some(name) if !name.is_empty() => name,
            _ => self.default_module,
        };

        let (name, config) = self.store.resolve(name)?;
        Ok(ResolvedModule { name, config })
    }
}

impl Configuration {
    pub fn resolver(&self) -> ModuleResolver<'_> {
        ModuleResolver::new(&self.modules, &self.settings.default_module)
    }
}
