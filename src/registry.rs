//! Command registry and the capability adapter that fills it.

use crate::command::{Command, Entry};
use crate::descriptor::{normalize_usage, Descriptor};
use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::lang::Alt;
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Immutable name → [`Descriptor`] map.
///
/// Built once by [`Registry::build`]; lookups never lock.
#[derive(Debug, Default)]
pub struct Registry {
    by_name: BTreeMap<String, Descriptor>,
}

impl Registry {
    /// Adapt every entry and build the registry.
    ///
    /// Raw commands are probed for each optional capability; prebuilt
    /// descriptors are inserted as they are. Registry back-references are
    /// injected once every entry is in place.
    pub fn build<I>(entries: I) -> Result<Arc<Registry>>
    where
        I: IntoIterator<Item = Entry>,
    {
        let mut by_name = BTreeMap::new();
        for entry in entries {
            let desc = match entry {
                Entry::Raw(cmd) => adapt(cmd),
                Entry::Prebuilt(desc) => desc,
            };
            if by_name.contains_key(&desc.name) {
                return Err(Error::Duplicate(desc.name));
            }
            debug!("registered {} ({})", desc.name, desc.kind);
            by_name.insert(desc.name.clone(), desc);
        }
        let injectors: Vec<_> = by_name.values().filter_map(|d| d.inject.clone()).collect();
        Ok(Arc::new_cyclic(|weak| {
            for inject in injectors {
                inject(weak.clone());
            }
            Registry { by_name }
        }))
    }

    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Sorted names of interactive commands starting with `prefix`.
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        self.by_name
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .filter(|(_, desc)| desc.kind.is_interactive())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Every registered name, sorted.
    pub fn names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    /// Descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.by_name.values()
    }

    /// Re-export every descriptor for composing into another registry.
    pub fn entries(&self) -> Vec<Entry> {
        self.iter().cloned().map(Entry::Prebuilt).collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Build a descriptor from a command, probing each optional capability.
fn adapt(cmd: Arc<dyn Command>) -> Descriptor {
    let mut desc = {
        let cmd = Arc::clone(&cmd);
        Descriptor::new(cmd.name().to_string(), move |ctx, args| cmd.main(ctx, args))
    };
    desc.kind = cmd.kinder().map_or(Kind::empty(), |k| k.kind());
    desc.usage = normalize_usage(cmd.usage().to_string());
    desc.apropos = cmd.apropos();
    desc.man = cmd.manner().map_or_else(Alt::default, |m| m.man());
    if cmd.registry_aware().is_some() {
        let cmd = Arc::clone(&cmd);
        desc.inject = Some(Arc::new(move |registry: Weak<Registry>| {
            if let Some(aware) = cmd.registry_aware() {
                aware.set_registry(registry);
            }
        }));
    }
    if cmd.closer().is_some() {
        let cmd = Arc::clone(&cmd);
        desc = desc.on_close(move || cmd.closer().map_or(Ok(()), |c| c.close()));
    }
    if cmd.completer().is_some() {
        let cmd = Arc::clone(&cmd);
        desc = desc.on_complete(move |args| {
            cmd.completer().map_or_else(Vec::new, |c| c.complete(args))
        });
    }
    if cmd.helper().is_some() {
        let cmd = Arc::clone(&cmd);
        desc = desc.on_help(move |args| cmd.helper().map_or_else(String::new, |h| h.help(args)));
    }
    desc
}

/// Storage for an injected registry back-reference.
///
/// Commands implementing [`crate::RegistryAware`] usually keep one of these.
/// The reference is weak, so it never keeps the registry alive, and it is
/// replaced when the command is re-exported into another registry.
#[derive(Debug, Default)]
pub struct RegistryRef(RwLock<Weak<Registry>>);

impl RegistryRef {
    pub fn set(&self, registry: Weak<Registry>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = registry;
    }

    pub fn get(&self) -> Option<Arc<Registry>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).upgrade()
    }
}
