//! Handler identifier resolution.
//!
//! # Responsibilities
//! - Define the resolver capability used when building the route table
//! - Provide an in-memory registry keyed by normalized identifiers
//!
//! # Design Decisions
//! - Identifiers are normalized so `./action/get.js`, `action\get.js` and
//!   `action/get` all name the same action
//! - Registration happens before startup; lookups never mutate

use std::collections::HashMap;
use std::sync::Arc;

use crate::action::Action;

/// Resolves a handler identifier from configuration to a callable action.
pub trait ActionResolver: Send + Sync {
    fn resolve(&self, identifier: &str) -> Option<Arc<dyn Action>>;
}

/// Normalize a handler identifier.
///
/// Strips leading `./`, converts backslashes to `/` and drops the extension
/// of the final segment.
pub fn normalize_identifier(identifier: &str) -> String {
    let mut id = identifier.trim().replace('\\', "/");
    while let Some(rest) = id.strip_prefix("./") {
        id = rest.to_string();
    }
    let start = id.rfind('/').map_or(0, |i| i + 1);
    if let Some(dot) = id[start..].rfind('.') {
        if dot > 0 {
            id.truncate(start + dot);
        }
    }
    id
}

/// In-memory action registry.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under `identifier`, replacing any previous one.
    pub fn register<A: Action>(&mut self, identifier: &str, action: A) -> &mut Self {
        self.register_shared(identifier, Arc::new(action))
    }

    /// Register an already shared action.
    pub fn register_shared(&mut self, identifier: &str, action: Arc<dyn Action>) -> &mut Self {
        let key = normalize_identifier(identifier);
        if self.actions.insert(key.clone(), action).is_some() {
            tracing::warn!(identifier = %key, "Action replaced in registry");
        }
        self
    }

    /// Builder-style registration.
    pub fn with<A: Action>(mut self, identifier: &str, action: A) -> Self {
        self.register(identifier, action);
        self
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.actions.contains_key(&normalize_identifier(identifier))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl ActionResolver for ActionRegistry {
    fn resolve(&self, identifier: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(&normalize_identifier(identifier)).cloned()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.actions.keys().collect();
        keys.sort();
        f.debug_struct("ActionRegistry").field("actions", &keys).finish()
    }
}
