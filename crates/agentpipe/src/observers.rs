//! Observer registration and dispatch
//!
//! Observers are grouped into layers, one per type in a specialization
//! chain. Dispatch walks the chain root-first, so a specialized agent's
//! observers run in addition to, and after, those of the type it was derived
//! from. Registries are built up front and read-only at dispatch time, which
//! keeps dispatch order deterministic.

use crate::error::Result;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Shared observer callable
///
/// Observers receive the raw decoded event, not just the fields the
/// accumulator folds, so they can inspect frame kinds the response ignores.
pub type ObserverFn = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// A registered observer entry
///
/// Both forms carry a callable and are resolved uniformly at dispatch; the
/// name on the first form only feeds diagnostics.
#[derive(Clone)]
pub enum Observer {
    /// Callback registered under a diagnostic name
    Named {
        /// Label used in trace output
        name: String,
        /// The callback itself
        handler: ObserverFn,
    },

    /// Anonymous inline callback
    Closure(ObserverFn),
}

impl Observer {
    fn handler(&self) -> &ObserverFn {
        match self {
            Self::Named { handler, .. } => handler,
            Self::Closure(handler) => handler,
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Named { name, .. } => name,
            Self::Closure(_) => "<closure>",
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observer").field(&self.label()).finish()
    }
}

#[derive(Clone, Debug)]
struct Layer {
    type_name: String,
    observers: Vec<Observer>,
}

impl Layer {
    fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            observers: Vec::new(),
        }
    }
}

/// Ordered observer registry for one type and everything it inherits from
///
/// [`CallbackRegistry::specialize`] clones the chain and appends a fresh
/// layer, so base layers always dispatch first and later specialization
/// never mutates the registry it derived from.
#[derive(Clone, Debug, Default)]
pub struct CallbackRegistry {
    layers: Vec<Layer>,
}

impl CallbackRegistry {
    /// Create an empty registry rooted at a generic agent layer
    pub fn new() -> Self {
        Self::for_type("agent")
    }

    /// Create an empty registry rooted at the given type name
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            layers: vec![Layer::new(type_name)],
        }
    }

    /// Append a named observer to the most-derived layer
    pub fn on_named<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        self.push(Observer::Named {
            name: name.into(),
            handler: Arc::new(handler),
        });
        self
    }

    /// Append an anonymous observer to the most-derived layer
    pub fn on<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        self.push(Observer::Closure(Arc::new(handler)));
        self
    }

    /// Derive a more specialized registry
    ///
    /// The new layer's observers run after everything inherited from this
    /// registry. `self` is left untouched.
    pub fn specialize(&self, type_name: impl Into<String>) -> Self {
        let mut layers = self.layers.clone();
        layers.push(Layer::new(type_name));
        Self { layers }
    }

    /// Invoke every observer with the raw decoded event, root layer first
    ///
    /// Observers run synchronously in registration order; an observer error
    /// propagates to the caller and skips the remaining observers.
    pub fn dispatch(&self, raw: &Value) -> Result<()> {
        for layer in &self.layers {
            for observer in &layer.observers {
                tracing::trace!(
                    layer = %layer.type_name,
                    observer = %observer.label(),
                    "dispatching event"
                );
                (observer.handler())(raw)?;
            }
        }
        Ok(())
    }

    /// Total number of registered observers across all layers
    pub fn len(&self) -> usize {
        self.layers.iter().map(|l| l.observers.len()).sum()
    }

    /// Whether no observers are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, observer: Observer) {
        if self.layers.is_empty() {
            self.layers.push(Layer::new("agent"));
        }
        if let Some(layer) = self.layers.last_mut() {
            layer.observers.push(observer);
        }
    }
}
