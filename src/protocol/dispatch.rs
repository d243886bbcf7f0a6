//! Handler registry.
//!
//! Routes are resolved most specific first: `(type, subtype)`, then `type`,
//! then the catch-all. Exactly one handler runs per message.

use std::collections::HashMap;

use super::Message;
use crate::error::Result;

/// Boxed message handler over a context `C`.
pub type Handler<C> = Box<dyn FnMut(&mut C, &Message) -> Result<()>>;

/// Registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// Type and subtype
    Exact(String, String),
    /// Type only
    Type(String),
    /// Anything not matched otherwise
    CatchAll,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Exact(t, s) => write!(f, ":{t}:{s}"),
            Route::Type(t) => write!(f, ":{t}"),
            Route::CatchAll => write!(f, "*"),
        }
    }
}

/// Explicit handler registry.
pub struct Dispatcher<C> {
    handlers: HashMap<Route, Handler<C>>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> Dispatcher<C> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for `:msg_type:subtype`. Replaces any previous one.
    /// A subtype that normalizes to nothing registers the type route.
    pub fn on<F>(&mut self, msg_type: &str, subtype: &str, handler: F) -> &mut Self
    where
        F: FnMut(&mut C, &Message) -> Result<()> + 'static,
    {
        let subtype = route_name(subtype);
        let route = if subtype.is_empty() {
            Route::Type(route_name(msg_type))
        } else {
            Route::Exact(route_name(msg_type), subtype)
        };
        self.insert(route, Box::new(handler))
    }

    /// Register a handler for every subtype of `:msg_type`
    pub fn on_type<F>(&mut self, msg_type: &str, handler: F) -> &mut Self
    where
        F: FnMut(&mut C, &Message) -> Result<()> + 'static,
    {
        self.insert(Route::Type(route_name(msg_type)), Box::new(handler))
    }

    /// Register the catch-all handler
    pub fn on_any<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&mut C, &Message) -> Result<()> + 'static,
    {
        self.insert(Route::CatchAll, Box::new(handler))
    }

    /// Register a boxed handler under an explicit route
    pub fn insert(&mut self, route: Route, handler: Handler<C>) -> &mut Self {
        self.handlers.insert(route, handler);
        self
    }

    /// Drop the handler for a route
    pub fn remove(&mut self, route: &Route) -> bool {
        self.handlers.remove(route).is_some()
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Find the route that would handle `message`
    pub fn resolve(&self, message: &Message) -> Option<Route> {
        let msg_type = message.msg_type().to_string();
        let mut candidates = Vec::with_capacity(3);
        if let Some(sub) = message.subtype() {
            candidates.push(Route::Exact(msg_type.clone(), sub.to_string()));
        }
        candidates.push(Route::Type(msg_type));
        candidates.push(Route::CatchAll);

        candidates
            .into_iter()
            .find(|route| self.handlers.contains_key(route))
    }

    /// Run the single best handler.
    ///
    /// Returns the route taken, or `None` when nothing is registered for the
    /// message. Handler errors are passed through.
    pub fn dispatch(&mut self, ctx: &mut C, message: &Message) -> Result<Option<Route>> {
        let Some(route) = self.resolve(message) else {
            return Ok(None);
        };
        tracing::debug!("Dispatching {} to {}", message.prefixes(), route);
        if let Some(handler) = self.handlers.get_mut(&route) {
            handler(ctx, message)?;
        }
        Ok(Some(route))
    }
}

fn route_name(name: &str) -> String {
    crate::codec::normalize_name(name.strip_prefix(':').unwrap_or(name))
}
