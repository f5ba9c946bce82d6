//! Ordered handler registry.
//!
//! Insertion order is the tie-break order: on equal confidence the handler
//! registered first wins. Duplicates are not detected; a handler registered
//! twice is simply scored twice.

use std::fmt;
use std::rc::Rc;

use crate::routing::handler::RequestHandler;

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<Rc<dyn RequestHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler.
    pub fn register<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.register_shared(Rc::new(handler))
    }

    /// Append a handler that is also referenced elsewhere.
    pub fn register_shared(&mut self, handler: Rc<dyn RequestHandler>) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<H: RequestHandler + 'static>(mut self, handler: H) -> Self {
        self.register(handler);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn RequestHandler>> {
        self.handlers.iter()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
