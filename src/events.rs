//! # Event Dispatch
//!
//! Publish/subscribe plumbing shared by the gamepad and the drone event sources.
//!
//! Each source owns one [`Dispatcher`]. Handlers are registered per event kind and
//! run to completion, in registration order, on the task that drives the
//! dispatcher. Events from one source are therefore handled strictly in arrival
//! order; events from different sources are handled on different tasks with no
//! ordering or mutual exclusion between them.
//!
//! ```
//! use tellopad::controller::event::{Button, InputEvent, InputKind};
//! use tellopad::events::Dispatcher;
//!
//! let mut dispatcher = Dispatcher::<InputEvent>::new();
//! dispatcher.on(InputKind::Button(Button::Triangle), |_| println!("Takeoff"));
//!
//! assert_eq!(dispatcher.dispatch(&InputEvent::Button(Button::Triangle)), 1);
//! assert_eq!(dispatcher.dispatch(&InputEvent::Button(Button::Cross)), 0);
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// An event that can be routed by kind.
pub trait Event: Debug + Send + 'static {
    /// Discriminant used to look up handlers.
    type Kind: Copy + Eq + Hash + Debug + Send;

    fn kind(&self) -> Self::Kind;
}

type Handler<E> = Box<dyn FnMut(&E) + Send>;

/// Per-source handler table.
pub struct Dispatcher<E: Event> {
    handlers: HashMap<E::Kind, Vec<Handler<E>>>,
}

impl<E: Event> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Dispatcher<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for every event of `kind`.
    pub fn on<F>(&mut self, kind: E::Kind, handler: F)
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Runs every handler registered for the event's kind and returns how many ran.
    pub fn dispatch(&mut self, event: &E) -> usize {
        let kind = event.kind();
        match self.handlers.get_mut(&kind) {
            Some(handlers) => {
                for handler in handlers.iter_mut() {
                    handler(event);
                }
                handlers.len()
            }
            None => {
                trace!("No handler for {:?}", kind);
                0
            }
        }
    }

    /// Dispatches events from `rx` until every sender is dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<E>) {
        while let Some(event) = rx.recv().await {
            self.dispatch(&event);
        }
        debug!("Event source closed");
    }
}
