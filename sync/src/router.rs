//! Notification router - bridges host-level named notifications to
//! per-method handlers.
//!
//! The host subscription for a method lives exactly as long as at least one
//! local handler is registered for it. Host calls are queued as
//! [`HostCommand`]s so disposal can run from `Drop`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Context;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::bus::{EventEmitter, Subscription};
use crate::host::HostCommand;

#[derive(Default)]
struct RouterState {
    /// One bus per method with live interest; absence means "not subscribed
    /// at the host".
    methods: HashMap<String, EventEmitter<serde_json::Value>>,
}

#[derive(Clone)]
pub struct NotificationRouter {
    state: Rc<RefCell<RouterState>>,
    commands: mpsc::UnboundedSender<HostCommand>,
}

fn queue(commands: &mpsc::UnboundedSender<HostCommand>, command: HostCommand) {
    if commands.send(command).is_err() {
        tracing::debug!("Host command queue closed; dropping host call");
    }
}

impl NotificationRouter {
    #[must_use]
    pub fn new(commands: mpsc::UnboundedSender<HostCommand>) -> Self {
        Self {
            state: Rc::new(RefCell::new(RouterState::default())),
            commands,
        }
    }

    /// Register interest in `method`.
    ///
    /// The first handler for a method subscribes at the host; later ones
    /// only add local interest. Disposing the last handler unsubscribes at
    /// the host, even if no notification ever arrived.
    pub fn subscribe<F>(&self, method: &str, handler: F) -> Subscription
    where
        F: Fn(&serde_json::Value) -> anyhow::Result<()> + 'static,
    {
        let emitter = {
            let mut state = self.state.borrow_mut();
            match state.methods.get(method) {
                Some(emitter) => emitter.clone(),
                None => {
                    tracing::debug!(method, "Subscribing at host");
                    let emitter = EventEmitter::new("notification");
                    state.methods.insert(method.to_string(), emitter.clone());
                    queue(&self.commands, HostCommand::Subscribe(method.to_string()));
                    emitter
                }
            }
        };

        let mut registration = emitter.subscribe(handler);
        let state = Rc::downgrade(&self.state);
        let commands = self.commands.clone();
        let method = method.to_string();
        Subscription::new(move || {
            registration.dispose();
            if emitter.handler_count() > 0 {
                return;
            }
            let Some(state) = state.upgrade() else {
                return;
            };
            let removed = {
                let mut state = state.borrow_mut();
                // A newer bus for this method means a fresh host subscription
                // already replaced ours.
                match state.methods.get(&method) {
                    Some(current) if current.ptr_eq(&emitter) => {
                        state.methods.remove(&method);
                        true
                    }
                    _ => false,
                }
            };
            if removed {
                tracing::debug!(method = %method, "Unsubscribing at host");
                queue(&commands, HostCommand::Unsubscribe(method));
            }
        })
    }

    /// Like [`NotificationRouter::subscribe`], decoding params into `P`
    /// first. Decode failures count as handler failures.
    pub fn subscribe_typed<P, F>(&self, method: &str, handler: F) -> Subscription
    where
        P: DeserializeOwned + 'static,
        F: Fn(P) -> anyhow::Result<()> + 'static,
    {
        let name = method.to_string();
        self.subscribe(method, move |params| {
            let decoded = serde_json::from_value::<P>(params.clone())
                .with_context(|| format!("decoding {name} params"))?;
            handler(decoded)
        })
    }

    /// Deliver `params` to handlers registered for exactly `method`.
    pub fn dispatch(&self, method: &str, params: serde_json::Value) {
        let emitter = self.state.borrow().methods.get(method).cloned();
        match emitter {
            Some(emitter) => emitter.fire(params),
            None => tracing::trace!(method, "Ignoring notification without subscribers"),
        }
    }

    #[must_use]
    pub fn is_subscribed(&self, method: &str) -> bool {
        self.state.borrow().methods.contains_key(method)
    }

    /// Number of local handlers for `method`.
    #[must_use]
    pub fn interest(&self, method: &str) -> usize {
        self.state
            .borrow()
            .methods
            .get(method)
            .map_or(0, EventEmitter::handler_count)
    }
}
