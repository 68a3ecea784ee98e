use std::fmt::Debug;
use std::sync::{Arc, RwLock};
use log::{debug, trace, warn};

/// Trait for objects that listen to events fanned out by a component
pub trait EventListener<E>: Send + Sync {
    /// Called synchronously, in registration order, for every event
    ///
    /// # Arguments
    ///
    /// * `event` - The event that occurred
    fn on_event(&self, event: &E);
}

impl<E, F> EventListener<E> for F
where
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        self(event)
    }
}

/// Append-only, ordered collection of listeners
///
/// The consumer set is fixed when the appliance is wired up, so there is no
/// unregister path. Listeners are invoked outside the lock so that a listener
/// may call back into the component that fired the event.
pub struct ListenerRegistry<E> {
    /// Name used in log output (e.g. "player", "metadata")
    name: &'static str,

    listeners: RwLock<Vec<Arc<dyn EventListener<E>>>>,
}

impl<E: Debug + 'static> ListenerRegistry<E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener, returning the number of registered listeners
    pub fn register(&self, listener: Arc<dyn EventListener<E>>) -> usize {
        match self.listeners.write() {
            Ok(mut listeners) => {
                listeners.push(listener);
                debug!("[{}] Listener registered, total listeners: {}", self.name, listeners.len());
                listeners.len()
            }
            Err(_) => {
                warn!("[{}] Failed to acquire write lock when registering listener", self.name);
                0
            }
        }
    }

    /// Register a closure as listener
    pub fn subscribe<F>(&self, callback: F) -> usize
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(Arc::new(callback))
    }

    pub fn len(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every listener in registration order
    pub fn fire(&self, event: &E) {
        let snapshot: Vec<Arc<dyn EventListener<E>>> = match self.listeners.read() {
            Ok(listeners) => listeners.clone(),
            Err(_) => {
                warn!("[{}] Failed to acquire read lock for listeners when firing {:?}", self.name, event);
                return;
            }
        };

        debug!("[{}] Notifying {} listeners of {:?}", self.name, snapshot.len(), event);
        for listener in snapshot.iter() {
            trace!("[{}] Notifying listener", self.name);
            listener.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_listeners_called_in_registration_order() {
        let registry: ListenerRegistry<u32> = ListenerRegistry::new("test");
        let log = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let log = log.clone();
            registry.subscribe(move |event: &u32| log.lock().unwrap().push((id, *event)));
        }
        assert_eq!(registry.len(), 3);

        registry.fire(&7);
        registry.fire(&8);

        assert_eq!(
            *log.lock().unwrap(),
            vec![(0, 7), (1, 7), (2, 7), (0, 8), (1, 8), (2, 8)]
        );
    }

    #[test]
    fn test_listener_may_register_during_fire() {
        let registry: Arc<ListenerRegistry<u32>> = Arc::new(ListenerRegistry::new("test"));
        let inner = registry.clone();
        registry.subscribe(move |_event: &u32| {
            inner.subscribe(|_: &u32| {});
        });

        registry.fire(&1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_fire_without_listeners() {
        let registry: ListenerRegistry<String> = ListenerRegistry::new("empty");
        assert!(registry.is_empty());
        registry.fire(&"nothing".to_string());
    }
}
