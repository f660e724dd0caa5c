// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Key-addressed publish/subscribe.
//!
//! [`Emitter`] keeps, for every key, the handlers registered under it in
//! registration order. [`Emitter::emit`] calls each of them synchronously with
//! the same arguments. It is a plain value: owners compose it and forward the
//! calls they want to expose.
//!
//! ```
//! use understory_waypoint::Emitter;
//!
//! let mut emitter: Emitter<&'static str, u32> = Emitter::new();
//! let first = emitter.on("tick", |n| assert_eq!(*n, 7));
//! emitter.on("tick", |n| assert!(*n > 0));
//!
//! assert_eq!(emitter.emit(&"tick", &7), 2);
//! assert!(emitter.off(&"tick", first));
//! assert_eq!(emitter.emit(&"tick", &7), 1);
//! assert_eq!(emitter.emit(&"other", &7), 0);
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;

use hashbrown::HashMap;

/// Handle returned by [`Emitter::on`], used to unregister.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler<A> = Box<dyn FnMut(&A)>;

/// Synchronous publish/subscribe keyed by `K`, delivering `&A`.
pub struct Emitter<K, A> {
    handlers: HashMap<K, Vec<(HandlerId, Handler<A>)>>,
    next_id: u64,
}

impl<K, A> fmt::Debug for Emitter<K, A>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, list) in &self.handlers {
            map.entry(key, &list.len());
        }
        map.finish()
    }
}

impl<K: Eq + Hash, A> Default for Emitter<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, A> Emitter<K, A> {
    /// Creates an emitter with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }

    /// Registers `handler` under `key`.
    ///
    /// Handlers for the same key run in registration order.
    pub fn on(&mut self, key: K, handler: impl FnMut(&A) + 'static) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers
            .entry(key)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Unregisters a handler. Returns `false` if it was not registered under `key`.
    pub fn off(&mut self, key: &K, id: HandlerId) -> bool {
        let Some(list) = self.handlers.get_mut(key) else {
            return false;
        };
        let Some(index) = list.iter().position(|(handler_id, _)| *handler_id == id) else {
            return false;
        };
        let _handler = list.remove(index);
        if list.is_empty() {
            self.handlers.remove(key);
        }
        true
    }

    /// Calls every handler registered under `key` with `args`.
    ///
    /// Returns the number of handlers called.
    pub fn emit(&mut self, key: &K, args: &A) -> usize {
        let Some(list) = self.handlers.get_mut(key) else {
            return 0;
        };
        for (_, handler) in list.iter_mut() {
            handler(args);
        }
        list.len()
    }

    /// Number of handlers registered under `key`.
    #[must_use]
    pub fn handler_count(&self, key: &K) -> usize {
        self.handlers.get(key).map_or(0, Vec::len)
    }

    /// Unregisters every handler.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::Emitter;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    #[test]
    fn handlers_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut emitter: Emitter<u8, i32> = Emitter::new();
        for tag in ["first", "second", "third"] {
            let log = Rc::clone(&log);
            emitter.on(1, move |value| log.borrow_mut().push((tag, *value)));
        }

        assert_eq!(emitter.emit(&1, &42), 3);
        assert_eq!(
            *log.borrow(),
            [("first", 42), ("second", 42), ("third", 42)]
        );
    }

    #[test]
    fn keys_are_isolated() {
        let hits = Rc::new(RefCell::new(0));
        let mut emitter: Emitter<&str, ()> = Emitter::new();
        let counter = Rc::clone(&hits);
        emitter.on("start", move |()| *counter.borrow_mut() += 1);

        assert_eq!(emitter.emit(&"stop", &()), 0);
        assert_eq!(*hits.borrow(), 0);
        assert_eq!(emitter.emit(&"start", &()), 1);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn off_removes_only_the_given_handler() {
        let mut emitter: Emitter<&str, ()> = Emitter::new();
        let a = emitter.on("point", |()| {});
        let b = emitter.on("point", |()| {});
        assert_eq!(emitter.handler_count(&"point"), 2);

        assert!(emitter.off(&"point", a));
        assert!(!emitter.off(&"point", a));
        assert!(!emitter.off(&"start", b));
        assert_eq!(emitter.handler_count(&"point"), 1);
        assert_eq!(emitter.emit(&"point", &()), 1);

        emitter.clear();
        assert_eq!(emitter.handler_count(&"point"), 0);
    }
}
