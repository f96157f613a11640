//! Connection Guard
//!
//! Fatal native failures are shared by every connection on the same link.
//! `ConnectionRegistry` tracks the live connections per link and
//! broadcasts fatal state; each connection holds a `Guard` and takes an
//! `EntryToken` at every entry point. A dead connection refuses entry, and
//! the token keeps the process-wide entry depth balanced however the
//! entry point returns.
//!
//! The registry is an explicit object so tests can run isolated ones.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{DisplayError, Result};
use crate::native::LinkId;

/// Flags one connection shares with the registry
#[derive(Debug, Default)]
pub struct ConnectionState {
    fatal: AtomicBool,
    exit_requested: AtomicBool,
}

impl ConnectionState {
    /// Once set, never cleared
    pub fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::Acquire)
    }

    pub fn is_exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::Acquire)
    }

    fn mark_fatal(&self) {
        self.fatal.store(true, Ordering::Release);
        self.exit_requested.store(true, Ordering::Release);
    }

    pub fn request_exit(&self) {
        self.exit_requested.store(true, Ordering::Release);
    }
}

#[derive(Debug)]
struct Entry {
    id: u64,
    link: LinkId,
    state: Arc<ConnectionState>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    entries: Vec<Entry>,
    depth: usize,
}

/// Live connections, for fatal-error broadcast
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a connection on `link`
    pub fn register(&self, link: LinkId) -> Guard {
        let state = Arc::new(ConnectionState::default());
        let id = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push(Entry {
                id,
                link,
                state: state.clone(),
            });
            id
        };
        tracing::debug!("registered connection {} on link {:?}", id, link);
        Guard {
            registry: self.clone(),
            id,
            link,
            state,
        }
    }

    /// The link died: every connection on it turns fatal and its client
    /// must exit. Unwinds the entry depth. Returns how many connections
    /// were marked.
    pub fn report_fatal(&self, link: LinkId) -> usize {
        let mut inner = self.lock();
        let mut marked = 0;
        for entry in inner.entries.iter().filter(|e| e.link == link) {
            entry.state.mark_fatal();
            marked += 1;
        }
        inner.depth = 0;
        tracing::warn!("native I/O error on link {:?}: {} connection(s) lost", link, marked);
        marked
    }

    /// A request failed on `link`: its clients exit, the link stays usable
    pub fn report_error(&self, link: LinkId) {
        let inner = self.lock();
        for entry in inner.entries.iter().filter(|e| e.link == link) {
            entry.state.request_exit();
        }
    }

    /// Entry points currently active
    pub fn depth(&self) -> usize {
        self.lock().depth
    }

    /// Registered connections
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn deregister(&self, id: u64) {
        self.lock().entries.retain(|e| e.id != id);
    }
}

/// One connection's membership in the registry
#[derive(Debug)]
pub struct Guard {
    registry: ConnectionRegistry,
    id: u64,
    link: LinkId,
    state: Arc<ConnectionState>,
}

impl Guard {
    /// Enter an entry point; refused once the connection is fatal
    pub fn enter(&self) -> Result<EntryToken> {
        if self.state.is_fatal() {
            return Err(DisplayError::ConnectionDead);
        }
        let outermost = {
            let mut inner = self.registry.lock();
            inner.depth += 1;
            inner.depth == 1
        };
        Ok(EntryToken {
            registry: self.registry.clone(),
            outermost,
        })
    }

    /// Check the fatal flag between native calls
    pub fn check(&self) -> Result<()> {
        if self.state.is_fatal() {
            Err(DisplayError::ConnectionDead)
        } else {
            Ok(())
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn link(&self) -> LinkId {
        self.link
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Mark this link dead
    pub fn report_fatal(&self) -> usize {
        self.registry.report_fatal(self.link)
    }

    pub fn report_error(&self) {
        self.registry.report_error(self.link)
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

/// An active entry point; leaving it restores the depth
#[derive(Debug)]
pub struct EntryToken {
    registry: ConnectionRegistry,
    outermost: bool,
}

impl EntryToken {
    /// Whether no other entry point was active when this one started
    pub fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for EntryToken {
    fn drop(&mut self) {
        let mut inner = self.registry.lock();
        // A fatal report already unwound the depth to zero
        inner.depth = inner.depth.saturating_sub(1);
    }
}
