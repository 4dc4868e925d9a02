use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::context::Context;
use super::core::{HandlerFunc, Request};
use crate::router::ParamVec;

/// Idle contexts kept for reuse before extras are dropped.
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// Counters describing context reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Contexts allocated because the pool was empty
    pub created: usize,
    /// Acquisitions served from the pool
    pub reused: usize,
    /// Contexts currently waiting in the pool
    pub idle: usize,
}

/// Free list of request contexts.
///
/// A context is handed out exclusively to one dispatch and comes back fully
/// reset, so the pool never holds request data.
pub struct ContextPool {
    idle: Mutex<Vec<Box<Context>>>,
    created: AtomicUsize,
    reused: AtomicUsize,
    max_idle: usize,
}

impl ContextPool {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    #[must_use]
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
            max_idle,
        }
    }

    pub(crate) fn acquire(
        &self,
        request: Request,
        handlers: Arc<[HandlerFunc]>,
        params: ParamVec,
    ) -> Box<Context> {
        let recycled = self.idle.lock().pop();
        let mut ctx = match recycled {
            Some(ctx) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                ctx
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                Box::new(Context::new())
            }
        };
        ctx.prepare(request, handlers, params);
        ctx
    }

    pub(crate) fn release(&self, mut ctx: Box<Context>) {
        ctx.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(ctx);
        }
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            idle: self.idle.lock().len(),
        }
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPool")
            .field("stats", &self.stats())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}
