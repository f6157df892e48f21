//! Middleware for intercepting commits and dispatches

use serde_json::Value;

/// Kind of store operation seen by middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Commit,
    Dispatch,
}

/// A commit or dispatch passing through the store
#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    pub kind: OperationKind,
    /// Fully qualified mutation or action name
    pub name: &'a str,
    pub payload: &'a Value,
}

impl<'a> Operation<'a> {
    pub fn commit(name: &'a str, payload: &'a Value) -> Self {
        Self {
            kind: OperationKind::Commit,
            name,
            payload,
        }
    }

    pub fn dispatch(name: &'a str, payload: &'a Value) -> Self {
        Self {
            kind: OperationKind::Dispatch,
            name,
            payload,
        }
    }
}

/// Middleware trait for intercepting store operations
///
/// Implement this trait to add logging, auditing, or other cross-cutting
/// concerns to a [`Store`](crate::Store). Hooks take `&self` and run outside
/// the store's locks, so a hook may commit or dispatch through the same
/// store. For dispatches, `after` runs once the action has finished, or with
/// `succeeded == false` when the dispatch future is dropped first.
pub trait Middleware: Send + Sync {
    /// Called before the mutation or action runs
    fn before(&self, op: &Operation<'_>);

    /// Called after it ran; `succeeded` is false when an error is returned
    fn after(&self, op: &Operation<'_>, succeeded: bool);
}

/// A no-op middleware that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl Middleware for NoopMiddleware {
    fn before(&self, _op: &Operation<'_>) {}
    fn after(&self, _op: &Operation<'_>, _succeeded: bool) {}
}

/// Compose multiple middleware into a single middleware
#[derive(Default)]
pub struct ComposedMiddleware {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl std::fmt::Debug for ComposedMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedMiddleware")
            .field("middlewares_count", &self.middlewares.len())
            .finish()
    }
}

impl ComposedMiddleware {
    /// Create a new composed middleware
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the composition
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }
}

impl Middleware for ComposedMiddleware {
    fn before(&self, op: &Operation<'_>) {
        for middleware in &self.middlewares {
            middleware.before(op);
        }
    }

    fn after(&self, op: &Operation<'_>, succeeded: bool) {
        // Call in reverse order for proper nesting
        for middleware in self.middlewares.iter().rev() {
            middleware.after(op, succeeded);
        }
    }
}

/// Runs `before` on creation and `after` on drop.
///
/// Call [`finish`](AfterGuard::finish) with the outcome; a guard dropped
/// without it reports a failure.
pub(crate) struct AfterGuard<'a> {
    middleware: &'a dyn Middleware,
    op: Operation<'a>,
    succeeded: bool,
}

impl<'a> AfterGuard<'a> {
    pub(crate) fn enter(middleware: &'a dyn Middleware, op: Operation<'a>) -> Self {
        middleware.before(&op);
        Self {
            middleware,
            op,
            succeeded: false,
        }
    }

    pub(crate) fn finish(mut self, succeeded: bool) {
        self.succeeded = succeeded;
    }
}

impl Drop for AfterGuard<'_> {
    fn drop(&mut self) {
        self.middleware.after(&self.op, self.succeeded);
    }
}
