//! Request and response interceptors.
//!
//! # Design
//! An `Interceptor<T>` is a pair of optional async handlers: `on_fulfilled`
//! transforms the value flowing through the chain, `on_rejected` may recover
//! from an error by producing a value (or pass the error on). `T` is
//! `RequestConfig` for the request phase and `Response` for the response
//! phase. Registries are append-only; the pipeline takes a snapshot when it
//! builds a chain, so handlers registered afterwards never affect a call
//! already in flight.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::RwLock;

use crate::error::Error;
use crate::http::Response;
use crate::types::RequestConfig;

/// Future returned by every chain step.
pub type StepFuture<T> = BoxFuture<'static, Result<T, Error>>;

type FulfilledFn<T> = Arc<dyn Fn(T) -> StepFuture<T> + Send + Sync>;
type RejectedFn<T> = Arc<dyn Fn(Error) -> StepFuture<T> + Send + Sync>;

/// A pair of optional handlers run as one step of the chain.
pub struct Interceptor<T> {
    on_fulfilled: Option<FulfilledFn<T>>,
    on_rejected: Option<RejectedFn<T>>,
}

impl<T: Send + 'static> Interceptor<T> {
    /// An interceptor with neither handler; it passes values and errors
    /// through unchanged.
    pub fn new() -> Self {
        Self {
            on_fulfilled: None,
            on_rejected: None,
        }
    }

    /// Shorthand for `Interceptor::new().on_fulfilled(handler)`.
    pub fn fulfilled<F, Fut>(handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        Self::new().on_fulfilled(handler)
    }

    pub fn on_fulfilled<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        self.on_fulfilled = Some(Arc::new(move |value| handler(value).boxed()));
        self
    }

    /// Handle an error from an earlier step. Returning `Ok` recovers the
    /// chain; returning `Err` keeps it rejected.
    pub fn on_rejected<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        self.on_rejected = Some(Arc::new(move |error| handler(error).boxed()));
        self
    }

    /// Attach this step as the continuation of `previous`.
    ///
    /// A missing handler forwards the value or error it would have received.
    pub(crate) fn attach(&self, previous: StepFuture<T>) -> StepFuture<T> {
        let on_fulfilled = self.on_fulfilled.clone();
        let on_rejected = self.on_rejected.clone();
        previous
            .then(move |outcome| match outcome {
                Ok(value) => match on_fulfilled {
                    Some(handler) => handler(value),
                    None => future::ok(value).boxed(),
                },
                Err(error) => match on_rejected {
                    Some(handler) => handler(error),
                    None => future::err(error).boxed(),
                },
            })
            .boxed()
    }
}

impl<T: Send + 'static> Default for Interceptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        Self {
            on_fulfilled: self.on_fulfilled.clone(),
            on_rejected: self.on_rejected.clone(),
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("on_fulfilled", &self.on_fulfilled.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .finish()
    }
}

/// Ordered, append-only registry of interceptors for one phase.
pub struct InterceptorManager<T> {
    handlers: RwLock<Vec<Interceptor<T>>>,
}

impl<T: Send + 'static> InterceptorManager<T> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Append an interceptor after all previously registered ones.
    pub fn register(&self, interceptor: Interceptor<T>) {
        self.handlers.write().push(interceptor);
    }

    /// The registered interceptors in registration order, as of now.
    pub fn snapshot(&self) -> Vec<Interceptor<T>> {
        self.handlers.read().clone()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl<T: Send + 'static> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for InterceptorManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorManager")
            .field("len", &self.handlers.read().len())
            .finish()
    }
}

/// The two registries a client owns.
#[derive(Debug, Default)]
pub struct Interceptors {
    pub request: InterceptorManager<RequestConfig>,
    pub response: InterceptorManager<Response>,
}
