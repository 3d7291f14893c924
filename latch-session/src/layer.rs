//! Tower middleware that gives each request a [`SessionRegistry`].
//!
//! The layer creates a registry from the request headers and inserts it into
//! the request extensions. Handlers fetch it with
//! `req.extensions().get::<SessionRegistry>()`. Once the inner service has
//! responded, pending `Set-Cookie` values are appended to the response.
//!
//! # Example
//!
//! ```rust,ignore
//! use latch_session::{SessionLayer, SessionRegistry};
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(SessionLayer::new().with_auto_save(true))
//!     .service(app);
//! ```

use crate::registry::SessionRegistry;
use http::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower_service::Service;
use tracing::warn;

/// Layer installing a per-request [`SessionRegistry`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionLayer {
    auto_save: bool,
}

impl SessionLayer {
    /// Create a layer that only appends cookies from explicit saves.
    pub fn new() -> Self {
        Self::default()
    }

    /// Save every dirty session after the handler returns.
    pub fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }
}

impl<S> tower::Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            auto_save: self.auto_save,
        }
    }
}

/// Service created by [`SessionLayer`].
#[derive(Debug, Clone)]
pub struct SessionService<S> {
    inner: S,
    auto_save: bool,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SessionService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let registry = SessionRegistry::new(req.headers().clone());
        req.extensions_mut().insert(registry.clone());

        let auto_save = self.auto_save;
        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.await?;

            if auto_save && let Err(e) = registry.save_all().await {
                warn!(error = %e, "Failed to save sessions before responding");
            }
            registry.apply(response.headers_mut());

            Ok(response)
        })
    }
}
