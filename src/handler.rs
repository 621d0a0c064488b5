//! Views and how routes store them.
//!
//! A route holds its view next to its filters, and the router holds routes
//! built from views of many different concrete types. Each view is therefore
//! stored as an [`Endpoint`] trait object:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }    ← the view
//!        ↓ view.route("hello", [GET]).to(hello)
//! hello.into_endpoint()                             ← Handler blanket impl
//!        ↓
//! Arc::new(FnEndpoint(hello))                       ← kept in the route
//!        ↓ Router::dispatch
//! filters.run_async(endpoint.serve(req))            ← polled only if every
//!        ↓                                            pre-phase passed
//! hello(req + what the filters stored).await
//! ```
//!
//! `serve` builds its future without calling the view. The view runs on first
//! poll, after the pre-phase, so it sees every extension the filters stored
//! with [`insert_extension`](crate::context::insert_extension).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The future an endpoint returns.
///
/// Boxed so every view has the same future type in the route table. Pinned
/// because an `async fn` future may borrow from itself across `.await`s and
/// must not move once polled. `Send + 'static` so the filter chain can await
/// it on any worker thread.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// A view with its concrete type erased.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// signature of the public [`Handler`] trait.
#[doc(hidden)]
pub trait Endpoint {
    /// Takes the `Arc` by value so the returned future can own the view
    /// instead of borrowing the route.
    fn serve(self: Arc<Self>, req: Request) -> BoxFuture;
}

/// A view shared by every concurrent request on its route. Registering the
/// same view under several methods clones the `Arc`, not the view.
#[doc(hidden)]
pub type BoxedEndpoint = Arc<dyn Endpoint + Send + Sync + 'static>;

/// Implemented for every function usable as a view:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// Sealed: the private `Sealed` supertrait cannot be named outside this
/// module, so the blanket impl below is the only implementation there will
/// ever be, and adding methods to it is not a breaking change.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_endpoint(self) -> BoxedEndpoint;
}

mod private {
    pub trait Sealed {}
}

// Named `async fn` items, closures returning `async` blocks, and anything
// else that is `Fn(Request) -> impl Future`.
impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_endpoint(self) -> BoxedEndpoint {
        Arc::new(FnEndpoint(self))
    }
}

struct FnEndpoint<F>(F);

impl<F, Fut, R> Endpoint for FnEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn serve(self: Arc<Self>, req: Request) -> BoxFuture {
        Box::pin(async move {
            let req = req.with_extensions(context::snapshot());
            (self.0)(req).await.into_response()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::Method;

    use super::*;

    #[tokio::test]
    async fn the_view_runs_on_first_poll() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        async fn counted(_req: Request) -> &'static str {
            CALLS.fetch_add(1, Ordering::SeqCst);
            "ok"
        }

        let endpoint = counted.into_endpoint();
        let pending = Arc::clone(&endpoint).serve(Request::new(Method::GET, "/"));
        drop(endpoint.serve(Request::new(Method::GET, "/")));
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);

        assert_eq!(pending.await.body_text(), Some("ok"));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
