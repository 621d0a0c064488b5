//! The request a filter is running for.
//!
//! [`Filter::before`](crate::filter::Filter::before) takes no arguments, so
//! [`Router::dispatch`](crate::Router::dispatch) publishes the request it is
//! dispatching in a task-local slot for the length of the filter chain. A
//! filter reads the request with [`current_request`] and hands values inward
//! (to filters nested inside it, and to the view) with [`insert_extension`].
//!
//! ```rust
//! use http::StatusCode;
//! use strainer::context::{current_request, insert_extension};
//! use strainer::filter::FilterFactory;
//! use strainer::{Request, Response};
//!
//! #[derive(Clone)]
//! struct User(String);
//!
//! let login = FilterFactory::before("login", || {
//!     let user = current_request()?
//!         .header("authorization")
//!         .and_then(|value| value.strip_prefix("Bearer "))
//!         .map(|name| User(name.to_owned()));
//!     match user {
//!         Some(user) => {
//!             let _ = insert_extension(user);
//!             None
//!         }
//!         None => Some(Response::status(StatusCode::UNAUTHORIZED)),
//!     }
//! });
//!
//! async fn profile(req: Request) -> String {
//!     let User(name) = req.extension::<User>().cloned().unwrap_or(User("?".into()));
//!     format!("hello {name}")
//! }
//! # let _ = (login, profile);
//! ```
//!
//! Outside a dispatch there is no current request: [`current_request`] is
//! `None`, and the `?` in the example above passes the request through.

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

use http::Extensions;

use crate::request::RequestHead;

struct RequestScope {
    head: Arc<RequestHead>,
    extensions: RefCell<Extensions>,
}

tokio::task_local! {
    static CURRENT: RequestScope;
}

/// Runs `fut` with `head` as the current request, starting from `extensions`.
pub(crate) async fn scope<F: Future>(
    head: Arc<RequestHead>,
    extensions: Extensions,
    fut: F,
) -> F::Output {
    let scope = RequestScope { head, extensions: RefCell::new(extensions) };
    CURRENT.scope(scope, fut).await
}

/// The request being dispatched, or `None` outside
/// [`Router::dispatch`](crate::Router::dispatch).
pub fn current_request() -> Option<Arc<RequestHead>> {
    CURRENT.try_with(|scope| Arc::clone(&scope.head)).ok()
}

/// Stores `value` for the rest of the current request, returning the value of
/// the same type it replaced.
///
/// Outside a request nothing is stored and `value` comes back as `Err`.
pub fn insert_extension<T: Clone + Send + Sync + 'static>(value: T) -> Result<Option<T>, T> {
    if CURRENT.try_with(|_| ()).is_err() {
        return Err(value);
    }
    Ok(CURRENT.with(|scope| scope.extensions.borrow_mut().insert(value)))
}

/// A copy of the value of type `T` stored for the current request.
pub fn extension<T: Clone + Send + Sync + 'static>() -> Option<T> {
    CURRENT
        .try_with(|scope| scope.extensions.borrow().get::<T>().cloned())
        .ok()
        .flatten()
}

/// Everything stored so far. The view gets this copy, so post-phases still
/// see the originals.
pub(crate) fn snapshot() -> Extensions {
    CURRENT
        .try_with(|scope| scope.extensions.borrow().clone())
        .unwrap_or_default()
}
