//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Every route is a handler
//! plus the filters wrapped around it; routes registered with [`Router::on`]
//! simply have none.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::error;

use crate::context;
use crate::filter::{Chain, Filters, Routable};
use crate::handler::{BoxedEndpoint, Handler};
use crate::request::Request;
use crate::response::Response;

struct Route {
    filters: Filters<Response>,
    endpoint: BoxedEndpoint,
}

/// The application router.
///
/// Build it once at startup, either directly with [`Router::on`] /
/// [`Router::on_chain`] or through a
/// [`make_view_decorator`](crate::filter::make_view_decorator); then pass it
/// to [`Server::serve`](crate::Server::serve).
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Arc<Route>>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register an unfiltered handler for a method + path pair. Returns `self`
    /// for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.insert(method, path, Filters::default(), handler.into_endpoint());
        self
    }

    /// Register a handler wrapped with
    /// [`apply_filters`](crate::filter::apply_filters).
    pub fn on_chain<H: Handler>(mut self, method: Method, path: &str, chain: Chain<Response, H>) -> Self {
        let (filters, handler) = chain.into_parts();
        self.insert(method, path, filters, handler.into_endpoint());
        self
    }

    fn insert(&mut self, method: Method, path: &str, filters: Filters<Response>, endpoint: BoxedEndpoint) {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Arc::new(Route { filters, endpoint }))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(Arc<Route>, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let route = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((route, params))
    }

    /// Routes one request through its filters and view.
    ///
    /// For the length of the chain the request is the
    /// [`current_request`](crate::context::current_request), and extensions
    /// attached to it seed the ones filters can read and add to.
    ///
    /// Unknown routes answer `404`; a failing filter chain answers `500`.
    pub async fn dispatch(&self, req: Request) -> Response {
        let Some((route, params)) = self.lookup(req.method(), req.path()) else {
            return Response::status(StatusCode::NOT_FOUND);
        };
        let mut req = req.with_params(params);
        let head = req.share_head();
        let extensions = req.take_extensions();
        let endpoint = Arc::clone(&route.endpoint);

        let chain = route
            .filters
            .run_async(async move { Ok::<_, Infallible>(endpoint.serve(req).await) });
        let result = context::scope(Arc::clone(&head), extensions, chain).await;

        result.unwrap_or_else(|e| {
            error!(method = %head.method(), path = head.path(), "filter chain failed: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        })
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl<H: Handler> Routable<H> for Router {
    type Response = Response;

    fn attach(&mut self, path: &str, methods: &[Method], filters: Filters<Response>, handler: H) {
        let endpoint = handler.into_endpoint();
        if methods.is_empty() {
            self.insert(Method::GET, path, filters, endpoint);
            return;
        }
        for method in methods {
            self.insert(method.clone(), path, filters.clone(), Arc::clone(&endpoint));
        }
    }
}
