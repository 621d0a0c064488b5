//! Reusable view decorators: one set of filters for every route under a path
//! prefix.
//!
//! ```rust
//! use http::Method;
//! use strainer::{Request, Response, Router};
//! use strainer::filter::{make_view_decorator, FilterFactory};
//!
//! async fn profile(_req: Request) -> Response { Response::text("me") }
//! async fn settings(_req: Request) -> Response { Response::text("prefs") }
//!
//! let login_required = FilterFactory::before("login_required", || None::<Response>);
//! let audit = FilterFactory::before("audit", || None::<Response>);
//!
//! let mut router = Router::new();
//! let mut view = make_view_decorator(&mut router, "/account/", [login_required]);
//! view.route("profile", [Method::GET]).to(profile);
//! // One-off filters run outside the shared ones: audit, then login_required.
//! view.route("settings", [Method::GET, Method::POST]).filters([audit]).to(settings);
//! ```

use http::Method;
use tracing::debug;

use super::chain::{Chain, Filters};
use super::protocol::FilterFactory;

/// Something handlers can be registered on, such as [`Router`](crate::Router).
pub trait Routable<H> {
    /// The response type the filters attached to this target work on.
    type Response;

    /// Registers `handler` wrapped in `filters` for `path`. An empty `methods`
    /// slice means `GET`.
    fn attach(&mut self, path: &str, methods: &[Method], filters: Filters<Self::Response>, handler: H);
}

/// A decorator factory produced by [`make_view_decorator`].
pub struct ViewDecorator<'a, T, R> {
    routable: &'a mut T,
    prefix: String,
    filters: Filters<R>,
}

/// Returns a reusable decorator that registers views on `routable` under
/// `path_prefix`, each wrapped in `base_filters`.
pub fn make_view_decorator<'a, T, R>(
    routable: &'a mut T,
    path_prefix: &str,
    base_filters: impl IntoIterator<Item = FilterFactory<R>>,
) -> ViewDecorator<'a, T, R> {
    ViewDecorator {
        routable,
        prefix: path_prefix.to_owned(),
        filters: Filters::new(base_filters),
    }
}

impl<T, R> ViewDecorator<'_, T, R> {
    /// Starts registering a view for `prefix + path`.
    pub fn route(&mut self, path: &str, methods: impl IntoIterator<Item = Method>) -> ViewRoute<'_, T, R> {
        ViewRoute {
            routable: &mut *self.routable,
            path: format!("{}{path}", self.prefix),
            methods: methods.into_iter().collect(),
            base: self.filters.clone(),
            extra: Filters::default(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn filters(&self) -> &Filters<R> {
        &self.filters
    }
}

/// One pending registration from [`ViewDecorator::route`].
#[must_use = "a view route registers nothing until `to` or `to_chain` is called"]
pub struct ViewRoute<'v, T, R> {
    routable: &'v mut T,
    path: String,
    methods: Vec<Method>,
    base: Filters<R>,
    extra: Filters<R>,
}

impl<T, R> ViewRoute<'_, T, R> {
    /// Filters for this view only. They run outside the decorator's shared
    /// filters: first before the view, last after it.
    pub fn filters(mut self, extra: impl IntoIterator<Item = FilterFactory<R>>) -> Self {
        self.extra = Filters::new(extra);
        self
    }

    /// Registers a bare handler.
    pub fn to<H>(self, handler: H)
    where
        T: Routable<H, Response = R>,
    {
        self.to_chain(Chain::new(handler))
    }

    /// Registers a handler that already carries filters, for instance from
    /// [`apply_filters`](super::apply_filters). Those end up inside the
    /// decorator's filters.
    pub fn to_chain<H>(self, chain: Chain<R, H>)
    where
        T: Routable<H, Response = R>,
    {
        let (inner, handler) = chain.into_parts();
        let filters = self.extra.around(&self.base).around(&inner);
        debug!(path = %self.path, filters = ?filters, "view registered");
        self.routable.attach(&self.path, &self.methods, filters, handler);
    }
}
