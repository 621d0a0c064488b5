//! Chain assembly.
//!
//! Filters nest like function decorators: the first filter listed is the
//! outermost, so `apply_filters([a, b]).wrap(h)` behaves as `a(b(h))`.
//! Pre-phases run `a` then `b`; post-phases run `b` then `a`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::protocol::{BoxError, FilterFactory, FilterId};
use crate::error::ChainError;

/// An ordered, immutable list of filter factories. Index 0 is outermost.
pub struct Filters<R> {
    factories: Arc<[FilterFactory<R>]>,
}

impl<R> Filters<R> {
    pub fn new(factories: impl IntoIterator<Item = FilterFactory<R>>) -> Self {
        Self { factories: factories.into_iter().collect() }
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Filter ids, outermost first.
    pub fn ids(&self) -> impl Iterator<Item = FilterId> + '_ {
        self.factories.iter().map(FilterFactory::id)
    }

    /// A new list with `self` wrapped around `inner`.
    pub fn around(&self, inner: &Filters<R>) -> Filters<R> {
        Self::new(self.factories.iter().chain(inner.factories.iter()).cloned())
    }

    pub(crate) fn as_slice(&self) -> &[FilterFactory<R>] {
        &self.factories
    }
}

impl<R> Clone for Filters<R> {
    fn clone(&self) -> Self {
        Self { factories: Arc::clone(&self.factories) }
    }
}

impl<R> Default for Filters<R> {
    fn default() -> Self {
        Self::new([])
    }
}

impl<R> fmt::Debug for Filters<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

/// A handler together with the filters wrapped around it.
pub struct Chain<R, H> {
    filters: Filters<R>,
    handler: H,
}

impl<R, H> Chain<R, H> {
    /// A chain with no filters: calling it returns whatever `handler` returns.
    pub fn new(handler: H) -> Self {
        Self { filters: Filters::default(), handler }
    }

    pub fn filters(&self) -> &Filters<R> {
        &self.filters
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_parts(self) -> (Filters<R>, H) {
        (self.filters, self.handler)
    }
}

impl<R, H, E> Chain<R, H>
where
    H: Fn() -> Result<R, E>,
    E: Into<BoxError>,
{
    /// Runs one request through the chain.
    pub fn call(&self) -> Result<R, ChainError> {
        self.filters.run(|| (self.handler)())
    }
}

impl<R, H, Fut, E> Chain<R, H>
where
    H: Fn() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Into<BoxError>,
{
    /// Runs one request through the chain with an async handler.
    pub async fn call_async(&self) -> Result<R, ChainError> {
        self.filters.run_async((self.handler)()).await
    }
}

impl<R, H> fmt::Debug for Chain<R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("filters", &self.filters).finish_non_exhaustive()
    }
}

/// A reusable decorator produced by [`apply_filters`].
#[derive(Clone, Debug)]
pub struct ApplyFilters<R> {
    filters: Filters<R>,
}

/// Decorator applying `filters` to a handler. The leftmost filter is the
/// first to run before the handler and the last to run after it.
///
/// ```rust
/// use strainer::filter::{apply_filters, FilterFactory};
///
/// let auth = FilterFactory::<String>::before("auth", || None);
/// let heading = FilterFactory::after("heading", |body: &String| {
///     Some(format!("<h1>{body}</h1>"))
/// });
///
/// let chain = apply_filters([auth, heading])
///     .wrap(|| Ok::<_, std::io::Error>("Hello world!".to_owned()));
/// assert_eq!(chain.call().unwrap(), "<h1>Hello world!</h1>");
/// ```
pub fn apply_filters<R>(filters: impl IntoIterator<Item = FilterFactory<R>>) -> ApplyFilters<R> {
    ApplyFilters { filters: Filters::new(filters) }
}

/// Decorator applying a single filter.
pub fn make_filter<R>(filter: FilterFactory<R>) -> ApplyFilters<R> {
    apply_filters([filter])
}

impl<R> ApplyFilters<R> {
    /// Wraps a bare handler.
    pub fn wrap<H>(&self, handler: H) -> Chain<R, H> {
        Chain { filters: self.filters.clone(), handler }
    }

    /// Wraps an assembled chain; these filters end up outside the ones it
    /// already has, as stacking decorators would.
    pub fn decorate<H>(&self, chain: Chain<R, H>) -> Chain<R, H> {
        Chain { filters: self.filters.around(&chain.filters), handler: chain.handler }
    }

    pub fn filters(&self) -> &Filters<R> {
        &self.filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(id: FilterId) -> FilterFactory<()> {
        FilterFactory::before(id, || None)
    }

    #[test]
    fn wrap_keeps_listing_order() {
        let chain = apply_filters([noop("a"), noop("b")]).wrap(());
        assert_eq!(chain.filters().ids().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn decorate_puts_new_filters_outside() {
        let inner = apply_filters([noop("b")]).wrap(());
        let chain = make_filter(noop("a")).decorate(inner);
        assert_eq!(chain.filters().ids().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn reassembly_leaves_the_original_untouched() {
        let decorator = apply_filters([noop("a")]);
        let first = decorator.wrap(());
        let second = make_filter(noop("z")).decorate(decorator.wrap(()));
        assert_eq!(first.filters().len(), 1);
        assert_eq!(second.filters().len(), 2);
        assert_eq!(format!("{:?}", second.filters()), r#"["z", "a"]"#);
    }
}
