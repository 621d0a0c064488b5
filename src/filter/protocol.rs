//! The filter contract.
//!
//! A filter is a small state machine with two resumption points. The executor
//! calls [`Filter::before`] once, runs everything inside the filter, then calls
//! [`Filter::after`] with the response, and finally [`Filter::close`]:
//!
//! ```text
//! before()  ──Pass──▶  inner filters / handler  ──▶  after(&response)  ──▶  close()
//!    │
//!    └─Respond(v1)──▶  v1 is the response, nothing inward runs  ──▶  close()
//! ```

use std::sync::Arc;

/// Boxed error produced by a failing handler or filter step.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Identity of a filter, used for introspection.
///
/// Every instance built by the same [`FilterFactory`] shares its id.
pub type FilterId = &'static str;

/// What a filter did when it was resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<R> {
    /// Suspended without a value. Proceed inward (before) or keep the current
    /// response (after).
    Pass,
    /// Suspended with a value. In `before` this short-circuits the chain; in
    /// `after` it replaces the response.
    Respond(R),
    /// Ran to completion without suspending.
    ///
    /// Harmless in `after`. In `before` it breaks the contract: every filter
    /// must suspend at least once.
    Done,
}

impl<R> Step<R> {
    /// `Some(v)` becomes `Respond(v)`, `None` becomes `Pass`.
    pub fn from_option(value: Option<R>) -> Self {
        match value {
            Some(v) => Self::Respond(v),
            None => Self::Pass,
        }
    }
}

/// A two-phase interceptor around a handler or an inner filter.
///
/// Instances are single-use: a [`FilterFactory`] builds a fresh one for every
/// request and the executor drops it when the request is done.
pub trait Filter<R>: Send {
    /// Pre-phase. Runs before anything inward of this filter.
    fn before(&mut self) -> Result<Step<R>, BoxError>;

    /// Post-phase. Sees the response produced inward of this filter, which
    /// may be a short-circuit value from a filter further in.
    ///
    /// Only called when `before` returned [`Step::Pass`].
    fn after(&mut self, _response: &R) -> Result<Step<R>, BoxError> {
        Ok(Step::Done)
    }

    /// Releases whatever the filter holds. Called exactly once per instance,
    /// whichever way the request ends.
    fn close(&mut self) {}
}

type MakeFilter<R> = dyn Fn() -> Box<dyn Filter<R>> + Send + Sync;

/// Builds one fresh [`Filter`] per request.
///
/// Cloning a factory is one `Arc` increment; the factory itself holds no
/// per-request state.
pub struct FilterFactory<R> {
    id: FilterId,
    make: Arc<MakeFilter<R>>,
}

impl<R: 'static> FilterFactory<R> {
    /// A factory calling `make` for every request.
    ///
    /// ```rust
    /// use strainer::filter::{Filter, FilterFactory, Step, BoxError};
    ///
    /// #[derive(Default)]
    /// struct Heading;
    ///
    /// impl Filter<String> for Heading {
    ///     fn before(&mut self) -> Result<Step<String>, BoxError> {
    ///         Ok(Step::Pass)
    ///     }
    ///     fn after(&mut self, body: &String) -> Result<Step<String>, BoxError> {
    ///         Ok(Step::Respond(format!("<h1>{body}</h1>")))
    ///     }
    /// }
    ///
    /// let heading = FilterFactory::<String>::new("heading", Heading::default);
    /// assert_eq!(heading.id(), "heading");
    /// ```
    pub fn new<F, M>(id: FilterId, make: M) -> Self
    where
        F: Filter<R> + 'static,
        M: Fn() -> F + Send + Sync + 'static,
    {
        Self {
            id,
            make: Arc::new(move || Box::new(make()) as Box<dyn Filter<R>>),
        }
    }

    /// A filter with a pre-phase only. `check` returning `Some(v)` short-circuits
    /// the chain with `v`; `None` lets the request through untouched.
    pub fn before<C>(id: FilterId, check: C) -> Self
    where
        C: Fn() -> Option<R> + Send + Sync + 'static,
    {
        let check = Arc::new(check);
        Self::new(id, move || FnFilter {
            before: Some(Arc::clone(&check)),
            after: None::<Arc<fn(&R) -> Option<R>>>,
        })
    }

    /// A filter with a post-phase only. `rewrite` returning `Some(v)` replaces
    /// the response with `v`.
    pub fn after<W>(id: FilterId, rewrite: W) -> Self
    where
        W: Fn(&R) -> Option<R> + Send + Sync + 'static,
    {
        let rewrite = Arc::new(rewrite);
        Self::new(id, move || FnFilter {
            before: None::<Arc<fn() -> Option<R>>>,
            after: Some(Arc::clone(&rewrite)),
        })
    }
}

impl<R> FilterFactory<R> {
    /// The id every instance of this filter is recorded under.
    pub fn id(&self) -> FilterId {
        self.id
    }

    pub(crate) fn make(&self) -> Box<dyn Filter<R>> {
        (self.make)()
    }
}

impl<R> Clone for FilterFactory<R> {
    fn clone(&self) -> Self {
        Self { id: self.id, make: Arc::clone(&self.make) }
    }
}

impl<R> std::fmt::Debug for FilterFactory<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FilterFactory").field(&self.id).finish()
    }
}

/// Closure-backed filter behind [`FilterFactory::before`] and
/// [`FilterFactory::after`].
struct FnFilter<B: ?Sized, A: ?Sized> {
    before: Option<Arc<B>>,
    after: Option<Arc<A>>,
}

impl<R, B, A> Filter<R> for FnFilter<B, A>
where
    B: Fn() -> Option<R> + Send + Sync + ?Sized,
    A: Fn(&R) -> Option<R> + Send + Sync + ?Sized,
{
    fn before(&mut self) -> Result<Step<R>, BoxError> {
        Ok(match &self.before {
            Some(check) => Step::from_option(check()),
            None => Step::Pass,
        })
    }

    fn after(&mut self, response: &R) -> Result<Step<R>, BoxError> {
        Ok(match &self.after {
            Some(rewrite) => Step::from_option(rewrite(response)),
            None => Step::Done,
        })
    }
}
