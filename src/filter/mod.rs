//! View filters.
//!
//! A filter wraps a handler (or another filter) and gets two chances to act:
//! once before the handler runs, where it may answer the request itself, and
//! once after, where it may replace the response.
//!
//! ```rust
//! use strainer::filter::{apply_filters, BoxError, Filter, FilterFactory, Step};
//!
//! struct RequireLogin { logged_in: bool }
//!
//! impl Filter<String> for RequireLogin {
//!     fn before(&mut self) -> Result<Step<String>, BoxError> {
//!         if self.logged_in {
//!             Ok(Step::Pass)
//!         } else {
//!             Ok(Step::Respond("401".to_owned()))
//!         }
//!     }
//! }
//!
//! let guard = FilterFactory::<String>::new("require_login", || RequireLogin { logged_in: false });
//! let chain = apply_filters([guard]).wrap(|| Ok::<_, std::io::Error>("secret".to_owned()));
//! assert_eq!(chain.call().unwrap(), "401");
//! ```
//!
//! # Applying filters
//!
//! - [`apply_filters`] wraps one handler. The leftmost filter is outermost.
//! - [`make_view_decorator`] builds a reusable decorator for every route under
//!   a path prefix. Per-route extras passed with
//!   [`ViewRoute::filters`] run *outside* the shared filters.
//!
//! Both orders are deliberate and differ: `apply_filters([c])` under a view
//! decorator with `[a]` runs `a, c, handler`, while the same view with
//! `.filters([c])` runs `c, a, handler`.
//!
//! # Introspection
//!
//! [`get_filters_before_run`] and [`get_filters_after_run`] report which
//! filters have handled the current request, which is mostly useful in tests.
//! See [`record`].
//!
//! Filters take no arguments. Behind [`Router`](crate::Router) they read the
//! request, and pass values inward, through [`context`](crate::context).

mod chain;
mod executor;
mod protocol;
mod view;

pub mod record;

pub use crate::error::{ChainError, Phase};
pub use chain::{apply_filters, make_filter, ApplyFilters, Chain, Filters};
pub use protocol::{BoxError, Filter, FilterFactory, FilterId, Step};
pub use record::{
    get_filters_after_run, get_filters_before_run, has_filter_after_run, has_filter_before_run,
    ExecutionRecord,
};
pub use view::{make_view_decorator, Routable, ViewDecorator, ViewRoute};
