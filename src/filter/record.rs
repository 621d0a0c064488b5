//! Per-request record of which filters ran which phase.
//!
//! The record lives in a task-local slot, so it is scoped to one request
//! rather than to the process: two requests on two threads (or two tokio
//! tasks) never see each other's lists.
//!
//! ```rust
//! use strainer::filter::{apply_filters, record, FilterFactory};
//!
//! let noop = FilterFactory::<&str>::before("noop", || None);
//! let chain = apply_filters([noop]).wrap(|| Ok::<_, std::io::Error>("hi"));
//!
//! let (response, record) = record::scope(|| chain.call());
//! assert_eq!(response.unwrap(), "hi");
//! assert_eq!(record.before(), ["noop"]);
//! assert_eq!(record.after(), ["noop"]);
//! ```

use std::cell::RefCell;
use std::future::Future;

use super::protocol::FilterId;

/// Filters that completed each phase, in completion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionRecord {
    before: Vec<FilterId>,
    after: Vec<FilterId>,
}

impl ExecutionRecord {
    /// Filters whose pre-phase passed the request inward.
    pub fn before(&self) -> &[FilterId] {
        &self.before
    }

    /// Filters whose post-phase ran.
    pub fn after(&self) -> &[FilterId] {
        &self.after
    }
}

tokio::task_local! {
    static CURRENT: RefCell<ExecutionRecord>;
}

/// Runs `f` as one request with a fresh record, returning the record with
/// `f`'s output.
pub fn scope<T>(f: impl FnOnce() -> T) -> (T, ExecutionRecord) {
    CURRENT.sync_scope(RefCell::default(), || {
        let out = f();
        (out, CURRENT.with(|cell| cell.take()))
    })
}

/// Async counterpart of [`scope`]: the record follows the future across
/// `.await` points and worker threads.
pub async fn scope_async<F: Future>(fut: F) -> (F::Output, ExecutionRecord) {
    CURRENT
        .scope(RefCell::default(), async move {
            let out = fut.await;
            (out, CURRENT.with(|cell| cell.take()))
        })
        .await
}

/// Filters that have pre-processed the current request so far.
///
/// Empty outside a request scope.
pub fn get_filters_before_run() -> Vec<FilterId> {
    CURRENT
        .try_with(|cell| cell.borrow().before.clone())
        .unwrap_or_default()
}

/// Filters that have post-processed the current request's response so far.
///
/// Empty outside a request scope.
pub fn get_filters_after_run() -> Vec<FilterId> {
    CURRENT
        .try_with(|cell| cell.borrow().after.clone())
        .unwrap_or_default()
}

/// Whether the filter `id` has let the current request through its
/// pre-phase. A filter that short-circuited does not count.
///
/// `false` outside a request scope.
///
/// ```rust
/// use std::convert::Infallible;
/// use strainer::filter::{has_filter_before_run, record, FilterFactory, Filters};
///
/// let filters = Filters::new([
///     FilterFactory::<u32>::before("session", || None),
///     FilterFactory::<u32>::before("deny", || Some(403)),
/// ]);
/// let (status, _) = record::scope(|| {
///     let status = filters.run(|| Ok::<_, Infallible>(200)).unwrap();
///     assert!(has_filter_before_run("session"));
///     assert!(!has_filter_before_run("deny"));
///     status
/// });
/// assert_eq!(status, 403);
/// assert!(!has_filter_before_run("session"));
/// ```
pub fn has_filter_before_run(id: FilterId) -> bool {
    CURRENT
        .try_with(|cell| cell.borrow().before.contains(&id))
        .unwrap_or(false)
}

/// Whether the filter `id` has finished its post-phase for the current
/// request.
///
/// `false` outside a request scope.
pub fn has_filter_after_run(id: FilterId) -> bool {
    CURRENT
        .try_with(|cell| cell.borrow().after.contains(&id))
        .unwrap_or(false)
}

pub(crate) fn mark_before(id: FilterId) {
    let _ = CURRENT.try_with(|cell| cell.borrow_mut().before.push(id));
}

pub(crate) fn mark_after(id: FilterId) {
    let _ = CURRENT.try_with(|cell| cell.borrow_mut().after.push(id));
}

fn is_active() -> bool {
    CURRENT.try_with(|_| ()).is_ok()
}

/// Runs `f` in the caller's request scope, or in a throwaway one if there is
/// none.
pub(crate) fn ensure<T>(f: impl FnOnce() -> T) -> T {
    if is_active() { f() } else { scope(f).0 }
}

pub(crate) async fn ensure_async<F: Future>(fut: F) -> F::Output {
    if is_active() {
        fut.await
    } else {
        scope_async(fut).await.0
    }
}
