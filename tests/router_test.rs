use std::collections::HashMap;
use std::convert::Infallible;

use http::header::AUTHORIZATION;
use http::{HeaderValue, Method, StatusCode};
use strainer::context::{current_request, extension, insert_extension};
use strainer::filter::{
    apply_filters, make_view_decorator, record, BoxError, Filter, FilterFactory, Filters,
    Routable, Step,
};
use strainer::{Phase, Request, Response, Router};

fn noop(id: &'static str) -> FilterFactory<Response> {
    FilterFactory::before(id, || None)
}

fn heading() -> FilterFactory<Response> {
    FilterFactory::after("heading", |res: &Response| {
        res.body_text().map(|body| Response::html(format!("<h1>{body}</h1>")))
    })
}

fn unauthorized() -> FilterFactory<Response> {
    FilterFactory::before("unauthorized", || Some(Response::status(StatusCode::UNAUTHORIZED)))
}

/// "If unauthenticated, short-circuit with 401; else pass."
fn require_auth() -> FilterFactory<Response> {
    FilterFactory::before("require_auth", || {
        let authorized = current_request().is_some_and(|req| req.header("authorization").is_some());
        (!authorized).then(|| Response::status(StatusCode::UNAUTHORIZED))
    })
}

#[derive(Clone, Debug, PartialEq)]
struct User(String);

/// Stores the bearer token's user for the view.
fn load_user() -> FilterFactory<Response> {
    FilterFactory::before("load_user", || {
        let head = current_request()?;
        let name = head.header("authorization")?.strip_prefix("Bearer ")?;
        let _ = insert_extension(User(name.to_owned()));
        None
    })
}

async fn hello(_req: Request) -> Response {
    Response::text("Hello world!")
}

async fn must_not_run(_req: Request) -> Response {
    unreachable!("view must not run")
}

async fn echo_id(req: Request) -> String {
    format!("user {}", req.param("id").unwrap_or("?"))
}

async fn profile(req: Request) -> String {
    match req.extension::<User>() {
        Some(User(name)) => format!("{name} (account {})", req.param("id").unwrap_or("?")),
        None => "stranger".to_owned(),
    }
}

async fn whoami(req: Request) -> String {
    req.header("authorization").unwrap_or("anonymous").to_owned()
}

async fn get(router: &Router, path: &str) -> (Response, record::ExecutionRecord) {
    record::scope_async(router.dispatch(Request::new(Method::GET, path))).await
}

// ── View decorators on the HTTP router ────────────────────────────────────────

#[tokio::test]
async fn test_view_decorator_applies_base_filters() {
    let mut router = Router::new();
    let mut view = make_view_decorator(&mut router, "/", [noop("noop"), noop("another_noop")]);
    view.route("", [Method::GET]).to(hello);

    let (response, record) = get(&router, "/").await;
    assert_eq!(response.body_text(), Some("Hello world!"));
    assert_eq!(record.before(), ["noop", "another_noop"]);
    assert_eq!(record.after(), ["another_noop", "noop"]);
}

#[tokio::test]
async fn test_one_off_filters_run_outside_base_filters() {
    let mut router = Router::new();
    let mut view = make_view_decorator(&mut router, "/", [noop("noop"), noop("another_noop")]);
    view.route("one_off", [Method::GET]).filters([heading()]).to(hello);

    let (response, record) = get(&router, "/one_off").await;
    assert_eq!(response.body_text(), Some("<h1>Hello world!</h1>"));
    assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
    assert_eq!(record.before(), ["heading", "noop", "another_noop"]);
    assert_eq!(record.after(), ["another_noop", "noop", "heading"]);
}

#[tokio::test]
async fn test_apply_filters_under_a_view_runs_inside_it() {
    let mut router = Router::new();
    let mut view = make_view_decorator(&mut router, "/", [noop("base")]);
    view.route("extra", [Method::GET]).filters([noop("extra")]).to(hello);
    view.route("wrapped", [Method::GET])
        .to_chain(apply_filters([noop("extra")]).wrap(hello));

    let (_, extra) = get(&router, "/extra").await;
    let (_, wrapped) = get(&router, "/wrapped").await;
    assert_eq!(extra.before(), ["extra", "base"]);
    assert_eq!(wrapped.before(), ["base", "extra"]);
}

#[tokio::test]
async fn test_short_circuit_answers_without_running_the_view() {
    let mut router = Router::new();
    let mut view = make_view_decorator(&mut router, "/admin/", [unauthorized(), heading()]);
    view.route("panel", [Method::GET]).to(must_not_run);

    let (response, record) = get(&router, "/admin/panel").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert!(record.before().is_empty());
    assert!(record.after().is_empty());
}

#[tokio::test]
async fn test_methods_and_prefix() {
    let mut router = Router::new();
    let mut view = make_view_decorator(&mut router, "/users/", [noop("noop")]);
    view.route("{id}", [Method::GET, Method::PUT]).to(echo_id);
    view.route("default/{id}", [] as [Method; 0]).to(echo_id);

    for method in [Method::GET, Method::PUT] {
        let response = router.dispatch(Request::new(method, "/users/42")).await;
        assert_eq!(response.body_text(), Some("user 42"));
    }
    let response = router.dispatch(Request::new(Method::POST, "/users/42")).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let (response, _) = get(&router, "/users/default/7").await;
    assert_eq!(response.body_text(), Some("user 7"));
}

#[tokio::test]
async fn test_contract_violation_becomes_500() {
    struct NeverSuspends;

    impl Filter<Response> for NeverSuspends {
        fn before(&mut self) -> Result<Step<Response>, BoxError> {
            Ok(Step::Done)
        }
    }

    let router = Router::new().on_chain(
        Method::GET,
        "/broken",
        apply_filters([FilterFactory::<Response>::new("never_suspends", || NeverSuspends)]).wrap(hello),
    );

    let (response, _) = get(&router, "/broken").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_failing_filter_becomes_500() {
    struct SessionStore {
        fail_in: Phase,
    }

    impl Filter<Response> for SessionStore {
        fn before(&mut self) -> Result<Step<Response>, BoxError> {
            match self.fail_in {
                Phase::Before => Err("session store unreachable".into()),
                Phase::After => Ok(Step::Pass),
            }
        }

        fn after(&mut self, _res: &Response) -> Result<Step<Response>, BoxError> {
            Err("session store unreachable".into())
        }
    }

    let router = Router::new()
        .on_chain(
            Method::GET,
            "/before",
            apply_filters([FilterFactory::<Response>::new("sessions", || SessionStore {
                fail_in: Phase::Before,
            })])
            .wrap(must_not_run),
        )
        .on_chain(
            Method::GET,
            "/after",
            apply_filters([
                noop("outer"),
                FilterFactory::<Response>::new("sessions", || SessionStore { fail_in: Phase::After }),
            ])
            .wrap(hello),
        );

    let (response, record) = get(&router, "/before").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(record.before().is_empty());

    let (response, record) = get(&router, "/after").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body().is_empty());
    assert_eq!(record.before(), ["outer", "sessions"]);
    assert!(record.after().is_empty());
}

// ── Filters that read the request ─────────────────────────────────────────────

#[tokio::test]
async fn test_filter_answers_401_without_authorization() {
    let mut router = Router::new();
    let mut view = make_view_decorator(&mut router, "/", [require_auth()]);
    view.route("private", [Method::GET]).to(hello);

    let (response, record) = get(&router, "/private").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert!(record.before().is_empty());

    let req = Request::new(Method::GET, "/private")
        .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer alice"));
    let (response, record) = record::scope_async(router.dispatch(req)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.body_text(), Some("Hello world!"));
    assert_eq!(record.before(), ["require_auth"]);
}

#[tokio::test]
async fn test_filter_hands_a_value_to_the_view() {
    // Post-phases still see what the pre-phase stored.
    let tag = FilterFactory::after("tag", |res: &Response| {
        let User(name) = extension::<User>()?;
        Some(Response::text(format!("{} [{name}]", res.body_text()?)))
    });

    let mut router = Router::new();
    let mut view = make_view_decorator(&mut router, "/accounts/", [tag, load_user()]);
    view.route("{id}", [Method::GET]).to(profile);

    let req = Request::new(Method::GET, "/accounts/7")
        .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer ada"));
    let response = router.dispatch(req).await;
    assert_eq!(response.body_text(), Some("ada (account 7) [ada]"));

    let (response, record) = get(&router, "/accounts/7").await;
    assert_eq!(response.body_text(), Some("stranger"));
    assert_eq!(record.before(), ["tag", "load_user"]);
    assert!(current_request().is_none());
}

#[tokio::test]
async fn test_filters_see_path_params_and_seeded_extensions() {
    let only_owner = FilterFactory::before("only_owner", || {
        let head = current_request()?;
        let owner = extension::<User>()?;
        (head.param("id") != Some(owner.0.as_str()))
            .then(|| Response::status(StatusCode::FORBIDDEN))
    });
    let router = Router::new().on_chain(
        Method::GET,
        "/accounts/{id}",
        apply_filters([only_owner]).wrap(profile),
    );

    let mine = Request::new(Method::GET, "/accounts/ada").with_extension(User("ada".to_owned()));
    assert_eq!(router.dispatch(mine).await.body_text(), Some("ada (account ada)"));

    let theirs = Request::new(Method::GET, "/accounts/bob").with_extension(User("ada".to_owned()));
    assert_eq!(router.dispatch(theirs).await.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unfiltered_route_and_headers() {
    let router = Router::new().on(Method::GET, "/whoami", whoami);

    let (response, record) = get(&router, "/whoami").await;
    assert_eq!(response.body_text(), Some("anonymous"));
    assert!(record.before().is_empty());

    let req = Request::new(Method::GET, "/whoami")
        .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer alice"));
    assert_eq!(router.dispatch(req).await.body_text(), Some("Bearer alice"));
}

// ── Any routable target ───────────────────────────────────────────────────────

type View = Box<dyn Fn() -> Result<String, Infallible>>;

/// Records registrations instead of serving them.
#[derive(Default)]
struct Routes {
    views: HashMap<String, (Vec<Method>, Filters<String>, View)>,
}

impl<H> Routable<H> for Routes
where
    H: Fn() -> Result<String, Infallible> + 'static,
{
    type Response = String;

    fn attach(&mut self, path: &str, methods: &[Method], filters: Filters<String>, handler: H) {
        self.views.insert(path.to_owned(), (methods.to_vec(), filters, Box::new(handler)));
    }
}

impl Routes {
    fn call(&self, path: &str) -> (String, record::ExecutionRecord) {
        let (_, filters, view) = &self.views[path];
        let (response, record) = record::scope(|| filters.run(view));
        (response.unwrap(), record)
    }
}

#[test]
fn test_view_decorator_on_custom_routable() {
    let a = FilterFactory::<String>::before("a", || None);
    let c = FilterFactory::<String>::after("c", |body: &String| Some(body.to_uppercase()));

    let mut routes = Routes::default();
    let mut view = make_view_decorator(&mut routes, "/hello/", [a]);
    assert_eq!(view.prefix(), "/hello/");
    view.route("plain", [Method::GET]).to(|| Ok::<_, Infallible>("hi".to_owned()));
    view.route("extended", [Method::GET]).filters([c.clone()]).to(|| Ok::<_, Infallible>("hi".to_owned()));
    view.route("wrapped", [Method::GET])
        .to_chain(apply_filters([c]).wrap(|| Ok::<_, Infallible>("hi".to_owned())));

    assert_eq!(routes.views["/hello/plain"].0, [Method::GET]);

    let (response, record) = routes.call("/hello/plain");
    assert_eq!(response, "hi");
    assert_eq!(record.before(), ["a"]);

    let (response, record) = routes.call("/hello/extended");
    assert_eq!(response, "HI");
    assert_eq!(record.before(), ["c", "a"]);

    let (response, record) = routes.call("/hello/wrapped");
    assert_eq!(response, "HI");
    assert_eq!(record.before(), ["a", "c"]);
}
