//! Hello, world! With filters.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example hello_world
//!
//! Try:
//!   curl http://localhost:3000/          # text, from the greeting `hello_world` stored
//!   curl http://localhost:3000/json      # `json` runs outside `hello_world`
//!   curl -i http://localhost:3000/error  # `json` runs inside and refuses: 418
//!   curl -i http://localhost:3000/me                          # 401
//!   curl -H 'Authorization: Bearer ada' http://localhost:3000/me

use http::{Method, StatusCode};
use strainer::context::{current_request, extension, insert_extension};
use strainer::filter::{
    apply_filters, has_filter_before_run, make_view_decorator, BoxError, Filter, FilterFactory, Step,
};
use strainer::{Request, Response, Router, Server};

/// What `hello_world` hands to the views.
#[derive(Clone)]
struct Greeting(&'static str);

#[derive(Clone)]
struct User(String);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // Stores the greeting every view below prints.
    let hello_world = FilterFactory::before("hello_world", || {
        let _ = insert_extension(Greeting("Hello, world!"));
        None::<Response>
    });

    // Turns a text response into `{"message": …}`. Refuses to run once
    // `hello_world` has seen the request.
    let json = FilterFactory::<Response>::new("json", || JsonFilter);

    // Answers 401 unless the request carries a bearer token.
    let login = FilterFactory::before("login", || {
        let user = current_request()?
            .header("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|name| User(name.to_owned()));
        match user {
            Some(user) => {
                let _ = insert_extension(user);
                None
            }
            None => Some(Response::status(StatusCode::UNAUTHORIZED)),
        }
    });

    let mut app = Router::new();
    let mut view = make_view_decorator(&mut app, "/", [hello_world]);

    // hello_world, then the view.
    view.route("", [Method::GET]).to(index);

    // json, hello_world, the view; then hello_world and json on the way out.
    view.route("json", [Method::GET]).filters([json.clone()]).to(message);

    // hello_world, then json, which aborts with 418 before the view runs.
    view.route("error", [Method::GET]).to_chain(apply_filters([json]).wrap(message));

    // login, hello_world, the view.
    view.route("me", [Method::GET]).filters([login]).to(me);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

fn greeting(req: &Request) -> &'static str {
    req.extension::<Greeting>().map_or("Hello?", |g| g.0)
}

async fn index(req: Request) -> Response {
    Response::html(format!(
        r#"{}<p><a href="/json">JSON</a></p><p><a href="/error">error</a></p>"#,
        greeting(&req),
    ))
}

async fn message(req: Request) -> Response {
    Response::text(greeting(&req))
}

async fn me(req: Request) -> String {
    let name = req.extension::<User>().map_or("?", |user| user.0.as_str());
    format!("{} You are {name}.", greeting(&req))
}

struct JsonFilter;

impl Filter<Response> for JsonFilter {
    fn before(&mut self) -> Result<Step<Response>, BoxError> {
        if has_filter_before_run("hello_world") {
            return Ok(Step::Respond(Response::status(StatusCode::IM_A_TEAPOT)));
        }
        Ok(Step::Pass)
    }

    fn after(&mut self, res: &Response) -> Result<Step<Response>, BoxError> {
        let Some(text) = res.body_text() else {
            return Ok(Step::Pass);
        };
        // The greeting is still there on the way out, even though the view
        // has already consumed its copy.
        let body = serde_json::json!({
            "message": text,
            "greeting": extension::<Greeting>().map(|g| g.0),
        });
        Ok(Step::Respond(Response::json(serde_json::to_vec(&body)?)))
    }
}
