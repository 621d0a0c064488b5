//! # strainer
//!
//! View filters for a minimal HTTP framework that runs behind a reverse proxy.
//!
//! A filter wraps a view and gets two turns: one before the view runs, where
//! it can answer the request itself (an auth check answering `401`), and one
//! after, where it can replace the response (wrapping a body in a template,
//! serialising a value). Filters nest like decorators; the outermost sees the
//! request first and the response last.
//!
//! The filter engine in [`filter`] is independent of HTTP: it works over any
//! response type and any zero-argument handler. The rest of the crate is the
//! thin host that binds filtered views to routes and serves them with hyper.
//! On that host, [`context`] gives filters the request they are running for.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use strainer::filter::{make_view_decorator, FilterFactory};
//! use strainer::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let deny_all = FilterFactory::before("deny_all", || {
//!         Some(Response::status(StatusCode::UNAUTHORIZED))
//!     });
//!     let heading = FilterFactory::after("heading", |res: &Response| {
//!         res.body_text().map(|body| Response::html(format!("<h1>{body}</h1>")))
//!     });
//!
//!     let mut app = Router::new();
//!     let mut view = make_view_decorator(&mut app, "/hello/", [heading]);
//!     view.route("world", [Method::GET]).to(hello);
//!     view.route("secret", [Method::GET]).filters([deny_all]).to(hello);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn hello(_req: Request) -> Response {
//!     Response::text("Hello world!")
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod context;
pub mod filter;

pub use error::{ChainError, Error, Phase};
pub use handler::Handler;
pub use context::current_request;
pub use request::{Request, RequestHead};
pub use response::{IntoResponse, Response};
pub use router::Router;
pub use server::Server;
