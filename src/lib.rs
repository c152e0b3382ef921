//! Concept server library: a route table and dispatch core driving an
//! in-memory social-networking backend.

pub mod app;
pub mod concepts;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod session;

pub use app::App;
pub use config::schema::ServerConfig;
pub use dispatch::Dispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::RouteTable;
