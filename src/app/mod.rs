//! Application composition root.
//!
//! # Data Flow
//! ```text
//! ServerConfig
//!     → Concepts (in-memory business layer)
//!     → MemorySessionStore (idle TTL from config)
//!     → routes::build_route_table (prefix from config)
//!     → Dispatcher (frozen table + session resolver)
//! ```
//!
//! # Design Decisions
//! - Everything is constructed here and injected; nothing is global
//! - Tests build an `App` directly and drive its router in-process

pub mod responses;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use crate::concepts::Concepts;
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::routing::{RouteError, RouteTable};
use crate::session::MemorySessionStore;

/// A fully wired application.
#[derive(Clone)]
pub struct App {
    pub concepts: Concepts,
    pub sessions: MemorySessionStore,
    pub dispatcher: Dispatcher,
}

impl App {
    /// Build the concepts, session store and route table.
    pub fn new(config: &ServerConfig) -> Result<Self, RouteError> {
        let concepts = Concepts::new();
        let sessions = MemorySessionStore::with_ttl(Duration::from_secs(config.session.ttl_secs));
        let table = routes::build_route_table(&config.api.prefix, &concepts)?;
        let dispatcher = Dispatcher::new(Arc::new(table), Arc::new(sessions.clone()));

        Ok(Self {
            concepts,
            sessions,
            dispatcher,
        })
    }

    pub fn table(&self) -> &RouteTable {
        self.dispatcher.table()
    }

    /// Wrap the dispatcher in the HTTP server.
    pub fn into_server(self, config: ServerConfig, shutdown: Shutdown) -> HttpServer {
        HttpServer::new(config, self.dispatcher, shutdown)
    }
}
