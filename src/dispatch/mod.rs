//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! ParsedRequest (method, path, query, body, session carrier)
//!     → dispatcher.rs (route lookup via routing::RouteTable)
//!     → session::SessionResolver (fetch or create session)
//!     → binder.rs (path → session → query/body, by declared name)
//!     → validator.rs (declared schema, before invocation)
//!     → handler.rs (business capability)
//!     → error.rs (failure kind → status + JSON body)
//! ```
//!
//! # Design Decisions
//! - Parameter lists are plain data declared at registration
//! - Binding and validation errors never reach handlers
//! - Business failures are translated by kind, never reinterpreted

pub mod binder;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod params;
pub mod validator;

pub use binder::{BindingError, RequestBody};
pub use dispatcher::{Dispatched, Dispatcher, ParsedRequest};
pub use error::DispatchError;
pub use handler::{handler_fn, Failure, FailureKind, Handler, HandlerResult};
pub use params::{Arg, BoundArguments, FieldKind, FieldSpec, ParamSource, ParamSpec};
pub use validator::{Check, Schema, ValidationError};
