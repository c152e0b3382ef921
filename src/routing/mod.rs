//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup by method)
//!     → matcher.rs (segment-by-segment pattern match)
//!     → Return: matched route + captured path params, or NotFound
//!
//! Route Registration (at startup):
//!     route(method, "/posts/:id").param(..).validate(..).handler(..)
//!     → Compile pattern, apply prefix
//!     → Check declared params and collisions
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: the most specific pattern wins (literal beats parameter)

pub mod matcher;
pub mod router;

pub use matcher::{PathParams, PathPattern, PatternError};
pub use router::{RouteBuilder, RouteDefinition, RouteError, RouteId, RouteMatch, RouteTable};
