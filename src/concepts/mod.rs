//! Business concepts.
//!
//! # Data Flow
//! ```text
//! Route handler (bound, validated arguments)
//!     → Sessioning (who is calling)
//!     → Authing / Posting / Commenting / Friending / Grouping / Scheduling
//!     → DocCollection (in-memory documents)
//!     → Doc values or ConceptError
//! ```
//!
//! # Design Decisions
//! - Concepts are independent; only route handlers combine them
//! - Every rule violation is a `ConceptError`, which maps onto a failure kind
//! - All state is in memory and cheap to clone (shared `Arc` maps)

pub mod authing;
pub mod commenting;
pub mod error;
pub mod friending;
pub mod grouping;
pub mod posting;
pub mod scheduling;
pub mod sessioning;
pub mod store;

pub use authing::Authing;
pub use commenting::Commenting;
pub use error::{ConceptError, ConceptResult};
pub use friending::Friending;
pub use grouping::Grouping;
pub use posting::{PostOptions, Posting};
pub use scheduling::Scheduling;
pub use sessioning::Sessioning;
pub use store::{Doc, DocCollection, ObjectId};

/// Every concept instance the application is composed of.
#[derive(Clone)]
pub struct Concepts {
    pub sessioning: Sessioning,
    pub authing: Authing,
    pub posting: Posting,
    pub commenting: Commenting,
    pub friending: Friending,
    pub grouping: Grouping,
    pub scheduling: Scheduling,
}

impl Concepts {
    pub fn new() -> Self {
        Self {
            sessioning: Sessioning,
            authing: Authing::new("users"),
            posting: Posting::new("posts"),
            commenting: Commenting::new("comments"),
            friending: Friending::new("friends"),
            grouping: Grouping::new("groups"),
            scheduling: Scheduling::new("events"),
        }
    }
}

impl Default for Concepts {
    fn default() -> Self {
        Self::new()
    }
}
