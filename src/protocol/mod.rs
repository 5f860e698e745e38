//! Site Protocol
//!
//! How sites talk to each other: relation trees travel as XML documents,
//! posted to a small HTTP server in front of each engine.
//!
//! # Module Structure
//!
//! - `xml` - Relation tree writer and parser
//! - `error` - Parse error types
//! - `wire` - JSON shapes returned by the server
//! - `server` - Axum router around one site's engine

pub mod error;
pub mod server;
pub mod wire;
pub mod xml;

pub use error::{ParseError, ParseResult};
pub use server::{create_router, serve, SiteState};
pub use wire::{HealthDto, QueryAccepted, WireTable};
