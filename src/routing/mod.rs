//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (RouteTable::match_path)
//!     → matcher.rs (evaluate path patterns in specificity order)
//!     → Return: matched Route or None (404)
//!
//! Matched route:
//!     → rewrite.rs (regex path rewrite)
//!     → router.rs (Route::prepare: header/param injection)
//!
//! Route Compilation (at startup / reload):
//!     RouteConfig[] (+ locator routes)
//!     → Compile patterns, targets, rewrites, headers
//!     → Sort by specificity (stable)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same path always matches same route
//! - Exact beats wildcard; longer literal prefix beats shorter

pub mod matcher;
pub mod rewrite;
pub mod router;

pub use matcher::{PathPattern, PatternError};
pub use rewrite::RewriteRule;
pub use router::{Forward, Route, RouteError, RouteTable};
