//! Schedule conflict detection and resolution engine.
//!
//! Detection scans a schedule's shift assignments against coverage targets,
//! scheduling rules, and employee constraints, producing conflict records.
//! Resolution applies one of eight remediation strategies under
//! preview/commit semantics; batch resolution reuses the single-conflict
//! path with independent per-item failure accounting.

pub mod clock;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod timeline;

pub use engine::{Engine, EngineConfig, EngineError};
