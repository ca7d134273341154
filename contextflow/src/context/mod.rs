//! Context management for pipeline runs.
//!
//! This module provides:
//! - The [`Context`] record threaded through every stage
//! - Run identity and explicit session handles
//! - The error entries an engine records on a context

mod error_entry;
mod identity;
mod run_context;
mod session;

pub use error_entry::{ContextError, ErrorKind};
pub use identity::RunIdentity;
pub use run_context::{Context, Enrichments, Slot, SlotConflict};
pub use session::SessionHandle;
