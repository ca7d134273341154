//! Reference stages and the collaborator ports they read from.
//!
//! Each stage implements [`crate::stages::AnalysisStage`] for concurrent
//! pipelines and [`crate::stages::Stage`] for sequential ones, except
//! [`PersonalityStage`], which only makes sense after other stages ran.

mod memory;
mod message;
mod personality;
mod session;
mod social;

pub use memory::{InMemoryMemoryProvider, MemoryProvider, MemoryRecallStage};
pub use message::KeywordMessageAnalyzer;
pub use personality::PersonalityStage;
pub use session::{InMemorySessionStore, SessionStage, SessionStore};
pub use social::{InMemoryRelationshipProvider, RelationshipProvider, SocialLookupStage};

#[cfg(test)]
pub use memory::MockMemoryProvider;
#[cfg(test)]
pub use session::MockSessionStore;
#[cfg(test)]
pub use social::MockRelationshipProvider;
