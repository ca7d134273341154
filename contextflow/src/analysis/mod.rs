//! Enrichment records: slot values, sub-analysis results and the derived
//! profile.

mod profile;
mod sub_analysis;
mod types;

pub use profile::{CommunicationStyle, DerivedProfile, StyleSource, FALLBACK_PROFILE_CONFIDENCE};
pub use sub_analysis::{FallbackSet, ResultMap, SubAnalysis, FALLBACK_CONFIDENCE};
pub use types::{
    Confidence, Intent, MemorySnippet, MemoryView, MessageAnalysis, Relationship, SessionState,
    SocialView,
};
