//! Glossary context cache
//!
//! Six reference files (acronyms, products, stream leads, official sources,
//! workflow instructions, tracker field definitions) fetched from a shared
//! location, cached as an immutable snapshot, and refreshed on a TTL.

mod snapshot;
mod store;

pub use snapshot::{GlossarySnapshot, GLOSSARY_FILES};
pub use store::GlossaryStore;
