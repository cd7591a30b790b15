//! CardForge Generation Pipeline
//!
//! Turns an uploaded document into flashcards:
//! 1. Fetches the source through a signed URL
//! 2. Extracts per-page text
//! 3. Chunks pages into bounded windows
//! 4. Asks a model backend for card suggestions per chunk
//! 5. Validates suggestions and materializes cards with scheduling state
//! 6. Advances the generation job status
//!
//! The remote strategy hands the whole job to an external worker instead
//! (see [`dispatch`]), reconciling its authenticated callback later.

pub mod chunker;
pub mod dispatch;
pub mod errors;
pub mod extract;
pub mod pipeline;
pub mod prompt;
pub mod validate;

pub use errors::GenerationError;
pub use pipeline::{GenerationOutcome, GenerationParams, Generator};
