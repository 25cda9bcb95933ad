//! Persisted meeting document and the serializer that guards it.

pub mod document;
pub mod serializer;

pub use document::{MeetingDocument, MeetingRecord, TranscriptLine};
pub use serializer::{StoreError, StoreSerializer};
