//! Declarative record mapping: rule tables, the encoder/decoder pair and
//! the polymorphic type registry.
//!
//! A [`Mapper`] is assembled once at startup from one [`RuleTable`] per
//! record type plus the tag registrations of any open sum-type families,
//! and is then shared read-only by every encode and decode call. Records
//! plug in through the [`RecordSource`] and [`RecordTarget`] traits.
//!
//! [`RuleTable`]: rule::RuleTable
//! [`RecordSource`]: record::RecordSource
//! [`RecordTarget`]: record::RecordTarget

/// Per-field and per-type declarative metadata.
pub mod rule;

/// Bridge traits between in-memory records and the engine.
pub mod record;

/// Discriminator tag registry for open sum types.
pub mod registry;

mod decoder;
mod encoder;
mod mapper;

pub use decoder::Draft;
pub use mapper::{EncodeOptions, Mapper, MapperBuilder};
