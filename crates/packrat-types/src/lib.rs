//! Foundation types for Packrat.
//!
//! Packrat stores loosely-typed JSON records ("items") keyed by an id that is
//! either a string or a finite integer. This crate defines those values and
//! the line format used by the transaction log and snapshots. Every other
//! Packrat crate depends on `packrat-types`.
//!
//! # Key Types
//!
//! - [`Id`] -- string or integer item identifier
//! - [`Item`] -- an admitted record: its [`Id`] plus a [`Body`]
//! - [`Candidate`] -- validated input that has not been assigned an id yet
//! - [`Record`] -- one line of the log: a full item or a tombstone
//!
//! # Validation
//!
//! [`is_invalid_item`] and [`is_invalid_id`] are total predicates over raw
//! JSON. [`Candidate::from_value`] applies both and produces the typed form.

pub mod error;
pub mod id;
pub mod item;
pub mod record;
pub mod validate;

pub use error::TypeError;
pub use id::Id;
pub use item::{Body, Candidate, Item};
pub use record::{Record, DELETED_FIELD, ELEMENTS_FIELD, FIELDS_FIELD, ID_FIELD};
pub use validate::{is_invalid_id, is_invalid_item};
