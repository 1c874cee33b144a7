//! Canonical value objects for agent time.
//!
//! # Responsibility
//! - Define the data shapes shared by the hierarchy, engine, adaptive and
//!   scheduler layers.
//! - Keep every temporal value immutable once constructed.
//!
//! # Invariants
//! - A `Timepoint` is always in canonical form and always carries the
//!   binding of the hierarchy revision that produced it.
//! - A `Duration` stores raw components verbatim; it is interpreted only
//!   when an engine operation consumes it.

pub mod timepoint;
pub mod unit;
