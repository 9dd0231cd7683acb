//! Foundation types for the revstore codec.
//!
//! This crate provides the identifier value types used throughout the
//! revision-store file format. They are plain, freely copyable values with
//! fixed wire layouts; cursor-based decoding with bounds checking lives in
//! `revstore-fnd`.
//!
//! # Key Types
//!
//! - [`Guid`] — 16-byte globally unique identifier, little-endian field order
//!   on the wire
//! - [`ExGuid`] — extended identifier: a 32-bit space index plus either a
//!   32-bit counter or a full [`Guid`]
//! - [`CompactId`] — table-indexed identifier: a 16-bit global-table index
//!   plus a 48-bit counter, packed into 8 bytes

pub mod compact;
pub mod error;
pub mod exguid;
pub mod guid;

pub use compact::CompactId;
pub use error::TypeError;
pub use exguid::{ExGuid, ExGuidForm, ExGuidPayload};
pub use guid::Guid;
