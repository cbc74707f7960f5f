//! # cdbcraft
//!
//! Named bit-field access to SCSI Command Descriptor Blocks, and progressive
//! classification of raw CDBs into a tree of command types.
//!
//! Fields are declared by their most and least significant bit positions and compiled
//! once into big-endian accessors. Command types inherit fields from a base and are
//! registered under a parent with field conditions; classifying a byte sequence walks
//! that tree from the root until no further condition matches.
//!
//! ## Example
//!
//! ```
//! use cdbcraft::field::Field;
//! use cdbcraft::pdt::PeripheralType;
//! use cdbcraft::registry::{Conditions, Registry};
//! use cdbcraft::value::Value;
//!
//! let mut registry = Registry::new();
//! let read10 = registry
//!     .subtype(
//!         registry.root(),
//!         "Read10",
//!         &[
//!             Field::flag("fua", 1, 3),
//!             Field::bytes("lba", 2, 5),
//!             Field::bytes("transfer_length", 7, 8),
//!         ],
//!         Conditions::new().eq("opcode", 0x28),
//!     )
//!     .unwrap();
//!
//! let mut cmd = registry
//!     .classify(&[0x28, 0x08, 0, 0, 0x10, 0, 0, 0, 0x08, 0], PeripheralType::Disk)
//!     .unwrap();
//! assert_eq!(cmd.kind(), read10);
//! assert_eq!(cmd.get("fua").unwrap(), Value::Bool(true));
//! assert_eq!(cmd.get("lba").unwrap(), Value::U64(0x1000));
//!
//! cmd.set("transfer_length", 0x100u16).unwrap();
//! assert_eq!(cmd.bytes()[7..9], [0x01, 0x00]);
//! ```

pub mod bits;
pub mod cdb;
pub mod classify;
pub mod command;
pub mod compiled;
pub mod errors;
pub mod field;
pub mod pdt;
pub mod registry;
pub mod resolve;
#[cfg(feature = "serde")]
pub mod serde;
pub mod value;
