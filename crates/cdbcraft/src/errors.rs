//! Error types for field definition, field access, CDB construction and registry setup.

use thiserror::Error;

use crate::registry::TypeId;

/// Errors produced when compiling a [crate::field::Field] or building a
/// [crate::registry::Registry].
///
/// These are configuration errors: they surface once, at definition time, never per access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// A bit offset outside 0..=7.
    #[error("field `{field}`: bit offset {bit} is out of range 0..=7")]
    InvalidBitOffset { field: String, bit: u8 },
    /// The MSB position lies after the LSB position.
    #[error("field `{field}`: MSB must be prior of LSB")]
    MsbAfterLsb { field: String },
    /// The field spans more than 8 bytes.
    #[error("field `{field}`: {bytes} bytes wide, more than 64 bits is not supported")]
    UnsupportedWidth { field: String, bytes: usize },
    /// A tail-anchored 32/64-bit container would start before byte 0.
    #[error(
        "field `{field}`: {container}-byte container ending at byte {end} starts before the CDB"
    )]
    ContainerUnderflow {
        field: String,
        end: usize,
        container: usize,
    },
    /// A byte offset so large that the field's end cannot be addressed.
    #[error("field `{field}`: byte offset {byte} is too large")]
    ByteOffsetOverflow { field: String, byte: usize },
    /// Field name is empty.
    #[error("field name must not be empty")]
    EmptyFieldName,
    /// Same field name declared twice in one type definition.
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
    /// Type name is empty or already taken.
    #[error("command type name `{0}` is empty or already defined")]
    DuplicateTypeName(String),
    /// A condition names a field that the registering type does not have.
    #[error("command type `{ty}` has no field `{field}`")]
    UnknownField { ty: String, field: String },
    /// A condition accepts no values at all.
    #[error("condition on field `{0}` accepts no values")]
    EmptyCondition(String),
    /// A [TypeId] that does not belong to this registry.
    #[error("unknown command type id {0:?}")]
    UnknownType(TypeId),
    /// A type name that does not exist in this registry.
    #[error("unknown command type `{0}`")]
    UnknownTypeName(String),
    /// A type registered beneath itself.
    #[error("command type `{0}` cannot refine into itself")]
    SelfReference(String),
    /// A type registered beneath one of its own descendants.
    #[error("registering `{target}` under `{under}` would create a refinement cycle")]
    Cycle { under: String, target: String },
    /// A type is already a refinement of another type.
    #[error("command type `{target}` is already registered under `{parent}`")]
    AlreadyRegistered { target: String, parent: String },
}

/// Errors produced when reading or writing a field on a CDB.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The field's container needs more bytes than the CDB has.
    #[error("field needs {needed} bytes but the CDB is {len} bytes long")]
    OutOfBounds { needed: usize, len: usize },
    /// The value does not fit in the field's bit width.
    #[error("value {value:#x} does not fit in a {bits}-bit field")]
    ValueTooWide { value: u64, bits: u32 },
    /// The command's type has no field with this name.
    #[error("no field named `{0}`")]
    UnknownField(String),
}

/// Errors produced when building a [crate::cdb::Cdb] or a [crate::command::Command] from
/// raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CdbError {
    /// No bytes at all; there is no opcode.
    #[error("CDB is empty")]
    Empty,
    /// A variable-length CDB too short to hold its additional length byte.
    #[error("variable-length CDB needs at least {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
    /// The length resolver has no length for this opcode.
    #[error("no CDB length known for opcode {0:#04x}")]
    UnknownLength(u8),
    /// The requested command type does not belong to the registry.
    #[error("unknown command type id {0:?}")]
    UnknownType(TypeId),
}
