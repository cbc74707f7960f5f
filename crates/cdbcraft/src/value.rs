//! Values read from and written to CDB fields.

use std::fmt;

/// A value produced by reading a field from a CDB.
///
/// Single-bit fields read as [Value::Bool], every wider field as [Value::U64].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Bool(bool),
    U64(u64),
}

impl Value {
    /// Numeric view of the value; booleans map to 0 and 1.
    pub fn as_u64(self) -> u64 {
        match self {
            Value::Bool(b) => b as u64,
            Value::U64(v) => v,
        }
    }

    /// Truthiness of the value; any non-zero number is `true`.
    pub fn as_bool(self) -> bool {
        match self {
            Value::Bool(b) => b,
            Value::U64(v) => v != 0,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::U64(v) => write!(f, "{v:#x}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_uint {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::U64(value as u64)
                }
            }
        )*
    };
}

impl_from_uint!(u8, u16, u32, u64);
