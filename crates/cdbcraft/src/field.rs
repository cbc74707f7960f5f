//! Declarative description of a named field inside a CDB.

/// One boundary of a field, as written in T10 CDB tables.
///
/// A bare byte means bit 7 when used as the MSB and bit 0 when used as the LSB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    Byte(usize),
    Bit(usize, u8),
}

/// A resolved (byte, bit) position; bit 7 is the high bit of the byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BitPos {
    pub byte: usize,
    pub bit: u8,
}

impl BitPos {
    pub fn new(byte: usize, bit: u8) -> Self {
        BitPos { byte, bit }
    }
}

/// A named bit range of a CDB, bounded by its most and least significant bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Name used for lookups and registry conditions.
    pub name: String,
    /// Most significant bit of the field.
    pub msb: Pos,
    /// Least significant bit of the field; `None` reuses `msb`.
    pub lsb: Option<Pos>,
}

impl Field {
    pub fn new(name: impl Into<String>, msb: Pos, lsb: Option<Pos>) -> Self {
        Field {
            name: name.into(),
            msb,
            lsb,
        }
    }

    /// A whole byte.
    pub fn byte(name: impl Into<String>, byte: usize) -> Self {
        Field::new(name, Pos::Byte(byte), None)
    }

    /// Whole bytes `msb..=lsb`, most significant first.
    pub fn bytes(name: impl Into<String>, msb: usize, lsb: usize) -> Self {
        Field::new(name, Pos::Byte(msb), Some(Pos::Byte(lsb)))
    }

    /// An arbitrary bit range given as (byte, bit) pairs.
    pub fn bits(name: impl Into<String>, msb: (usize, u8), lsb: (usize, u8)) -> Self {
        Field::new(name, Pos::Bit(msb.0, msb.1), Some(Pos::Bit(lsb.0, lsb.1)))
    }

    /// A single-bit flag.
    pub fn flag(name: impl Into<String>, byte: usize, bit: u8) -> Self {
        Field::new(name, Pos::Bit(byte, bit), None)
    }

    /// Resolves both boundaries to explicit (byte, bit) positions.
    ///
    /// An omitted LSB copies the MSB *before* bare bytes are expanded, so
    /// `Field::byte("x", 4)` spans bits 7..0 of byte 4 rather than a single bit.
    pub fn resolve(&self) -> (BitPos, BitPos) {
        let lsb = self.lsb.unwrap_or(self.msb);

        let msb = match self.msb {
            Pos::Byte(byte) => BitPos::new(byte, 7),
            Pos::Bit(byte, bit) => BitPos::new(byte, bit),
        };
        let lsb = match lsb {
            Pos::Byte(byte) => BitPos::new(byte, 0),
            Pos::Bit(byte, bit) => BitPos::new(byte, bit),
        };

        (msb, lsb)
    }
}

#[cfg(feature = "serde")]
impl From<crate::serde::PosDef> for Pos {
    fn from(value: crate::serde::PosDef) -> Self {
        match value {
            crate::serde::PosDef::Byte(byte) => Pos::Byte(byte),
            crate::serde::PosDef::Bit((byte, bit)) => Pos::Bit(byte, bit),
        }
    }
}

#[cfg(feature = "serde")]
impl From<crate::serde::FieldDef> for Field {
    fn from(value: crate::serde::FieldDef) -> Self {
        Field {
            name: value.name,
            msb: value.msb.into(),
            lsb: value.lsb.map(Into::into),
        }
    }
}
