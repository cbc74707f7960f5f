//! The owned CDB byte buffer and the rule that decides its length.

use std::fmt;

use tracing::debug;

use crate::{errors::CdbError, resolve::LengthResolver};

/// Opcodes at or above this value (groups 6 and 7) are vendor specific.
pub const VENDOR_SPECIFIC_MIN: u8 = 0xc0;
/// Opcode of a variable-length CDB.
pub const VARIABLE_LENGTH: u8 = 0x7f;
/// Fixed header of a variable-length CDB, not counted by its additional length byte.
pub const VARIABLE_LENGTH_HEADER: usize = 8;
/// Offset of the additional CDB length byte in a variable-length CDB.
const ADDITIONAL_LENGTH_OFFSET: usize = 7;

/// A command descriptor block. Its length is fixed at construction and never changes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cdb {
    bytes: Box<[u8]>,
}

impl Cdb {
    /// Length a CDB starting like `seq` has, judged from its content alone.
    ///
    /// Vendor specific opcodes take the whole input. Variable-length CDBs carry their
    /// length in byte 7. Everything else asks `lengths`.
    pub fn length_of(seq: &[u8], lengths: &dyn LengthResolver) -> Result<usize, CdbError> {
        let &opcode = seq.first().ok_or(CdbError::Empty)?;

        let len = if opcode >= VENDOR_SPECIFIC_MIN {
            seq.len()
        } else if opcode == VARIABLE_LENGTH {
            let additional = seq.get(ADDITIONAL_LENGTH_OFFSET).ok_or(CdbError::Truncated {
                needed: ADDITIONAL_LENGTH_OFFSET + 1,
                actual: seq.len(),
            })?;
            *additional as usize + VARIABLE_LENGTH_HEADER
        } else {
            lengths.command_size(opcode)
        };

        if len == 0 {
            return Err(CdbError::UnknownLength(opcode));
        }

        Ok(len)
    }

    /// Builds a CDB from `seq`, keeping exactly as many bytes as [Cdb::length_of] says.
    ///
    /// Trailing input is ignored; short input is zero-padded.
    pub fn from_bytes(seq: &[u8], lengths: &dyn LengthResolver) -> Result<Self, CdbError> {
        let len = Self::length_of(seq, lengths)?;

        let mut bytes = vec![0u8; len];
        let copied = len.min(seq.len());
        bytes[..copied].copy_from_slice(&seq[..copied]);

        if seq.len() < len {
            debug!(
                opcode = seq[0],
                len,
                given = seq.len(),
                "zero-padding short CDB"
            );
        }

        Ok(Cdb {
            bytes: bytes.into_boxed_slice(),
        })
    }

    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`: a CDB holds at least its opcode.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl AsRef<[u8]> for Cdb {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Cdb {
    /// Space separated lowercase hex, e.g. `12 00 00 00 24 00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

impl fmt::Debug for Cdb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cdb({self})")
    }
}
