//! Low-level bit and big-endian container access on byte slices.
//!
//! Bits are addressed the way T10 tables do: bit 7 is the high bit of a byte,
//! bit 0 the low bit. Multi-byte containers are stored most-significant byte first.

use crate::errors::AccessError;

/// Width of the integer a numeric field is read through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    U8,
    U16,
    U32,
    U64,
}

impl Container {
    /// Smallest container holding a field that spans `size` bytes, if any.
    pub fn for_span(size: usize) -> Option<Self> {
        match size {
            1 => Some(Container::U8),
            2 => Some(Container::U16),
            3..=4 => Some(Container::U32),
            5..=8 => Some(Container::U64),
            _ => None,
        }
    }

    /// Number of bytes the container occupies on the wire.
    pub fn bytes(self) -> usize {
        match self {
            Container::U8 => 1,
            Container::U16 => 2,
            Container::U32 => 4,
            Container::U64 => 8,
        }
    }
}

/// Checks that `data` holds `count` bytes starting at `start`.
fn check_span(data: &[u8], start: usize, count: usize) -> Result<(), AccessError> {
    match start.checked_add(count) {
        Some(needed) if needed <= data.len() => Ok(()),
        needed => Err(AccessError::OutOfBounds {
            needed: needed.unwrap_or(usize::MAX),
            len: data.len(),
        }),
    }
}

/// Reads bit `bit` (0 = LSB) of byte `byte`.
pub fn read_bit(data: &[u8], byte: usize, bit: u8) -> Result<bool, AccessError> {
    check_span(data, byte, 1)?;
    Ok(data[byte] & (1 << bit) != 0)
}

/// Sets or clears bit `bit` of byte `byte`, leaving the other seven bits alone.
pub fn write_bit(data: &mut [u8], byte: usize, bit: u8, on: bool) -> Result<(), AccessError> {
    check_span(data, byte, 1)?;

    if on {
        data[byte] |= 1 << bit;
    } else {
        data[byte] &= !(1 << bit);
    }

    Ok(())
}

/// Reads a big-endian container starting at byte `start` into host order.
pub fn read_be(data: &[u8], start: usize, container: Container) -> Result<u64, AccessError> {
    check_span(data, start, container.bytes())?;

    let raw = &data[start..start + container.bytes()];
    let value = match container {
        Container::U8 => raw[0] as u64,
        Container::U16 => u16::from_be_bytes([raw[0], raw[1]]) as u64,
        Container::U32 => u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as u64,
        Container::U64 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            u64::from_be_bytes(buf)
        }
    };

    Ok(value)
}

/// Writes the low bits of `value` as a big-endian container starting at byte `start`.
pub fn write_be(
    data: &mut [u8],
    start: usize,
    container: Container,
    value: u64,
) -> Result<(), AccessError> {
    check_span(data, start, container.bytes())?;

    let out = &mut data[start..start + container.bytes()];
    match container {
        Container::U8 => out[0] = value as u8,
        Container::U16 => out.copy_from_slice(&(value as u16).to_be_bytes()),
        Container::U32 => out.copy_from_slice(&(value as u32).to_be_bytes()),
        Container::U64 => out.copy_from_slice(&value.to_be_bytes()),
    }

    Ok(())
}

/// Mask of the low `bits` bits; saturates at 64.
pub fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bit() {
        let data = [0b1000_0001];
        assert!(read_bit(&data, 0, 7).unwrap());
        assert!(read_bit(&data, 0, 0).unwrap());
        assert!(!read_bit(&data, 0, 3).unwrap());
    }

    #[test]
    fn test_write_bit() {
        let mut data = [0b1010_1010];
        write_bit(&mut data, 0, 0, true).unwrap();
        assert_eq!(data[0], 0b1010_1011);
        write_bit(&mut data, 0, 7, false).unwrap();
        assert_eq!(data[0], 0b0010_1011);
    }

    #[test]
    fn test_read_bit_out_of_bounds() {
        let data = [0xff];
        assert_eq!(
            read_bit(&data, 1, 0).unwrap_err(),
            AccessError::OutOfBounds { needed: 2, len: 1 }
        );
    }

    #[test]
    fn test_offset_overflow_is_out_of_bounds() {
        let mut data = [0u8; 6];
        assert_eq!(
            read_bit(&data, usize::MAX, 0).unwrap_err(),
            AccessError::OutOfBounds {
                needed: usize::MAX,
                len: 6
            }
        );
        assert_eq!(
            write_be(&mut data, usize::MAX - 1, Container::U32, 0).unwrap_err(),
            AccessError::OutOfBounds {
                needed: usize::MAX,
                len: 6
            }
        );
        assert_eq!(data, [0u8; 6]);
    }

    #[test]
    fn test_read_be() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(read_be(&data, 1, Container::U8).unwrap(), 0x02);
        assert_eq!(read_be(&data, 0, Container::U16).unwrap(), 0x0102);
        assert_eq!(read_be(&data, 4, Container::U32).unwrap(), 0x05060708);
        assert_eq!(read_be(&data, 0, Container::U64).unwrap(), 0x0102030405060708);
    }

    #[test]
    fn test_write_be() {
        let mut data = [0u8; 8];
        write_be(&mut data, 2, Container::U32, 0xdeadbeef).unwrap();
        assert_eq!(data, [0, 0, 0xde, 0xad, 0xbe, 0xef, 0, 0]);
    }

    #[test]
    fn test_read_be_out_of_bounds() {
        let data = [0u8; 6];
        assert_eq!(
            read_be(&data, 3, Container::U32).unwrap_err(),
            AccessError::OutOfBounds { needed: 7, len: 6 }
        );
    }

    #[test]
    fn test_write_be_out_of_bounds_leaves_buffer() {
        let mut data = [0xaa; 3];
        assert!(write_be(&mut data, 0, Container::U32, 0).is_err());
        assert_eq!(data, [0xaa; 3]);
    }

    #[test]
    fn test_for_span() {
        assert_eq!(Container::for_span(3), Some(Container::U32));
        assert_eq!(Container::for_span(5), Some(Container::U64));
        assert_eq!(Container::for_span(9), None);
        assert_eq!(Container::for_span(0), None);
    }

    #[test]
    fn test_low_mask() {
        assert_eq!(low_mask(0), 0);
        assert_eq!(low_mask(5), 0b11111);
        assert_eq!(low_mask(64), u64::MAX);
    }
}
