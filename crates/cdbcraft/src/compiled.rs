use crate::{
    bits::{self, Container, low_mask},
    errors::{AccessError, DefinitionError},
    field::Field,
    value::Value,
};

/// A [Field] compiled into a fixed-width accessor. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledField {
    pub name: String,
    pub kind: CompiledFieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledFieldKind {
    /// A single bit, read as a boolean.
    Flag { byte: usize, bit: u8 },
    /// An unsigned integer read through a big-endian container.
    Uint(CompiledUint),
}

/// Placement of a numeric field inside its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUint {
    pub container: Container,
    /// First byte of the container. 32/64-bit containers are anchored on the LSB byte,
    /// so this can lie before the field's own MSB byte.
    pub start: usize,
    /// Exclusive upper bit of the field, counted from the container's low bit.
    pub top_bit: u32,
    /// Position of the field's low bit inside the container.
    pub shift: u32,
}

impl CompiledUint {
    /// Width of the field in bits.
    pub fn bits(&self) -> u32 {
        self.top_bit - self.shift
    }

    fn get(&self, data: &[u8]) -> Result<u64, AccessError> {
        let raw = bits::read_be(data, self.start, self.container)?;
        Ok((raw & low_mask(self.top_bit)) >> self.shift)
    }

    fn set(&self, data: &mut [u8], value: u64) -> Result<(), AccessError> {
        if value > low_mask(self.bits()) {
            return Err(AccessError::ValueTooWide {
                value,
                bits: self.bits(),
            });
        }

        let raw = bits::read_be(data, self.start, self.container)?;
        let keep = raw & (!low_mask(self.top_bit) | low_mask(self.shift));
        bits::write_be(data, self.start, self.container, keep | (value << self.shift))
    }
}

impl TryFrom<&Field> for CompiledField {
    type Error = DefinitionError;

    fn try_from(value: &Field) -> Result<Self, Self::Error> {
        if value.name.is_empty() {
            return Err(DefinitionError::EmptyFieldName);
        }

        let (msb, lsb) = value.resolve();
        for bit in [msb.bit, lsb.bit] {
            if bit > 7 {
                return Err(DefinitionError::InvalidBitOffset {
                    field: value.name.clone(),
                    bit,
                });
            }
        }

        if msb == lsb {
            return Ok(CompiledField {
                name: value.name.clone(),
                kind: CompiledFieldKind::Flag {
                    byte: msb.byte,
                    bit: msb.bit,
                },
            });
        }

        if lsb.byte < msb.byte || (lsb.byte == msb.byte && msb.bit < lsb.bit) {
            return Err(DefinitionError::MsbAfterLsb {
                field: value.name.clone(),
            });
        }

        let end = lsb.byte.checked_add(1).ok_or_else(|| DefinitionError::ByteOffsetOverflow {
            field: value.name.clone(),
            byte: lsb.byte,
        })?;

        let size = end - msb.byte;
        let container = Container::for_span(size).ok_or_else(|| {
            DefinitionError::UnsupportedWidth {
                field: value.name.clone(),
                bytes: size,
            }
        })?;

        let start = end.checked_sub(container.bytes()).ok_or_else(|| {
            DefinitionError::ContainerUnderflow {
                field: value.name.clone(),
                end: lsb.byte,
                container: container.bytes(),
            }
        })?;

        Ok(CompiledField {
            name: value.name.clone(),
            kind: CompiledFieldKind::Uint(CompiledUint {
                container,
                start,
                top_bit: msb.bit as u32 + (size as u32 - 1) * 8 + 1,
                shift: lsb.bit as u32,
            }),
        })
    }
}

impl CompiledField {
    /// Compiles `field`, reporting bad layouts as [DefinitionError]s.
    pub fn compile(field: &Field) -> Result<Self, DefinitionError> {
        field.try_into()
    }

    /// An 8-bit field covering all of `byte`. Cannot fail.
    pub fn whole_byte(name: impl Into<String>, byte: usize) -> Self {
        CompiledField {
            name: name.into(),
            kind: CompiledFieldKind::Uint(CompiledUint {
                container: Container::U8,
                start: byte,
                top_bit: 8,
                shift: 0,
            }),
        }
    }

    /// Reads the field from `data`.
    pub fn get(&self, data: &[u8]) -> Result<Value, AccessError> {
        match &self.kind {
            CompiledFieldKind::Flag { byte, bit } => {
                Ok(Value::Bool(bits::read_bit(data, *byte, *bit)?))
            }
            CompiledFieldKind::Uint(uint) => Ok(Value::U64(uint.get(data)?)),
        }
    }

    /// Writes `value` into `data`, preserving every bit outside the field.
    ///
    /// Fails without touching `data` if the CDB is too short or the value is too wide.
    pub fn set(&self, data: &mut [u8], value: impl Into<Value>) -> Result<(), AccessError> {
        let value = value.into();

        match &self.kind {
            CompiledFieldKind::Flag { byte, bit } => {
                let on = match value {
                    Value::Bool(b) => b,
                    Value::U64(0) => false,
                    Value::U64(1) => true,
                    Value::U64(v) => return Err(AccessError::ValueTooWide { value: v, bits: 1 }),
                };
                bits::write_bit(data, *byte, *bit, on)
            }
            CompiledFieldKind::Uint(uint) => uint.set(data, value.as_u64()),
        }
    }

    /// Number of bytes a CDB must have for this field to be accessible.
    ///
    /// Saturates at `usize::MAX` for offsets no CDB can reach.
    pub fn needed_len(&self) -> usize {
        match &self.kind {
            CompiledFieldKind::Flag { byte, .. } => byte.saturating_add(1),
            CompiledFieldKind::Uint(uint) => uint.start.saturating_add(uint.container.bytes()),
        }
    }

    /// Width of the field in bits.
    pub fn bits(&self) -> u32 {
        match &self.kind {
            CompiledFieldKind::Flag { .. } => 1,
            CompiledFieldKind::Uint(uint) => uint.bits(),
        }
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.kind, CompiledFieldKind::Flag { .. })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::field::{Field, Pos};

    use super::*;

    fn compile(field: Field) -> CompiledField {
        CompiledField::compile(&field).unwrap()
    }

    #[test]
    fn test_flag() {
        let evpd = compile(Field::flag("evpd", 1, 0));
        let mut data = [0x12, 0b1111_1110, 0x80, 0, 0xff, 0];

        assert_eq!(evpd.get(&data).unwrap(), Value::Bool(false));
        evpd.set(&mut data, true).unwrap();
        assert_eq!(data[1], 0xff);
        assert_eq!(evpd.get(&data).unwrap(), Value::Bool(true));
        evpd.set(&mut data, 0u8).unwrap();
        assert_eq!(data[1], 0b1111_1110);
    }

    #[test]
    fn test_flag_rejects_wide_value() {
        let flag = compile(Field::flag("fua", 1, 3));
        let mut data = [0u8; 2];
        assert_eq!(
            flag.set(&mut data, 2u8).unwrap_err(),
            AccessError::ValueTooWide { value: 2, bits: 1 }
        );
        assert_eq!(data, [0, 0]);
    }

    #[test]
    fn test_byte_field() {
        let allocation_length = compile(Field::byte("allocation_length", 4));
        let data = [0x12, 0, 0, 0, 0x24, 0];
        assert_eq!(allocation_length.get(&data).unwrap(), Value::U64(0x24));
        assert_eq!(allocation_length.bits(), 8);
    }

    #[test]
    fn test_whole_byte_matches_compiled_byte() {
        assert_eq!(
            CompiledField::whole_byte("opcode", 0),
            compile(Field::byte("opcode", 0))
        );
    }

    #[test]
    fn test_sub_byte_field() {
        let pc = compile(Field::bits("pc", (2, 7), (2, 6)));
        let page_code = compile(Field::bits("page_code", (2, 5), (2, 0)));
        let mut data = [0x1a, 0, 0b10_111111, 0, 0, 0];

        assert_eq!(pc.get(&data).unwrap(), Value::U64(0b10));
        assert_eq!(page_code.get(&data).unwrap(), Value::U64(0x3f));

        pc.set(&mut data, 0b01u8).unwrap();
        assert_eq!(data[2], 0b01_111111);
        page_code.set(&mut data, 0x08u8).unwrap();
        assert_eq!(data[2], 0b01_001000);
    }

    #[test]
    fn test_two_byte_field() {
        let transfer_length = compile(Field::bytes("transfer_length", 7, 8));
        let mut data = [0x28, 0, 0, 0, 0, 0, 0, 0x01, 0x02, 0];

        assert_eq!(transfer_length.get(&data).unwrap(), Value::U64(0x0102));
        transfer_length.set(&mut data, 0xbeefu16).unwrap();
        assert_eq!(&data[7..9], &[0xbe, 0xef]);
        assert_eq!(data[6], 0);
        assert_eq!(data[9], 0);
    }

    #[test]
    fn test_two_byte_partial_field_is_masked() {
        // 12 bits: low nibble of byte 2 plus byte 3.
        let field = compile(Field::bits("x", (2, 3), (3, 0)));
        let mut data = [0xff; 4];

        assert_eq!(field.get(&data).unwrap(), Value::U64(0xfff));
        field.set(&mut data, 0x123u16).unwrap();
        assert_eq!(data, [0xff, 0xff, 0xf1, 0x23]);
    }

    #[test]
    fn test_three_byte_field_uses_tail_anchored_container() {
        // READ(6) LBA: bits 4..0 of byte 1 through byte 3.
        let lba = compile(Field::new("lba", Pos::Bit(1, 4), Some(Pos::Byte(3))));
        let CompiledFieldKind::Uint(uint) = &lba.kind else {
            panic!("expected numeric field");
        };
        assert_eq!(uint.container, Container::U32);
        assert_eq!(uint.start, 0);
        assert_eq!(lba.bits(), 21);

        let mut data = [0x08, 0xe1, 0x23, 0x45, 0x08, 0x00];
        assert_eq!(lba.get(&data).unwrap(), Value::U64(0x012345));

        lba.set(&mut data, 0x1f_ffffu32).unwrap();
        assert_eq!(data, [0x08, 0xff, 0xff, 0xff, 0x08, 0x00]);
    }

    #[test]
    fn test_eight_byte_field() {
        let lba = compile(Field::bytes("lba", 2, 9));
        let mut data = [0u8; 16];
        data[0] = 0x88;

        lba.set(&mut data, 0x0102_0304_0506_0708u64).unwrap();
        assert_eq!(&data[2..10], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(data[0], 0x88);
        assert_eq!(lba.get(&data).unwrap(), Value::U64(0x0102_0304_0506_0708));
    }

    #[test]
    fn test_value_too_wide() {
        let field = compile(Field::bits("service_action", (1, 4), (1, 0)));
        let mut data = [0x9e, 0xe0];
        assert_eq!(
            field.set(&mut data, 0x20u8).unwrap_err(),
            AccessError::ValueTooWide { value: 0x20, bits: 5 }
        );
        assert_eq!(data, [0x9e, 0xe0]);
    }

    #[test]
    fn test_out_of_bounds() {
        let field = compile(Field::bytes("allocation_length", 10, 13));
        let mut data = [0u8; 10];

        assert_eq!(
            field.get(&data).unwrap_err(),
            AccessError::OutOfBounds { needed: 14, len: 10 }
        );
        assert!(field.set(&mut data, 1u8).is_err());
        assert_eq!(data, [0u8; 10]);
        assert_eq!(field.needed_len(), 14);
    }

    #[test]
    fn test_msb_after_lsb() {
        let err = CompiledField::compile(&Field::bytes("x", 5, 2)).unwrap_err();
        assert_eq!(err, DefinitionError::MsbAfterLsb { field: "x".into() });

        let err = CompiledField::compile(&Field::bits("y", (1, 2), (1, 5))).unwrap_err();
        assert_eq!(err, DefinitionError::MsbAfterLsb { field: "y".into() });
    }

    #[test]
    fn test_unsupported_width() {
        let err = CompiledField::compile(&Field::bytes("x", 0, 8)).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::UnsupportedWidth {
                field: "x".into(),
                bytes: 9
            }
        );
    }

    #[test]
    fn test_container_underflow() {
        let err = CompiledField::compile(&Field::bytes("x", 0, 2)).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::ContainerUnderflow {
                field: "x".into(),
                end: 2,
                container: 4
            }
        );
    }

    #[test]
    fn test_invalid_bit_offset() {
        let err = CompiledField::compile(&Field::flag("x", 0, 8)).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::InvalidBitOffset {
                field: "x".into(),
                bit: 8
            }
        );
    }

    #[test]
    fn test_byte_offset_overflow() {
        let err = CompiledField::compile(&Field::byte("x", usize::MAX)).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::ByteOffsetOverflow {
                field: "x".into(),
                byte: usize::MAX
            }
        );

        let err = CompiledField::compile(&Field::bytes("y", usize::MAX - 1, usize::MAX));
        assert!(matches!(err, Err(DefinitionError::ByteOffsetOverflow { .. })));
    }

    #[test]
    fn test_far_flag_is_out_of_bounds() {
        let flag = compile(Field::flag("x", usize::MAX, 0));
        let mut data = [0u8; 6];

        assert_eq!(flag.needed_len(), usize::MAX);
        assert_eq!(
            flag.get(&data).unwrap_err(),
            AccessError::OutOfBounds {
                needed: usize::MAX,
                len: 6
            }
        );
        assert!(flag.set(&mut data, true).is_err());
        assert_eq!(data, [0u8; 6]);
    }

    #[test]
    fn test_empty_name() {
        let err = CompiledField::compile(&Field::byte("", 0)).unwrap_err();
        assert_eq!(err, DefinitionError::EmptyFieldName);
    }

    proptest! {
        #[test]
        fn prop_round_trip_u8(v in any::<u8>(), fill in any::<[u8; 4]>()) {
            let field = compile(Field::byte("x", 2));
            let mut data = fill;
            field.set(&mut data, v).unwrap();
            prop_assert_eq!(field.get(&data).unwrap(), Value::U64(v as u64));
            prop_assert_eq!(data[1], fill[1]);
            prop_assert_eq!(data[3], fill[3]);
        }

        #[test]
        fn prop_round_trip_u16(v in any::<u16>(), fill in any::<[u8; 6]>()) {
            let field = compile(Field::bytes("x", 3, 4));
            let mut data = fill;
            field.set(&mut data, v).unwrap();
            prop_assert_eq!(field.get(&data).unwrap(), Value::U64(v as u64));
            prop_assert_eq!(&data[..3], &fill[..3]);
            prop_assert_eq!(data[5], fill[5]);
        }

        #[test]
        fn prop_round_trip_u32(v in any::<u32>(), fill in any::<[u8; 10]>()) {
            let field = compile(Field::bytes("x", 6, 9));
            let mut data = fill;
            field.set(&mut data, v).unwrap();
            prop_assert_eq!(field.get(&data).unwrap(), Value::U64(v as u64));
            prop_assert_eq!(&data[..6], &fill[..6]);
        }

        #[test]
        fn prop_round_trip_u64(v in any::<u64>(), fill in any::<[u8; 16]>()) {
            let field = compile(Field::bytes("x", 2, 9));
            let mut data = fill;
            field.set(&mut data, v).unwrap();
            prop_assert_eq!(field.get(&data).unwrap(), Value::U64(v));
            prop_assert_eq!(&data[..2], &fill[..2]);
            prop_assert_eq!(&data[10..], &fill[10..]);
        }

        #[test]
        fn prop_flag_set_then_clear_restores_other_bits(byte in any::<u8>(), bit in 0u8..8) {
            let field = compile(Field::flag("x", 0, bit));
            let mut data = [byte];
            field.set(&mut data, true).unwrap();
            prop_assert_eq!(data[0], byte | (1 << bit));
            field.set(&mut data, false).unwrap();
            prop_assert_eq!(data[0], byte & !(1 << bit));
        }

        #[test]
        fn prop_sub_byte_write_is_isolated(byte in any::<u8>(), v in 0u8..8) {
            let field = compile(Field::bits("x", (0, 6), (0, 4)));
            let mut data = [byte];
            field.set(&mut data, v).unwrap();
            prop_assert_eq!(data[0] & 0b1000_1111, byte & 0b1000_1111);
            prop_assert_eq!(field.get(&data).unwrap(), Value::U64(v as u64));
        }

        #[test]
        fn prop_tail_anchored_write_is_isolated(v in 0u32..(1 << 21), fill in any::<[u8; 6]>()) {
            let field = compile(Field::new("lba", Pos::Bit(1, 4), Some(Pos::Byte(3))));
            let mut data = fill;
            field.set(&mut data, v).unwrap();
            prop_assert_eq!(field.get(&data).unwrap(), Value::U64(v as u64));
            prop_assert_eq!(data[0], fill[0]);
            prop_assert_eq!(data[1] & 0b1110_0000, fill[1] & 0b1110_0000);
            prop_assert_eq!(&data[4..], &fill[4..]);
        }
    }
}
