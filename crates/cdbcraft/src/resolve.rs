//! Lookups consumed by [crate::cdb::Cdb] and [crate::command::Command]: the standard CDB
//! length of an opcode and a human readable command name.
//!
//! Both are plug points. [StandardTables] covers the common SPC, SBC and SSC opcodes;
//! callers with vendor tables can supply their own implementation.

use crate::pdt::PeripheralType;

/// Standard CDB length for an opcode.
pub trait LengthResolver: Send + Sync {
    /// Length in bytes of a CDB starting with `opcode`; 0 when unknown.
    fn command_size(&self, opcode: u8) -> usize;
}

/// Display name of a command. Diagnostics only; never consulted when classifying.
pub trait NameResolver: Send + Sync {
    fn command_name(&self, cdb: &[u8], pdt: PeripheralType) -> String;
}

impl<F> LengthResolver for F
where
    F: Fn(u8) -> usize + Send + Sync,
{
    fn command_size(&self, opcode: u8) -> usize {
        self(opcode)
    }
}

impl<F> NameResolver for F
where
    F: Fn(&[u8], PeripheralType) -> String + Send + Sync,
{
    fn command_name(&self, cdb: &[u8], pdt: PeripheralType) -> String {
        self(cdb, pdt)
    }
}

/// Built-in opcode tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTables;

/// CDB length by group code (the top three bits of the opcode).
const GROUP_SIZES: [usize; 8] = [6, 10, 10, 12, 16, 12, 10, 10];

impl LengthResolver for StandardTables {
    fn command_size(&self, opcode: u8) -> usize {
        GROUP_SIZES[(opcode >> 5) as usize]
    }
}

impl NameResolver for StandardTables {
    fn command_name(&self, cdb: &[u8], pdt: PeripheralType) -> String {
        let Some(&opcode) = cdb.first() else {
            return String::from("Empty CDB");
        };

        if opcode >= 0xc0 {
            return format!("Vendor specific [{opcode:#04x}]");
        }

        if let Some((group, table)) = service_action_table(opcode) {
            let sa = match opcode {
                0x7f => cdb
                    .get(8..10)
                    .map(|b| u16::from_be_bytes([b[0], b[1]])),
                _ => cdb.get(1).map(|b| (b & 0x1f) as u16),
            };

            return match sa {
                Some(sa) => match table.iter().find(|(code, _)| *code == sa) {
                    Some((_, name)) => (*name).to_string(),
                    None => format!("{group}, service action={sa:#x}"),
                },
                None => group.to_string(),
            };
        }

        let name = match pdt.decay() {
            PeripheralType::Tape => tape_name(opcode).or_else(|| common_name(opcode)),
            _ => common_name(opcode),
        };

        match name {
            Some(name) => name.to_string(),
            None => format!("Opcode={opcode:#04x}"),
        }
    }
}

fn service_action_table(opcode: u8) -> Option<(&'static str, &'static [(u16, &'static str)])> {
    match opcode {
        0x7f => Some(("Variable length", VARIABLE_LENGTH)),
        0x9e => Some(("Service action in(16)", SERVICE_ACTION_IN_16)),
        0xa3 => Some(("Maintenance in", MAINTENANCE_IN)),
        0xa4 => Some(("Maintenance out", MAINTENANCE_OUT)),
        _ => None,
    }
}

const VARIABLE_LENGTH: &[(u16, &str)] = &[
    (0x0009, "Read(32)"),
    (0x000a, "Verify(32)"),
    (0x000b, "Write(32)"),
    (0x000c, "Write and verify(32)"),
    (0x000d, "Write same(32)"),
];

const SERVICE_ACTION_IN_16: &[(u16, &str)] = &[
    (0x10, "Read capacity(16)"),
    (0x11, "Read long(16)"),
    (0x12, "Get LBA status"),
    (0x13, "Report referrals"),
    (0x14, "Stream control"),
    (0x15, "Background control"),
    (0x16, "Get stream status"),
];

const MAINTENANCE_IN: &[(u16, &str)] = &[
    (0x05, "Report identifying information"),
    (0x0a, "Report target port groups"),
    (0x0b, "Report aliases"),
    (0x0c, "Report supported operation codes"),
    (0x0d, "Report supported task management functions"),
    (0x0e, "Report priority"),
    (0x0f, "Report timestamp"),
];

const MAINTENANCE_OUT: &[(u16, &str)] = &[
    (0x06, "Set identifying information"),
    (0x0a, "Set target port groups"),
    (0x0e, "Set priority"),
    (0x0f, "Set timestamp"),
];

fn tape_name(opcode: u8) -> Option<&'static str> {
    Some(match opcode {
        0x01 => "Rewind",
        0x04 => "Format medium",
        0x05 => "Read block limits",
        0x10 => "Write filemarks(6)",
        0x11 => "Space(6)",
        0x19 => "Erase(6)",
        0x1b => "Load unload",
        0x2b => "Locate(10)",
        0x34 => "Read position",
        _ => return None,
    })
}

fn common_name(opcode: u8) -> Option<&'static str> {
    Some(match opcode {
        0x00 => "Test Unit Ready",
        0x01 => "Rezero Unit",
        0x03 => "Request Sense",
        0x04 => "Format unit",
        0x07 => "Reassign blocks",
        0x08 => "Read(6)",
        0x0a => "Write(6)",
        0x0b => "Seek(6)",
        0x12 => "Inquiry",
        0x15 => "Mode select(6)",
        0x16 => "Reserve(6)",
        0x17 => "Release(6)",
        0x1a => "Mode sense(6)",
        0x1b => "Start stop unit",
        0x1c => "Receive diagnostic results",
        0x1d => "Send diagnostic",
        0x1e => "Prevent allow medium removal",
        0x25 => "Read capacity(10)",
        0x28 => "Read(10)",
        0x2a => "Write(10)",
        0x2b => "Seek(10)",
        0x2e => "Write and verify(10)",
        0x2f => "Verify(10)",
        0x34 => "Pre-fetch(10)",
        0x35 => "Synchronize cache(10)",
        0x37 => "Read defect data(10)",
        0x3b => "Write buffer",
        0x3c => "Read buffer",
        0x41 => "Write same(10)",
        0x42 => "Unmap",
        0x4c => "Log select",
        0x4d => "Log sense",
        0x55 => "Mode select(10)",
        0x5a => "Mode sense(10)",
        0x5e => "Persistent reserve in",
        0x5f => "Persistent reserve out",
        0x83 => "Third party copy out",
        0x84 => "Third party copy in",
        0x85 => "ATA pass-through(16)",
        0x86 => "Access control in",
        0x88 => "Read(16)",
        0x89 => "Compare and write",
        0x8a => "Write(16)",
        0x8e => "Write and verify(16)",
        0x8f => "Verify(16)",
        0x91 => "Synchronize cache(16)",
        0x93 => "Write same(16)",
        0x9f => "Service action out(16)",
        0xa0 => "Report luns",
        0xa1 => "ATA pass-through(12)",
        0xa2 => "Security protocol in",
        0xa8 => "Read(12)",
        0xaa => "Write(12)",
        0xb5 => "Security protocol out",
        _ => return None,
    })
}
