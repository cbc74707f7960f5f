//! # cdbcraft-catalog
//!
//! Command types for the common SPC and SBC commands, ready to classify against.
//!
//! ```
//! use cdbcraft::pdt::PeripheralType;
//! use cdbcraft::value::Value;
//!
//! let registry = cdbcraft_catalog::standard().unwrap();
//! let cmd = registry
//!     .classify(&[0x12, 0x01, 0x80, 0x00, 0xff, 0x00], PeripheralType::Disk)
//!     .unwrap();
//! assert_eq!(cmd.type_name(), "InquiryVpd");
//! assert_eq!(cmd.get("page_code").unwrap(), Value::U64(0x80));
//! ```

use cdbcraft::{
    errors::DefinitionError,
    field::{Field, Pos},
    registry::{Conditions, Registry, TypeId},
};
use tracing::debug;

/// A registry holding every type of this catalog.
pub fn standard() -> Result<Registry, DefinitionError> {
    let mut registry = Registry::new();
    install(&mut registry)?;
    Ok(registry)
}

/// Defines and registers the catalog's types into an existing registry.
///
/// Fails with [DefinitionError::DuplicateTypeName] if a catalog name is already taken.
pub fn install(registry: &mut Registry) -> Result<(), DefinitionError> {
    let before = registry.len();

    primary(registry)?;
    block_io(registry)?;
    mode_and_power(registry)?;
    service_action_in(registry)?;
    maintenance_in(registry)?;
    variable_length(registry)?;

    debug!(types = registry.len() - before, "installed standard catalog");
    Ok(())
}

/// A type reached from the root by its opcode alone.
fn by_opcode(
    registry: &mut Registry,
    name: &str,
    opcode: u8,
    fields: &[Field],
) -> Result<TypeId, DefinitionError> {
    let root = registry.root();
    registry.subtype(root, name, fields, Conditions::new().eq("opcode", opcode.into()))
}

/// A type reached from `parent` by its service action.
fn by_service_action(
    registry: &mut Registry,
    parent: TypeId,
    name: &str,
    action: u16,
    fields: &[Field],
) -> Result<TypeId, DefinitionError> {
    registry.subtype(
        parent,
        name,
        fields,
        Conditions::new().eq("service_action", action.into()),
    )
}

fn primary(registry: &mut Registry) -> Result<(), DefinitionError> {
    by_opcode(registry, "TestUnitReady", 0x00, &[])?;
    by_opcode(
        registry,
        "RequestSense",
        0x03,
        &[Field::flag("desc", 1, 0), Field::byte("allocation_length", 4)],
    )?;

    let inquiry = by_opcode(
        registry,
        "Inquiry",
        0x12,
        &[
            Field::flag("evpd", 1, 0),
            Field::byte("page_code", 2),
            Field::bytes("allocation_length", 3, 4),
        ],
    )?;
    registry.subtype(inquiry, "InquiryVpd", &[], Conditions::new().eq("evpd", 1))?;

    by_opcode(
        registry,
        "ReportLuns",
        0xa0,
        &[
            Field::byte("select_report", 2),
            Field::bytes("allocation_length", 6, 9),
        ],
    )?;

    Ok(())
}

fn block_io(registry: &mut Registry) -> Result<(), DefinitionError> {
    let rw6 = [
        Field::new("lba", Pos::Bit(1, 4), Some(Pos::Byte(3))),
        Field::byte("transfer_length", 4),
    ];
    by_opcode(registry, "Read6", 0x08, &rw6)?;
    by_opcode(registry, "Write6", 0x0a, &rw6)?;

    let rw10 = [
        Field::flag("dpo", 1, 4),
        Field::flag("fua", 1, 3),
        Field::bytes("lba", 2, 5),
        Field::bytes("transfer_length", 7, 8),
    ];
    by_opcode(registry, "Read10", 0x28, &rw10)?;
    by_opcode(registry, "Write10", 0x2a, &rw10)?;

    let rw12 = [
        Field::flag("dpo", 1, 4),
        Field::flag("fua", 1, 3),
        Field::bytes("lba", 2, 5),
        Field::bytes("transfer_length", 6, 9),
    ];
    by_opcode(registry, "Read12", 0xa8, &rw12)?;
    by_opcode(registry, "Write12", 0xaa, &rw12)?;

    let rw16 = [
        Field::flag("dpo", 1, 4),
        Field::flag("fua", 1, 3),
        Field::bytes("lba", 2, 9),
        Field::bytes("transfer_length", 10, 13),
    ];
    by_opcode(registry, "Read16", 0x88, &rw16)?;
    by_opcode(registry, "Write16", 0x8a, &rw16)?;

    by_opcode(
        registry,
        "ReadCapacity10",
        0x25,
        &[Field::bytes("lba", 2, 5), Field::flag("pmi", 8, 0)],
    )?;
    by_opcode(
        registry,
        "SynchronizeCache10",
        0x35,
        &[
            Field::flag("immed", 1, 1),
            Field::bytes("lba", 2, 5),
            Field::bytes("number_of_blocks", 7, 8),
        ],
    )?;
    by_opcode(
        registry,
        "Unmap",
        0x42,
        &[
            Field::flag("anchor", 1, 0),
            Field::bits("group_number", (6, 4), (6, 0)),
            Field::bytes("parameter_list_length", 7, 8),
        ],
    )?;

    Ok(())
}

fn mode_and_power(registry: &mut Registry) -> Result<(), DefinitionError> {
    by_opcode(
        registry,
        "ModeSense6",
        0x1a,
        &[
            Field::flag("dbd", 1, 3),
            Field::bits("pc", (2, 7), (2, 6)),
            Field::bits("page_code", (2, 5), (2, 0)),
            Field::byte("subpage_code", 3),
            Field::byte("allocation_length", 4),
        ],
    )?;
    by_opcode(
        registry,
        "ModeSense10",
        0x5a,
        &[
            Field::flag("llbaa", 1, 4),
            Field::flag("dbd", 1, 3),
            Field::bits("pc", (2, 7), (2, 6)),
            Field::bits("page_code", (2, 5), (2, 0)),
            Field::byte("subpage_code", 3),
            Field::bytes("allocation_length", 7, 8),
        ],
    )?;
    by_opcode(
        registry,
        "StartStopUnit",
        0x1b,
        &[
            Field::flag("immed", 1, 0),
            Field::bits("power_condition", (4, 7), (4, 4)),
            Field::flag("loej", 4, 1),
            Field::flag("start", 4, 0),
        ],
    )?;

    Ok(())
}

fn service_action_in(registry: &mut Registry) -> Result<(), DefinitionError> {
    let sai = by_opcode(
        registry,
        "ServiceActionIn16",
        0x9e,
        &[Field::bits("service_action", (1, 4), (1, 0))],
    )?;

    let lba_and_length = [
        Field::bytes("lba", 2, 9),
        Field::bytes("allocation_length", 10, 13),
    ];
    by_service_action(
        registry,
        sai,
        "ReadCapacity16",
        0x10,
        &[
            lba_and_length[0].clone(),
            lba_and_length[1].clone(),
            Field::flag("pmi", 14, 0),
        ],
    )?;
    by_service_action(registry, sai, "GetLbaStatus", 0x12, &lba_and_length)?;

    Ok(())
}

fn maintenance_in(registry: &mut Registry) -> Result<(), DefinitionError> {
    let maintenance = by_opcode(
        registry,
        "MaintenanceIn",
        0xa3,
        &[
            Field::bits("service_action", (1, 4), (1, 0)),
            Field::bytes("allocation_length", 6, 9),
        ],
    )?;

    by_service_action(registry, maintenance, "ReportTargetPortGroups", 0x0a, &[])?;
    by_service_action(
        registry,
        maintenance,
        "ReportSupportedOpcodes",
        0x0c,
        &[
            Field::flag("rctd", 2, 7),
            Field::bits("reporting_options", (2, 2), (2, 0)),
            Field::byte("requested_opcode", 3),
            Field::bytes("requested_service_action", 4, 5),
        ],
    )?;

    Ok(())
}

fn variable_length(registry: &mut Registry) -> Result<(), DefinitionError> {
    let variable = by_opcode(
        registry,
        "VariableLength",
        0x7f,
        &[
            Field::byte("control", 1),
            Field::byte("additional_cdb_length", 7),
            Field::bytes("service_action", 8, 9),
        ],
    )?;

    let io32 = [
        Field::flag("dpo", 10, 4),
        Field::flag("fua", 10, 3),
        Field::bytes("lba", 12, 19),
        Field::bytes("expected_initial_reference_tag", 20, 23),
        Field::bytes("transfer_length", 28, 31),
    ];
    by_service_action(registry, variable, "Read32", 0x0009, &io32)?;
    by_service_action(registry, variable, "Verify32", 0x000a, &io32)?;
    by_service_action(registry, variable, "Write32", 0x000b, &io32)?;

    Ok(())
}
