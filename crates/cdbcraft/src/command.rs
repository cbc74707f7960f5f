//! A CDB viewed through the field table of one command type.

use std::{collections::BTreeMap, fmt};

use crate::{
    cdb::Cdb,
    compiled::CompiledField,
    errors::AccessError,
    pdt::PeripheralType,
    registry::{CommandType, Registry, TypeId},
    value::Value,
};

/// A CDB together with its current classification.
///
/// Refining a command only swaps its type tag; the bytes stay where they are.
#[derive(Clone)]
pub struct Command<'r> {
    registry: &'r Registry,
    kind: TypeId,
    cdb: Cdb,
    peripheral_type: PeripheralType,
}

impl<'r> Command<'r> {
    pub(crate) fn from_parts(
        registry: &'r Registry,
        kind: TypeId,
        cdb: Cdb,
        peripheral_type: PeripheralType,
    ) -> Self {
        Command {
            registry,
            kind,
            cdb,
            peripheral_type,
        }
    }

    pub(crate) fn retype(&mut self, kind: TypeId) {
        self.kind = kind;
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn kind(&self) -> TypeId {
        self.kind
    }

    pub fn command_type(&self) -> &'r CommandType {
        self.registry.ty(self.kind)
    }

    pub fn type_name(&self) -> &'r str {
        self.command_type().name()
    }

    /// Whether this command is of type `ty` or of a type derived from it.
    pub fn is_a(&self, ty: TypeId) -> bool {
        self.registry.inherits(self.kind, ty)
    }

    pub fn opcode(&self) -> u8 {
        self.cdb.opcode()
    }

    pub fn len(&self) -> usize {
        self.cdb.len()
    }

    /// Always `false`: a CDB holds at least its opcode.
    pub fn is_empty(&self) -> bool {
        self.cdb.is_empty()
    }

    pub fn cdb(&self) -> &Cdb {
        &self.cdb
    }

    pub fn bytes(&self) -> &[u8] {
        self.cdb.as_bytes()
    }

    /// A copy of the CDB bytes, detached from later changes to this command.
    pub fn to_vec(&self) -> Vec<u8> {
        self.cdb.as_bytes().to_vec()
    }

    pub fn peripheral_type(&self) -> PeripheralType {
        self.peripheral_type
    }

    /// Display name from the registry's [crate::resolve::NameResolver].
    pub fn name(&self) -> String {
        self.registry
            .names()
            .command_name(self.cdb.as_bytes(), self.peripheral_type)
    }

    fn field(&self, name: &str) -> Result<&'r CompiledField, AccessError> {
        self.command_type()
            .field(name)
            .ok_or_else(|| AccessError::UnknownField(name.to_string()))
    }

    /// Reads field `name` of this command's type.
    pub fn get(&self, name: &str) -> Result<Value, AccessError> {
        self.field(name)?.get(self.cdb.as_bytes())
    }

    /// Writes field `name` of this command's type.
    ///
    /// The type tag is left alone; call [Command::refine] to reclassify after a change.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), AccessError> {
        let field = self.field(name)?;
        field.set(self.cdb.as_bytes_mut(), value)
    }

    /// Every readable field and its value. Fields reaching past the CDB are left out.
    pub fn fields(&self) -> BTreeMap<&'r str, Value> {
        self.command_type()
            .fields()
            .iter()
            .filter_map(|f| Some((f.name.as_str(), f.get(self.cdb.as_bytes()).ok()?)))
            .collect()
    }

    /// Continues classification from the current type, e.g. after fields were changed.
    pub fn refine(&mut self) {
        crate::classify::Classifier::new(self.registry).refine(self);
    }
}

impl fmt::Display for Command<'_> {
    /// `Inquiry (12 00 00 00 24 00)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.cdb)
    }
}

impl fmt::Debug for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("type", &self.type_name())
            .field("cdb", &self.cdb)
            .field("peripheral_type", &self.peripheral_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{errors::CdbError, field::Field, registry::Conditions};

    use super::*;

    fn inquiry_registry() -> (Registry, TypeId) {
        let mut registry = Registry::new();
        let inquiry = registry
            .subtype(
                registry.root(),
                "Inquiry",
                &[
                    Field::flag("evpd", 1, 0),
                    Field::byte("page_code", 2),
                    Field::bytes("allocation_length", 3, 4),
                ],
                Conditions::new().eq("opcode", 0x12),
            )
            .unwrap();
        (registry, inquiry)
    }

    #[test]
    fn test_accessors() {
        let registry = Registry::new();
        let cmd = registry
            .command(&[0x12, 0, 0, 0, 0x24, 0, 0xff], PeripheralType::Tape)
            .unwrap();

        assert_eq!(cmd.opcode(), 0x12);
        assert_eq!(cmd.len(), 6);
        assert!(!cmd.is_empty());
        assert_eq!(cmd.bytes(), &[0x12, 0, 0, 0, 0x24, 0]);
        assert_eq!(cmd.peripheral_type(), PeripheralType::Tape);
        assert_eq!(cmd.kind(), registry.root());
        assert_eq!(cmd.type_name(), "Command");
        assert_eq!(cmd.get("opcode").unwrap(), Value::U64(0x12));
    }

    #[test]
    fn test_command_errors() {
        let registry = Registry::new();
        assert_eq!(
            registry.command(&[], PeripheralType::Disk).unwrap_err(),
            CdbError::Empty
        );
    }

    #[test]
    fn test_get_set_by_name() {
        let (registry, inquiry) = inquiry_registry();
        let mut cmd = registry
            .command_as(inquiry, &[0x12, 0, 0, 0, 0x24, 0], PeripheralType::Disk)
            .unwrap();

        assert_eq!(cmd.get("evpd").unwrap(), Value::Bool(false));
        assert_eq!(cmd.get("allocation_length").unwrap(), Value::U64(0x24));

        cmd.set("evpd", true).unwrap();
        cmd.set("page_code", 0x83u8).unwrap();
        cmd.set("allocation_length", 0x1000u16).unwrap();
        assert_eq!(cmd.bytes(), &[0x12, 0x01, 0x83, 0x10, 0x00, 0]);

        assert_eq!(
            cmd.get("service_action").unwrap_err(),
            AccessError::UnknownField("service_action".into())
        );
    }

    #[test]
    fn test_to_vec_is_detached() {
        let (registry, inquiry) = inquiry_registry();
        let mut cmd = registry
            .command_as(inquiry, &[0x12, 0, 0, 0, 0x24, 0], PeripheralType::Disk)
            .unwrap();
        let before = cmd.to_vec();
        cmd.set("page_code", 0x80u8).unwrap();
        assert_eq!(before, [0x12, 0, 0, 0, 0x24, 0]);
        assert_ne!(cmd.to_vec(), before);
    }

    #[test]
    fn test_fields() {
        let (registry, inquiry) = inquiry_registry();
        let cmd = registry
            .command_as(inquiry, &[0x12, 1, 0x80, 0, 0xff, 0], PeripheralType::Disk)
            .unwrap();
        let fields = cmd.fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields["evpd"], Value::Bool(true));
        assert_eq!(fields["page_code"], Value::U64(0x80));
        assert_eq!(fields["allocation_length"], Value::U64(0xff));
    }

    #[test]
    fn test_is_a() {
        let (registry, inquiry) = inquiry_registry();
        let cmd = registry
            .command_as(inquiry, &[0x12, 0, 0, 0, 0, 0], PeripheralType::Disk)
            .unwrap();
        assert!(cmd.is_a(inquiry));
        assert!(cmd.is_a(registry.root()));

        let base = registry.command(&[0x12, 0, 0, 0, 0, 0], PeripheralType::Disk).unwrap();
        assert!(!base.is_a(inquiry));
    }

    #[test]
    fn test_refine_after_set() {
        let (registry, inquiry) = inquiry_registry();
        let mut cmd = registry.command(&[0x00; 6], PeripheralType::Disk).unwrap();
        cmd.refine();
        assert_eq!(cmd.kind(), registry.root());

        cmd.set("opcode", 0x12u8).unwrap();
        cmd.refine();
        assert_eq!(cmd.kind(), inquiry);
    }

    #[test]
    fn test_display_and_debug() {
        let (registry, inquiry) = inquiry_registry();
        let cmd = registry
            .command_as(inquiry, &[0x12, 0, 0, 0, 0x24, 0], PeripheralType::Disk)
            .unwrap();
        assert_eq!(cmd.to_string(), "Inquiry (12 00 00 00 24 00)");
        assert_eq!(
            format!("{cmd:?}"),
            "Command { type: \"Inquiry\", cdb: Cdb(12 00 00 00 24 00), peripheral_type: Disk }"
        );
    }
}
