//! Progressive classification: walk the registry tree from the root, following the first
//! entry whose conditions hold, until no entry of the current type matches.

use tracing::{trace, warn};

use crate::{
    command::Command,
    errors::{AccessError, CdbError},
    pdt::PeripheralType,
    registry::{Registry, TypeId},
};

/// Classifies raw CDBs against a [Registry].
///
/// ```
/// use cdbcraft::{
///     classify::Classifier,
///     field::Field,
///     pdt::PeripheralType,
///     registry::{Conditions, Registry},
/// };
///
/// let mut registry = Registry::new();
/// let sai = registry
///     .subtype(
///         registry.root(),
///         "ServiceActionIn16",
///         &[Field::bits("service_action", (1, 4), (1, 0))],
///         Conditions::new().eq("opcode", 0x9e),
///     )
///     .unwrap();
/// let read_capacity = registry
///     .subtype(sai, "ReadCapacity16", &[], Conditions::new().eq("service_action", 0x10))
///     .unwrap();
///
/// let mut raw = [0u8; 16];
/// raw[0] = 0x9e;
/// raw[1] = 0x10;
///
/// let cmd = Classifier::new(&registry).classify(&raw, PeripheralType::Disk).unwrap();
/// assert_eq!(cmd.kind(), read_capacity);
///
/// let shallow = Classifier::new(&registry)
///     .max_depth(Some(1))
///     .classify(&raw, PeripheralType::Disk)
///     .unwrap();
/// assert_eq!(shallow.kind(), sai);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'r> {
    registry: &'r Registry,
    max_depth: Option<usize>,
}

impl<'r> Classifier<'r> {
    /// A classifier that refines as deep as the registry goes.
    pub fn new(registry: &'r Registry) -> Self {
        Classifier {
            registry,
            max_depth: None,
        }
    }

    /// Stops after `depth` refinement steps from the root; `None` means no limit.
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builds a command from `seq` and refines it to the most specific matching type.
    ///
    /// Only building the CDB can fail. Finding no match at some level is the normal way
    /// refinement ends.
    pub fn classify(&self, seq: &[u8], pdt: PeripheralType) -> Result<Command<'r>, CdbError> {
        let mut cmd = self.registry.command(seq, pdt)?;
        self.refine(&mut cmd);
        Ok(cmd)
    }

    /// Refines `cmd` from its current type downwards.
    pub fn refine(&self, cmd: &mut Command<'r>) {
        let mut depth = self.registry.depth(cmd.kind());

        while let Some(next) = self.step(cmd.kind(), cmd.bytes()) {
            if self.max_depth.is_some_and(|max| depth >= max) {
                warn!(
                    at = cmd.type_name(),
                    next = self.registry.ty(next).name(),
                    depth,
                    "refinement depth limit reached"
                );
                break;
            }

            trace!(
                from = cmd.type_name(),
                to = self.registry.ty(next).name(),
                "refined command"
            );
            cmd.retype(next);
            depth += 1;
        }
    }

    /// First entry of `kind` that matches `data`, if any.
    fn step(&self, kind: TypeId, data: &[u8]) -> Option<TypeId> {
        self.registry
            .ty(kind)
            .entries()
            .iter()
            .find(|entry| match entry.matches(data) {
                Ok(matched) => matched,
                Err(AccessError::OutOfBounds { needed, len }) => {
                    trace!(
                        target_type = self.registry.ty(entry.target()).name(),
                        needed,
                        len,
                        "skipping entry, condition field beyond CDB"
                    );
                    false
                }
                Err(_) => false,
            })
            .map(|entry| entry.target())
    }
}
