//! Command types and the refinement tree used to classify raw CDBs.
//!
//! A [Registry] owns every command type known to a process. Each type has a field table
//! (its own fields plus those of its base) and an ordered list of [RegistryEntry]s that
//! say which narrower type a command becomes when certain fields hold certain values.
//! Entries form a tree rooted at [Registry::root]: a type is registered under at most one
//! parent and never under itself or one of its descendants, so refinement always ends.

use std::fmt;

use tracing::debug;

use crate::{
    cdb::Cdb,
    command::Command,
    compiled::CompiledField,
    errors::{AccessError, CdbError, DefinitionError},
    field::Field,
    pdt::PeripheralType,
    resolve::{LengthResolver, NameResolver, StandardTables},
};

/// Name of the root type every registry starts with.
pub const ROOT_TYPE: &str = "Command";

/// Handle to a command type inside one [Registry].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Field conditions of an entry, before they are resolved against a type.
///
/// ```
/// use cdbcraft::registry::Conditions;
///
/// let when = Conditions::new().eq("opcode", 0x9e).any_of("service_action", [0x10, 0x12]);
/// assert_eq!(when.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    terms: Vec<(String, Vec<u64>)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field `name` must equal `value`. Flags compare as 0 and 1.
    pub fn eq(self, name: impl Into<String>, value: u64) -> Self {
        self.any_of(name, [value])
    }

    /// Field `name` must hold one of `values`.
    pub fn any_of(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = u64>,
    ) -> Self {
        self.terms.push((name.into(), values.into_iter().collect()));
        self
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// One resolved condition: a compiled accessor and the values it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    field: CompiledField,
    accepted: Vec<u64>,
}

impl Condition {
    pub fn field(&self) -> &CompiledField {
        &self.field
    }

    pub fn accepted(&self) -> &[u64] {
        &self.accepted
    }

    /// Whether the field in `data` holds an accepted value.
    pub fn matches(&self, data: &[u8]) -> Result<bool, AccessError> {
        let value = self.field.get(data)?.as_u64();
        Ok(self.accepted.contains(&value))
    }
}

/// A refinement rule: when every condition holds, a command becomes `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    conditions: Vec<Condition>,
    target: TypeId,
}

impl RegistryEntry {
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn target(&self) -> TypeId {
        self.target
    }

    /// Whether all conditions hold for `data`. A field beyond the end of `data` never matches.
    pub fn matches(&self, data: &[u8]) -> Result<bool, AccessError> {
        for condition in &self.conditions {
            if !condition.matches(data)? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// A node of the registry: a named command type with its field table and refinements.
#[derive(Debug, Clone)]
pub struct CommandType {
    name: String,
    base: Option<TypeId>,
    parent: Option<TypeId>,
    fields: Vec<CompiledField>,
    entries: Vec<RegistryEntry>,
}

impl CommandType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type this one inherits its fields from.
    pub fn base(&self) -> Option<TypeId> {
        self.base
    }

    /// Type this one is registered under as a refinement.
    pub fn parent(&self) -> Option<TypeId> {
        self.parent
    }

    /// Inherited and own fields, in definition order.
    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Refinement entries, in registration order.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }
}

/// All command types of a process, plus the lookups commands need.
///
/// Built once during initialization and then shared by reference; a built registry is
/// immutable and `Send + Sync`.
pub struct Registry {
    types: Vec<CommandType>,
    lengths: Box<dyn LengthResolver>,
    names: Box<dyn NameResolver>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry holding only the root type, using [StandardTables] for lengths and names.
    pub fn new() -> Self {
        Self::with_resolvers(StandardTables, StandardTables)
    }

    /// A registry holding only the root type, using the given lookups.
    pub fn with_resolvers(
        lengths: impl LengthResolver + 'static,
        names: impl NameResolver + 'static,
    ) -> Self {
        Registry {
            types: vec![CommandType {
                name: ROOT_TYPE.to_string(),
                base: None,
                parent: None,
                fields: vec![CompiledField::whole_byte("opcode", 0)],
                entries: Vec::new(),
            }],
            lengths: Box::new(lengths),
            names: Box::new(names),
        }
    }

    /// The root type every command starts as.
    pub fn root(&self) -> TypeId {
        TypeId(0)
    }

    pub fn command_type(&self, id: TypeId) -> Option<&CommandType> {
        self.types.get(id.0)
    }

    pub(crate) fn ty(&self, id: TypeId) -> &CommandType {
        &self.types[id.0]
    }

    fn checked(&self, id: TypeId) -> Result<&CommandType, DefinitionError> {
        self.command_type(id).ok_or(DefinitionError::UnknownType(id))
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.types.iter().position(|t| t.name == name).map(TypeId)
    }

    /// All types, in definition order, the root first.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &CommandType)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId(i), t))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always `false`: the root type is always present.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn lengths(&self) -> &dyn LengthResolver {
        self.lengths.as_ref()
    }

    pub fn names(&self) -> &dyn NameResolver {
        self.names.as_ref()
    }

    /// Defines a new type inheriting every field of `base`.
    ///
    /// Own fields may shadow an inherited field of the same name. The new type is not
    /// reachable by classification until it is [registered](Registry::register).
    pub fn define(
        &mut self,
        name: impl Into<String>,
        base: TypeId,
        fields: &[Field],
    ) -> Result<TypeId, DefinitionError> {
        let name = name.into();
        if name.is_empty() || self.lookup(&name).is_some() {
            return Err(DefinitionError::DuplicateTypeName(name));
        }

        let mut table = self.checked(base)?.fields.clone();
        let mut own: Vec<&str> = Vec::with_capacity(fields.len());

        for field in fields {
            if own.contains(&field.name.as_str()) {
                return Err(DefinitionError::DuplicateField(field.name.clone()));
            }
            own.push(&field.name);

            let compiled = CompiledField::compile(field)?;
            match table.iter_mut().find(|f| f.name == compiled.name) {
                Some(inherited) => *inherited = compiled,
                None => table.push(compiled),
            }
        }

        debug!(
            ty = %name,
            base = %self.ty(base).name,
            fields = table.len(),
            "defined command type"
        );

        let id = TypeId(self.types.len());
        self.types.push(CommandType {
            name,
            base: Some(base),
            parent: None,
            fields: table,
            entries: Vec::new(),
        });

        Ok(id)
    }

    /// Attaches an entry to `under`: a command of type `under` whose fields satisfy
    /// `conditions` refines into `target`.
    ///
    /// Condition fields are resolved against `under`'s field table now, so unknown names
    /// fail here rather than during classification. Entries are tried in the order they
    /// are registered.
    pub fn register(
        &mut self,
        under: TypeId,
        target: TypeId,
        conditions: Conditions,
    ) -> Result<(), DefinitionError> {
        let parent = self.checked(under)?;
        let child = self.checked(target)?;

        if under == target {
            return Err(DefinitionError::SelfReference(child.name.clone()));
        }
        if let Some(existing) = child.parent {
            return Err(DefinitionError::AlreadyRegistered {
                target: child.name.clone(),
                parent: self.ty(existing).name.clone(),
            });
        }
        if target == self.root() || self.ancestors(under).any(|id| id == target) {
            return Err(DefinitionError::Cycle {
                under: parent.name.clone(),
                target: child.name.clone(),
            });
        }

        let mut resolved = Vec::with_capacity(conditions.terms.len());
        for (name, accepted) in conditions.terms {
            if accepted.is_empty() {
                return Err(DefinitionError::EmptyCondition(name));
            }

            let field = parent
                .field(&name)
                .ok_or_else(|| DefinitionError::UnknownField {
                    ty: parent.name.clone(),
                    field: name.clone(),
                })?
                .clone();

            resolved.push(Condition { field, accepted });
        }

        debug!(
            under = %parent.name,
            target = %child.name,
            conditions = resolved.len(),
            "registered refinement"
        );

        self.types[under.0].entries.push(RegistryEntry {
            conditions: resolved,
            target,
        });
        self.types[target.0].parent = Some(under);

        Ok(())
    }

    /// Defines `name` on top of `base` and registers it under `base` in one step.
    pub fn subtype(
        &mut self,
        base: TypeId,
        name: impl Into<String>,
        fields: &[Field],
        conditions: Conditions,
    ) -> Result<TypeId, DefinitionError> {
        let id = self.define(name, base, fields)?;
        self.register(base, id, conditions)?;
        Ok(id)
    }

    /// `id` and the types it is registered under, up to the root.
    fn ancestors(&self, id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::successors(Some(id), |id| self.types.get(id.0).and_then(|t| t.parent))
    }

    /// Whether `id` is `ancestor` or inherits from it through its bases.
    pub fn inherits(&self, id: TypeId, ancestor: TypeId) -> bool {
        std::iter::successors(Some(id), |id| self.types.get(id.0).and_then(|t| t.base))
            .any(|id| id == ancestor)
    }

    /// Depth of `id` in the refinement tree; the root is 0.
    pub fn depth(&self, id: TypeId) -> usize {
        self.ancestors(id).count().saturating_sub(1)
    }

    /// A command of the root type, without classification.
    pub fn command(&self, seq: &[u8], pdt: PeripheralType) -> Result<Command<'_>, CdbError> {
        self.command_as(self.root(), seq, pdt)
    }

    /// A command of type `ty`, without classification.
    ///
    /// Fails with [CdbError::UnknownType] if `ty` does not belong to this registry.
    pub fn command_as(
        &self,
        ty: TypeId,
        seq: &[u8],
        pdt: PeripheralType,
    ) -> Result<Command<'_>, CdbError> {
        if ty.0 >= self.types.len() {
            return Err(CdbError::UnknownType(ty));
        }

        let cdb = Cdb::from_bytes(seq, self.lengths())?;
        Ok(Command::from_parts(self, ty, cdb, pdt))
    }

    /// Classifies `seq` into the most specific registered type.
    ///
    /// See [crate::classify::Classifier] for bounded refinement.
    pub fn classify(&self, seq: &[u8], pdt: PeripheralType) -> Result<Command<'_>, CdbError> {
        crate::classify::Classifier::new(self).classify(seq, pdt)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.types.iter().map(|t| &t.name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "serde")]
impl TryFrom<crate::serde::CatalogDef> for Registry {
    type Error = DefinitionError;

    fn try_from(value: crate::serde::CatalogDef) -> Result<Self, Self::Error> {
        let mut registry = Registry::new();
        registry.extend_from_def(value)?;
        Ok(registry)
    }
}

#[cfg(feature = "serde")]
impl Registry {
    /// Defines and registers every type of `def`, in order.
    pub fn extend_from_def(
        &mut self,
        def: crate::serde::CatalogDef,
    ) -> Result<(), DefinitionError> {
        for ty in def.types {
            let base = match &ty.base {
                Some(name) => self
                    .lookup(name)
                    .ok_or_else(|| DefinitionError::UnknownTypeName(name.clone()))?,
                None => self.root(),
            };

            let fields: Vec<Field> = ty.fields.into_iter().map(Into::into).collect();
            let id = self.define(ty.name, base, &fields)?;

            if let Some(register) = ty.register {
                let under = self
                    .lookup(&register.under)
                    .ok_or_else(|| DefinitionError::UnknownTypeName(register.under.clone()))?;
                self.register(under, id, register.when.into())?;
            }
        }

        Ok(())
    }
}
