//! Serializable description of command types and their refinements.
//!
//! These types describe a catalog as data, for example a JSON file shipped next to an
//! application, and compile into a [crate::registry::Registry] with `Registry::try_from`.
//!
//! ```json
//! {
//!   "types": [
//!     {
//!       "name": "Inquiry",
//!       "fields": [
//!         { "name": "evpd", "msb": [1, 0] },
//!         { "name": "page_code", "msb": 2 },
//!         { "name": "allocation_length", "msb": 3, "lsb": 4 }
//!       ],
//!       "register": { "under": "Command", "when": { "opcode": 18 } }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::registry::Conditions;

/// Top-level catalog: command types in definition order.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CatalogDef {
    pub types: Vec<CommandTypeDef>,
}

/// One command type.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CommandTypeDef {
    /// Unique type name.
    pub name: String,
    /// Type to inherit fields from; the root type when absent.
    #[serde(default)]
    pub base: Option<String>,
    /// Fields added on top of the base's.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Where and when this type is reached by classification.
    #[serde(default)]
    pub register: Option<RegisterDef>,
}

/// A field, bounded by its MSB and optional LSB.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    pub name: String,
    pub msb: PosDef,
    #[serde(default)]
    pub lsb: Option<PosDef>,
}

/// A field boundary: `4` for a whole byte or `[4, 3]` for byte 4, bit 3.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(untagged)]
pub enum PosDef {
    Byte(usize),
    Bit((usize, u8)),
}

/// Registration of a type beneath another.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegisterDef {
    /// Name of the type whose fields the conditions read.
    pub under: String,
    /// Field name to accepted value(s).
    #[serde(default)]
    pub when: BTreeMap<String, AcceptDef>,
}

/// Accepted value(s) of one condition: `3` or `[1, 2, 3]`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum AcceptDef {
    One(u64),
    Any(Vec<u64>),
}

impl From<BTreeMap<String, AcceptDef>> for Conditions {
    fn from(value: BTreeMap<String, AcceptDef>) -> Self {
        value
            .into_iter()
            .fold(Conditions::new(), |conditions, (name, accept)| match accept {
                AcceptDef::One(v) => conditions.eq(name, v),
                AcceptDef::Any(vs) => conditions.any_of(name, vs),
            })
    }
}
