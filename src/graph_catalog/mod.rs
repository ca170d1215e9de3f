//! Static description of the queryable graph.
//!
//! The catalog maps exposed type names to storage labels, properties,
//! relationships and authorization rules. It is built once, from
//! configuration or by an embedding application, and consulted read-only
//! during translation. Selection requests arriving from callers are plain
//! data; resolving their names against the catalog is the translator's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cypher_generator::pattern::Direction;
use crate::query_ast::CompareOp;

mod errors;

pub use errors::CatalogError;

/// One exposed property: the name callers use and the name stored on the
/// node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub storage_name: String,
    #[serde(default)]
    pub nullable: bool,
}

/// One traversable relationship off an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    /// Field name callers select.
    pub name: String,
    pub rel_type: String,
    pub direction: Direction,
    /// Target entity type name.
    pub target: String,
    /// A single related node rather than a list.
    #[serde(default)]
    pub one_to_one: bool,
}

/// A row-level authorization rule: the named property must compare equal
/// (or per `operator`) to the value of the named request claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRule {
    pub storage_name: String,
    pub claim: String,
    pub operator: CompareOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub type_name: String,
    /// Node labels; empty only for composite entities.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDescriptor>,
    /// Member type names; non-empty marks this entity as composite
    /// (an interface or union over the members).
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub auth_rules: Vec<AuthRule>,
}

impl EntityDescriptor {
    pub fn is_composite(&self) -> bool {
        !self.members.is_empty()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

/// Entity descriptors keyed by type name. Iteration order is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    entities: BTreeMap<String, EntityDescriptor>,
}

impl Catalog {
    /// Build a catalog, validating that every concrete entity carries at
    /// least one label and that composite members resolve.
    pub fn new(entities: Vec<EntityDescriptor>) -> Result<Catalog, CatalogError> {
        let mut map = BTreeMap::new();
        for entity in entities {
            if entity.labels.is_empty() && entity.members.is_empty() {
                return Err(CatalogError::EntityWithoutLabels(entity.type_name.clone()));
            }
            map.insert(entity.type_name.clone(), entity);
        }
        for entity in map.values() {
            for member in &entity.members {
                if !map.contains_key(member) {
                    return Err(CatalogError::UnknownMember(
                        entity.type_name.clone(),
                        member.clone(),
                    ));
                }
            }
        }
        Ok(Catalog { entities: map })
    }

    pub fn entity(&self, type_name: &str) -> Result<&EntityDescriptor, CatalogError> {
        self.entities
            .get(type_name)
            .ok_or_else(|| CatalogError::UnknownEntity(type_name.to_string()))
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.values()
    }
}

/// One field of an incoming selection: a name, optional output alias,
/// arguments, and nested sub-selections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub field_name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(default)]
    pub selection: Vec<SelectionRequest>,
}

impl SelectionRequest {
    pub fn new(field_name: impl Into<String>) -> Self {
        SelectionRequest {
            field_name: field_name.into(),
            ..SelectionRequest::default()
        }
    }

    /// The key this field's value appears under in the output.
    pub fn output_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field_name)
    }
}

/// Per-request toggles. Everything defaults to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub authorization: bool,
    pub fulltext: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        FeatureFlags {
            authorization: true,
            fulltext: true,
        }
    }
}

/// Caller identity and toggles accompanying one compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub claims: Map<String, Value>,
    #[serde(default)]
    pub flags: FeatureFlags,
}

impl RequestContext {
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}
