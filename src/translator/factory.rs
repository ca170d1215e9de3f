//! Translation factory: selection requests to operation trees.
//!
//! The factory resolves every name in the incoming request against the
//! catalog and assembles the operation tree the transpiler consumes. Its
//! sub-builders (filters, fields, sort, auth) recurse into each other, so
//! they share one immutable [`TranslationServices`] rather than owning each
//! other.

use serde_json::{Map, Value};

use crate::graph_catalog::{
    Catalog, EntityDescriptor, RelationshipDescriptor, RequestContext, SelectionRequest,
};
use crate::query_ast::{
    AggregateFunction, AggregateOperation, AggregateSelection, ConnectionEntry,
    ConnectionOperation, Field, FulltextAnchor, Operation, OperationField, ReadBranch,
    ReadOperation, RelationshipLink, SortAndPaginate, SortItem,
};

use super::auth;
use super::errors::TranslateError;
use super::filter_builder;

#[derive(Clone, Copy)]
pub struct TranslationServices<'a> {
    pub catalog: &'a Catalog,
    pub request: &'a RequestContext,
}

impl<'a> TranslationServices<'a> {
    pub fn new(catalog: &'a Catalog, request: &'a RequestContext) -> Self {
        TranslationServices { catalog, request }
    }

    /// Build the root operation for a selection against the named entity.
    /// The field name's suffix picks the operation kind.
    pub fn build_operation(
        &self,
        entity_name: &str,
        selection: &SelectionRequest,
    ) -> Result<Operation, TranslateError> {
        let entity = self.catalog.entity(entity_name)?;
        log::debug!(
            "building operation for field '{}' on entity '{}'",
            selection.field_name,
            entity.type_name
        );
        if selection.field_name.ends_with("Aggregate") {
            Ok(Operation::Aggregate(self.build_aggregate(
                entity,
                selection,
                None,
            )?))
        } else if selection.field_name.ends_with("Connection") {
            Ok(Operation::Connection(self.build_connection(
                entity,
                selection,
                None,
            )?))
        } else {
            Ok(Operation::Read(self.build_read(
                entity,
                &selection.arguments,
                &selection.selection,
                None,
            )?))
        }
    }

    fn build_read(
        &self,
        entity: &EntityDescriptor,
        arguments: &Map<String, Value>,
        selection: &[SelectionRequest],
        via: Option<RelationshipLink>,
    ) -> Result<ReadOperation, TranslateError> {
        // Peel the `_on` discriminator off the where object; the remaining
        // keys are predicates shared by every included member.
        let mut shared = Map::new();
        let mut on: Option<&Map<String, Value>> = None;
        if let Some(value) = arguments.get("where") {
            let map = value
                .as_object()
                .ok_or_else(|| invalid("where", "expected an object"))?;
            for (key, value) in map {
                if key == "_on" {
                    on = Some(
                        value
                            .as_object()
                            .ok_or_else(|| invalid("_on", "expected an object"))?,
                    );
                } else {
                    shared.insert(key.clone(), value.clone());
                }
            }
        }

        let mut branches = Vec::new();
        if entity.is_composite() {
            // A discriminator restricts the member set only when it stands
            // alone; shared predicates alongside it keep every member in,
            // with the named members picking up their extra filters. Names
            // that match no member contribute no branch and are dropped
            // silently.
            let restrict = on.is_some() && shared.is_empty();
            for member in &entity.members {
                let specific = match on.and_then(|on| on.get(member)) {
                    Some(value) => Some(
                        value
                            .as_object()
                            .ok_or_else(|| invalid("_on", "expected member objects"))?,
                    ),
                    None if restrict => continue,
                    None => None,
                };
                let member_entity = self.catalog.entity(member)?;
                branches.push(self.build_branch(member_entity, &shared, specific, selection, true)?);
            }
        } else {
            branches.push(self.build_branch(entity, &shared, None, selection, false)?);
        }

        Ok(ReadOperation {
            type_name: entity.type_name.clone(),
            composite: entity.is_composite(),
            branches,
            via,
            sort: self.build_sort(entity, arguments)?,
            fulltext: self.build_fulltext(arguments)?,
        })
    }

    fn build_branch(
        &self,
        entity: &EntityDescriptor,
        shared: &Map<String, Value>,
        specific: Option<&Map<String, Value>>,
        selection: &[SelectionRequest],
        composite: bool,
    ) -> Result<ReadBranch, TranslateError> {
        let mut filter = filter_builder::from_object(entity, shared)?;
        if let Some(specific) = specific {
            if let Some(extra) = filter_builder::from_object(entity, specific)? {
                filter = Some(match filter {
                    Some(existing) => existing.and_also(extra),
                    None => extra,
                });
            }
        }
        Ok(ReadBranch {
            type_name: entity.type_name.clone(),
            labels: entity.labels.clone(),
            fields: self.build_fields(entity, selection, composite)?,
            filter,
            auth_filter: auth::build_auth_filter(entity, self.request),
        })
    }

    fn build_fields(
        &self,
        entity: &EntityDescriptor,
        selection: &[SelectionRequest],
        composite: bool,
    ) -> Result<Vec<Field>, TranslateError> {
        let mut fields = Vec::with_capacity(selection.len());
        for item in selection {
            let name = item.field_name.as_str();

            // Composite projections emit the discriminating name on their
            // own; an explicit default-alias request is satisfied by that.
            // Everywhere else the type name projects as a string literal.
            if name == "__typename" {
                if composite && item.alias.is_none() {
                    continue;
                }
                fields.push(Field::type_name(item.output_alias()));
                continue;
            }

            if let Some(property) = entity.property(name) {
                fields.push(Field::attribute(
                    item.output_alias(),
                    property.storage_name.clone(),
                ));
                continue;
            }

            if let Some(relationship) = entity.relationship(name) {
                let target = self.catalog.entity(&relationship.target)?;
                let read = self.build_read(
                    target,
                    &item.arguments,
                    &item.selection,
                    Some(link(relationship)),
                )?;
                fields.push(Field::Operation(OperationField::new(
                    item.output_alias(),
                    Operation::Read(read),
                )));
                continue;
            }

            if let Some(base) = name.strip_suffix("Aggregate") {
                if let Some(relationship) = entity.relationship(base) {
                    let target = self.catalog.entity(&relationship.target)?;
                    let aggregate = self.build_aggregate(target, item, Some(link(relationship)))?;
                    fields.push(Field::Operation(OperationField::new(
                        item.output_alias(),
                        Operation::Aggregate(aggregate),
                    )));
                    continue;
                }
            }

            if let Some(base) = name.strip_suffix("Connection") {
                if let Some(relationship) = entity.relationship(base) {
                    let target = self.catalog.entity(&relationship.target)?;
                    let connection =
                        self.build_connection(target, item, Some(link(relationship)))?;
                    fields.push(Field::Operation(OperationField::new(
                        item.output_alias(),
                        Operation::Connection(connection),
                    )));
                    continue;
                }
            }

            return Err(TranslateError::UnknownField {
                type_name: entity.type_name.clone(),
                field: item.field_name.clone(),
            });
        }
        Ok(fields)
    }

    fn build_aggregate(
        &self,
        entity: &EntityDescriptor,
        request: &SelectionRequest,
        via: Option<RelationshipLink>,
    ) -> Result<AggregateOperation, TranslateError> {
        let filter = match request.arguments.get("where") {
            Some(value) => filter_builder::from_object(
                entity,
                value
                    .as_object()
                    .ok_or_else(|| invalid("where", "expected an object"))?,
            )?,
            None => None,
        };

        let mut selections = Vec::with_capacity(request.selection.len());
        for item in &request.selection {
            if item.field_name == "count" {
                selections.push(AggregateSelection::Count {
                    alias: item.output_alias().to_string(),
                });
                continue;
            }
            if let Some(property) = entity.property(&item.field_name) {
                let mut functions = Vec::with_capacity(item.selection.len());
                for function in &item.selection {
                    functions.push(match function.field_name.as_str() {
                        "min" => AggregateFunction::Min,
                        "max" => AggregateFunction::Max,
                        "avg" => AggregateFunction::Avg,
                        "sum" => AggregateFunction::Sum,
                        other => {
                            return Err(TranslateError::UnknownField {
                                type_name: entity.type_name.clone(),
                                field: other.to_string(),
                            })
                        }
                    });
                }
                if functions.is_empty() {
                    return Err(invalid(
                        &item.field_name,
                        "aggregated property selects no functions",
                    ));
                }
                selections.push(AggregateSelection::Property {
                    alias: item.output_alias().to_string(),
                    storage_name: property.storage_name.clone(),
                    functions,
                });
                continue;
            }
            return Err(TranslateError::UnknownField {
                type_name: entity.type_name.clone(),
                field: item.field_name.clone(),
            });
        }

        Ok(AggregateOperation {
            type_name: entity.type_name.clone(),
            labels: entity.labels.clone(),
            via,
            filter,
            auth_filter: auth::build_auth_filter(entity, self.request),
            selections,
        })
    }

    fn build_connection(
        &self,
        entity: &EntityDescriptor,
        request: &SelectionRequest,
        via: Option<RelationshipLink>,
    ) -> Result<ConnectionOperation, TranslateError> {
        let mut entries = Vec::new();
        let mut node_selection: &[SelectionRequest] = &[];
        for item in &request.selection {
            match item.field_name.as_str() {
                "edges" => {
                    entries.push(ConnectionEntry::Edges);
                    for edge_field in &item.selection {
                        if edge_field.field_name == "node" {
                            node_selection = &edge_field.selection;
                        }
                    }
                }
                "totalCount" => entries.push(ConnectionEntry::TotalCount),
                other => {
                    return Err(TranslateError::UnknownField {
                        type_name: entity.type_name.clone(),
                        field: other.to_string(),
                    })
                }
            }
        }
        let read = self.build_read(entity, &request.arguments, node_selection, via)?;
        Ok(ConnectionOperation { read, entries })
    }

    fn build_sort(
        &self,
        entity: &EntityDescriptor,
        arguments: &Map<String, Value>,
    ) -> Result<Option<SortAndPaginate>, TranslateError> {
        let mut directive = SortAndPaginate::default();
        if let Some(value) = arguments.get("sort") {
            let list = value
                .as_array()
                .ok_or_else(|| invalid("sort", "expected a list of objects"))?;
            for element in list {
                let map = element
                    .as_object()
                    .ok_or_else(|| invalid("sort", "expected a list of objects"))?;
                for (key, direction) in map {
                    let storage_name = self
                        .sort_storage_name(entity, key)
                        .ok_or_else(|| invalid("sort", format!("unknown key '{}'", key)))?;
                    let descending = match direction.as_str() {
                        Some("ASC") => false,
                        Some("DESC") => true,
                        _ => return Err(invalid("sort", "direction must be ASC or DESC")),
                    };
                    directive.items.push(SortItem {
                        storage_name,
                        descending,
                    });
                }
            }
        }
        directive.skip = integer_argument(arguments, "offset")?;
        directive.limit = integer_argument(arguments, "limit")?;
        Ok(if directive.is_empty() {
            None
        } else {
            Some(directive)
        })
    }

    /// Resolve a sort key against the entity, falling back to composite
    /// members for keys declared only there.
    fn sort_storage_name(&self, entity: &EntityDescriptor, name: &str) -> Option<String> {
        if let Some(property) = entity.property(name) {
            return Some(property.storage_name.clone());
        }
        entity.members.iter().find_map(|member| {
            self.catalog
                .entity(member)
                .ok()
                .and_then(|member_entity| member_entity.property(name))
                .map(|property| property.storage_name.clone())
        })
    }

    fn build_fulltext(
        &self,
        arguments: &Map<String, Value>,
    ) -> Result<Option<FulltextAnchor>, TranslateError> {
        if !self.request.flags.fulltext {
            return Ok(None);
        }
        let Some(value) = arguments.get("fulltext") else {
            return Ok(None);
        };
        let map = value
            .as_object()
            .ok_or_else(|| invalid("fulltext", "expected an object"))?;
        let index_name = map
            .get("index")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("fulltext", "missing index name"))?;
        let phrase = map
            .get("phrase")
            .cloned()
            .ok_or_else(|| invalid("fulltext", "missing phrase"))?;
        Ok(Some(FulltextAnchor {
            index_name: index_name.to_string(),
            phrase,
        }))
    }
}

fn link(relationship: &RelationshipDescriptor) -> RelationshipLink {
    RelationshipLink {
        rel_type: relationship.rel_type.clone(),
        direction: relationship.direction,
        one_to_one: relationship.one_to_one,
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> TranslateError {
    TranslateError::InvalidArgument {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn integer_argument(
    arguments: &Map<String, Value>,
    name: &str,
) -> Result<Option<i64>, TranslateError> {
    match arguments.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(name, "expected an integer")),
    }
}
