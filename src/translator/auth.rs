//! Authorization sub-builder.
//!
//! Entity auth rules become predicate nodes conjoined with the user filter.
//! Rules never weaken a user filter and the user tree is never mutated; a
//! rule whose claim is absent from the request compiles to an always-false
//! predicate, so access is denied rather than the rule dropped.

use crate::graph_catalog::{EntityDescriptor, RequestContext};
use crate::query_ast::{Comparison, Filter};

/// Build the injected predicate for one entity, or `None` when the entity
/// carries no rules or authorization is disabled for the request.
pub(crate) fn build_auth_filter(
    entity: &EntityDescriptor,
    request: &RequestContext,
) -> Option<Filter> {
    if !request.flags.authorization || entity.auth_rules.is_empty() {
        return None;
    }

    let mut predicates: Vec<Filter> = Vec::new();
    for rule in &entity.auth_rules {
        let predicate = match request.claim(&rule.claim) {
            Some(value) => Filter::Compare(Comparison {
                path: vec![rule.storage_name.clone()],
                operator: rule.operator,
                value: value.clone(),
            }),
            None => {
                log::debug!(
                    "auth rule on '{}' references missing claim '{}', denying",
                    entity.type_name,
                    rule.claim
                );
                Filter::Never
            }
        };
        // Structurally identical rules collapse to one predicate.
        if predicates
            .iter()
            .any(|existing| existing.structurally_equal(&predicate))
        {
            continue;
        }
        predicates.push(predicate);
    }

    let mut iter = predicates.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, predicate| acc.and_also(predicate)))
}
