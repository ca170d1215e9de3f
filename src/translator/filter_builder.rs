//! Filter sub-builder: `where` argument objects to predicate trees.
//!
//! Keys are property names carrying an optional operator suffix
//! (`title_CONTAINS`, `year_GTE`, ...), plus the boolean combinators `AND`,
//! `OR` and `NOT`. Property names resolve through the entity descriptor to
//! storage names; an unresolvable key is an error, never a silent drop.

use serde_json::{Map, Value};

use crate::graph_catalog::EntityDescriptor;
use crate::query_ast::{CompareOp, Comparison, Filter};

use super::errors::TranslateError;

/// Operator suffixes, longest first so `_NOT_IN` wins over `_NOT`.
const SUFFIXES: &[(&str, CompareOp, bool)] = &[
    ("_NOT_STARTS_WITH", CompareOp::StartsWith, true),
    ("_NOT_ENDS_WITH", CompareOp::EndsWith, true),
    ("_NOT_CONTAINS", CompareOp::Contains, true),
    ("_NOT_IN", CompareOp::In, true),
    ("_STARTS_WITH", CompareOp::StartsWith, false),
    ("_ENDS_WITH", CompareOp::EndsWith, false),
    ("_CONTAINS", CompareOp::Contains, false),
    ("_NOT", CompareOp::Neq, false),
    ("_IN", CompareOp::In, false),
    ("_LTE", CompareOp::Lte, false),
    ("_GTE", CompareOp::Gte, false),
    ("_LT", CompareOp::Lt, false),
    ("_GT", CompareOp::Gt, false),
];

/// Build the predicate tree for one `where` object. `None` means the
/// object contributed no predicate at all.
pub(crate) fn from_object(
    entity: &EntityDescriptor,
    map: &Map<String, Value>,
) -> Result<Option<Filter>, TranslateError> {
    let mut items = Vec::new();
    for (key, value) in map {
        match key.as_str() {
            "AND" => {
                if let Some(filter) = combine_list(entity, key, value, Filter::And)? {
                    items.push(filter);
                }
            }
            "OR" => {
                if let Some(filter) = combine_list(entity, key, value, Filter::Or)? {
                    items.push(filter);
                }
            }
            "NOT" => {
                if let Some(inner) = from_object(entity, as_object(value, key)?)? {
                    items.push(Filter::Not(Box::new(inner)));
                }
            }
            // The discriminator is peeled off by the factory before filters
            // are built; nested occurrences are malformed input.
            "_on" => return Err(TranslateError::UnknownFilterArgument(key.clone())),
            _ => items.push(comparison(entity, key, value)?),
        }
    }
    Ok(match items.len() {
        0 => None,
        1 => items.pop(),
        _ => Some(Filter::And(items)),
    })
}

fn as_object<'a>(value: &'a Value, name: &str) -> Result<&'a Map<String, Value>, TranslateError> {
    value
        .as_object()
        .ok_or_else(|| TranslateError::InvalidArgument {
            name: name.to_string(),
            reason: "expected an object".to_string(),
        })
}

fn combine_list(
    entity: &EntityDescriptor,
    name: &str,
    value: &Value,
    wrap: fn(Vec<Filter>) -> Filter,
) -> Result<Option<Filter>, TranslateError> {
    let list = value
        .as_array()
        .ok_or_else(|| TranslateError::InvalidArgument {
            name: name.to_string(),
            reason: "expected a list of objects".to_string(),
        })?;
    let mut branches = Vec::new();
    for element in list {
        if let Some(filter) = from_object(entity, as_object(element, name)?)? {
            branches.push(filter);
        }
    }
    Ok(match branches.len() {
        0 => None,
        1 => branches.pop(),
        _ => Some(wrap(branches)),
    })
}

fn comparison(
    entity: &EntityDescriptor,
    key: &str,
    value: &Value,
) -> Result<Filter, TranslateError> {
    let (base, operator, negated) = split_key(key);
    let property = entity
        .property(base)
        .ok_or_else(|| TranslateError::UnknownFilterArgument(key.to_string()))?;
    if operator == CompareOp::In && !value.is_array() {
        return Err(TranslateError::InvalidArgument {
            name: key.to_string(),
            reason: "expected a list".to_string(),
        });
    }
    // Null only tests presence; ordering and substring operators have no
    // null semantics and must not vanish from the predicate.
    if value.is_null() && !matches!(operator, CompareOp::Eq | CompareOp::Neq) {
        return Err(TranslateError::InvalidArgument {
            name: key.to_string(),
            reason: "null supports only equality checks".to_string(),
        });
    }
    let leaf = Filter::Compare(Comparison {
        path: vec![property.storage_name.clone()],
        operator,
        value: value.clone(),
    });
    Ok(if negated {
        Filter::Not(Box::new(leaf))
    } else {
        leaf
    })
}

fn split_key(key: &str) -> (&str, CompareOp, bool) {
    for (suffix, operator, negated) in SUFFIXES {
        if let Some(base) = key.strip_suffix(suffix) {
            if !base.is_empty() {
                return (base, *operator, *negated);
            }
        }
    }
    (key, CompareOp::Eq, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::cypher_generator::expr::Variable;
    use crate::cypher_generator::{RenderEnv, ToCypher};
    use crate::graph_catalog::PropertyDescriptor;

    fn movie() -> EntityDescriptor {
        EntityDescriptor {
            type_name: "Movie".to_string(),
            labels: vec!["Movie".to_string()],
            properties: vec![
                PropertyDescriptor {
                    name: "title".to_string(),
                    storage_name: "title".to_string(),
                    nullable: false,
                },
                PropertyDescriptor {
                    name: "released".to_string(),
                    storage_name: "release_year".to_string(),
                    nullable: true,
                },
            ],
            relationships: vec![],
            members: vec![],
            auth_rules: vec![],
        }
    }

    fn render(filter: &Filter) -> String {
        let anchor = Variable::new("this");
        let mut env = RenderEnv::new();
        filter
            .transpile(&anchor)
            .map(|expr| expr.to_cypher(&mut env).unwrap())
            .unwrap_or_default()
    }

    #[test]
    fn test_plain_key_is_equality_on_the_storage_name() {
        let map = json!({ "released": 1999 });
        let filter = from_object(&movie(), map.as_object().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(render(&filter), "(this0.release_year = $param0)");
    }

    #[test]
    fn test_operator_suffixes() {
        let map = json!({ "title_CONTAINS": "mat", "released_GTE": 1990 });
        let filter = from_object(&movie(), map.as_object().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(
            render(&filter),
            "((this0.title CONTAINS $param0) AND (this0.release_year >= $param1))"
        );
    }

    #[test]
    fn test_negated_suffix_wraps_in_not() {
        let map = json!({ "title_NOT_IN": ["a", "b"] });
        let filter = from_object(&movie(), map.as_object().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(render(&filter), "NOT ((this0.title IN $param0))");
    }

    #[test]
    fn test_boolean_combinators_nest() {
        let map = json!({
            "OR": [
                { "title": "a" },
                { "NOT": { "released": 2000 } }
            ]
        });
        let filter = from_object(&movie(), map.as_object().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(
            render(&filter),
            "((this0.title = $param0) OR NOT ((this0.release_year = $param1)))"
        );
    }

    #[test]
    fn test_empty_object_builds_no_predicate() {
        let map = Map::new();
        assert_eq!(from_object(&movie(), &map).unwrap(), None);
        let map = json!({ "AND": [] });
        assert_eq!(from_object(&movie(), map.as_object().unwrap()).unwrap(), None);
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let map = json!({ "rating": 5 });
        assert_eq!(
            from_object(&movie(), map.as_object().unwrap()).unwrap_err(),
            TranslateError::UnknownFilterArgument("rating".to_string())
        );
    }

    #[test]
    fn test_null_equality_renders_a_presence_check() {
        let map = json!({ "released": null });
        let filter = from_object(&movie(), map.as_object().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(render(&filter), "(this0.release_year IS NULL)");
    }

    #[test]
    fn test_null_with_an_ordering_operator_is_rejected() {
        let map = json!({ "released_GT": null });
        assert_eq!(
            from_object(&movie(), map.as_object().unwrap()).unwrap_err(),
            TranslateError::InvalidArgument {
                name: "released_GT".to_string(),
                reason: "null supports only equality checks".to_string(),
            }
        );
    }

    #[test]
    fn test_in_requires_a_list() {
        let map = json!({ "title_IN": "not-a-list" });
        assert!(matches!(
            from_object(&movie(), map.as_object().unwrap()).unwrap_err(),
            TranslateError::InvalidArgument { .. }
        ));
    }
}
