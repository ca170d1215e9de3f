use serde_json::json;

use cypherforge::cypher_generator::pattern::Direction;
use cypherforge::graph_catalog::{
    Catalog, EntityDescriptor, PropertyDescriptor, RelationshipDescriptor, RequestContext,
    SelectionRequest,
};
use cypherforge::query_ast::TranspileError;
use cypherforge::translator::{compile, TranslateError};

fn property(name: &str, storage_name: &str) -> PropertyDescriptor {
    PropertyDescriptor {
        name: name.to_string(),
        storage_name: storage_name.to_string(),
        nullable: false,
    }
}

fn movie_catalog() -> Catalog {
    let _ = env_logger::builder().is_test(true).try_init();
    Catalog::new(vec![
        EntityDescriptor {
            type_name: "Movie".to_string(),
            labels: vec!["Movie".to_string()],
            properties: vec![property("title", "title"), property("released", "release_year")],
            relationships: vec![
                RelationshipDescriptor {
                    name: "actors".to_string(),
                    rel_type: "ACTED_IN".to_string(),
                    direction: Direction::Incoming,
                    target: "Person".to_string(),
                    one_to_one: false,
                },
                RelationshipDescriptor {
                    name: "director".to_string(),
                    rel_type: "DIRECTED".to_string(),
                    direction: Direction::Incoming,
                    target: "Person".to_string(),
                    one_to_one: true,
                },
            ],
            members: vec![],
            auth_rules: vec![],
        },
        EntityDescriptor {
            type_name: "Person".to_string(),
            labels: vec!["Person".to_string()],
            properties: vec![property("name", "name")],
            relationships: vec![],
            members: vec![],
            auth_rules: vec![],
        },
    ])
    .unwrap()
}

fn movies_request() -> SelectionRequest {
    SelectionRequest {
        field_name: "movies".to_string(),
        alias: None,
        arguments: json!({ "where": { "title": "The Matrix" } })
            .as_object()
            .cloned()
            .unwrap(),
        selection: vec![SelectionRequest::new("title")],
    }
}

#[test]
fn test_simple_read_with_filter() {
    let compiled = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &movies_request(),
    )
    .unwrap();
    assert_eq!(
        compiled.text,
        "MATCH (this0:Movie)\nWHERE (this0.title = $param0)\nRETURN { title: this0.title } AS movies"
    );
    assert_eq!(compiled.parameters.len(), 1);
    assert_eq!(compiled.parameters["param0"], json!("The Matrix"));
}

#[test]
fn test_compilation_is_deterministic() {
    let catalog = movie_catalog();
    let ctx = RequestContext::default();
    let request = movies_request();
    let first = compile(&catalog, &ctx, "Movie", &request).unwrap();
    let second = compile(&catalog, &ctx, "Movie", &request).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_storage_names_differ_from_exposed_names() {
    let request = SelectionRequest {
        field_name: "movies".to_string(),
        alias: None,
        arguments: json!({ "where": { "released_GTE": 1990 } })
            .as_object()
            .cloned()
            .unwrap(),
        selection: vec![SelectionRequest::new("released")],
    };
    let compiled = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &request,
    )
    .unwrap();
    assert_eq!(
        compiled.text,
        "MATCH (this0:Movie)\nWHERE (this0.release_year >= $param0)\nRETURN { released: this0.release_year } AS movies"
    );
}

#[test]
fn test_nested_relationship_becomes_correlated_subquery() {
    let mut request = movies_request();
    request.selection.push(SelectionRequest {
        field_name: "actors".to_string(),
        alias: None,
        arguments: Default::default(),
        selection: vec![SelectionRequest::new("name")],
    });

    let compiled = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &request,
    )
    .unwrap();
    assert_eq!(
        compiled.text,
        "MATCH (this0:Movie)\n\
         WHERE (this0.title = $param0)\n\
         CALL {\n\
         \x20   WITH this0\n\
         \x20   MATCH (this0)<-[:ACTED_IN]-(this1:Person)\n\
         \x20   RETURN collect({ name: this1.name }) AS var0\n\
         }\n\
         RETURN { title: this0.title, actors: var0 } AS movies"
    );
}

#[test]
fn test_one_to_one_relationship_projects_collection_head() {
    let mut request = movies_request();
    request.selection.push(SelectionRequest {
        field_name: "director".to_string(),
        alias: None,
        arguments: Default::default(),
        selection: vec![SelectionRequest::new("name")],
    });

    let compiled = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &request,
    )
    .unwrap();
    assert!(compiled
        .text
        .contains("RETURN head(collect({ name: this1.name })) AS var0"));
    assert!(compiled.text.contains("(this0)<-[:DIRECTED]-(this1:Person)"));
}

#[test]
fn test_sort_and_pagination_render_after_the_match() {
    let request = SelectionRequest {
        field_name: "movies".to_string(),
        alias: None,
        arguments: json!({
            "sort": [{ "title": "ASC" }, { "released": "DESC" }],
            "offset": 10,
            "limit": 5
        })
        .as_object()
        .cloned()
        .unwrap(),
        selection: vec![SelectionRequest::new("title")],
    };
    let compiled = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &request,
    )
    .unwrap();
    assert_eq!(
        compiled.text,
        "MATCH (this0:Movie)\n\
         WITH this0\n\
         ORDER BY this0.title ASC, this0.release_year DESC\n\
         SKIP $param0\n\
         LIMIT $param1\n\
         RETURN { title: this0.title } AS movies"
    );
    assert_eq!(compiled.parameters["param0"], json!(10));
    assert_eq!(compiled.parameters["param1"], json!(5));
}

#[test]
fn test_pagination_binds_before_nested_subqueries() {
    let request = SelectionRequest {
        field_name: "movies".to_string(),
        alias: None,
        arguments: json!({ "sort": [{ "title": "ASC" }], "limit": 5 })
            .as_object()
            .cloned()
            .unwrap(),
        selection: vec![
            SelectionRequest::new("title"),
            SelectionRequest {
                field_name: "actors".to_string(),
                alias: None,
                arguments: Default::default(),
                selection: vec![SelectionRequest::new("name")],
            },
        ],
    };
    let compiled = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &request,
    )
    .unwrap();
    assert_eq!(
        compiled.text,
        "MATCH (this0:Movie)\n\
         WITH this0\n\
         ORDER BY this0.title ASC\n\
         LIMIT $param0\n\
         CALL {\n\
         \x20   WITH this0\n\
         \x20   MATCH (this0)<-[:ACTED_IN]-(this1:Person)\n\
         \x20   RETURN collect({ name: this1.name }) AS var0\n\
         }\n\
         RETURN { title: this0.title, actors: var0 } AS movies"
    );
    assert_eq!(compiled.parameters["param0"], json!(5));
}

#[test]
fn test_typename_on_a_concrete_read_projects_the_type_name() {
    let request = SelectionRequest {
        field_name: "movies".to_string(),
        alias: None,
        arguments: Default::default(),
        selection: vec![
            SelectionRequest::new("__typename"),
            SelectionRequest::new("title"),
        ],
    };
    let compiled = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &request,
    )
    .unwrap();
    assert_eq!(
        compiled.text,
        "MATCH (this0:Movie)\nRETURN { __typename: 'Movie', title: this0.title } AS movies"
    );
}

#[test]
fn test_fulltext_argument_anchors_through_the_index_procedure() {
    let request = SelectionRequest {
        field_name: "movies".to_string(),
        alias: None,
        arguments: json!({ "fulltext": { "index": "MovieTitle", "phrase": "matrix" } })
            .as_object()
            .cloned()
            .unwrap(),
        selection: vec![SelectionRequest::new("title")],
    };
    let compiled = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &request,
    )
    .unwrap();
    assert_eq!(
        compiled.text,
        "CALL db.index.fulltext.queryNodes($param0, $param1) YIELD node AS this0\n\
         WHERE this0:Movie\n\
         RETURN { title: this0.title } AS movies"
    );
    assert_eq!(compiled.parameters["param0"], json!("MovieTitle"));
    assert_eq!(compiled.parameters["param1"], json!("matrix"));
}

#[test]
fn test_fulltext_argument_is_ignored_when_disabled() {
    let request = SelectionRequest {
        field_name: "movies".to_string(),
        alias: None,
        arguments: json!({ "fulltext": { "index": "MovieTitle", "phrase": "matrix" } })
            .as_object()
            .cloned()
            .unwrap(),
        selection: vec![SelectionRequest::new("title")],
    };
    let mut ctx = RequestContext::default();
    ctx.flags.fulltext = false;
    let compiled = compile(&movie_catalog(), &ctx, "Movie", &request).unwrap();
    assert_eq!(
        compiled.text,
        "MATCH (this0:Movie)\nRETURN { title: this0.title } AS movies"
    );
    assert!(compiled.parameters.is_empty());
}

#[test]
fn test_root_aggregate_operation() {
    let request = SelectionRequest {
        field_name: "moviesAggregate".to_string(),
        alias: None,
        arguments: Default::default(),
        selection: vec![
            SelectionRequest::new("count"),
            SelectionRequest {
                field_name: "released".to_string(),
                alias: None,
                arguments: Default::default(),
                selection: vec![SelectionRequest::new("min"), SelectionRequest::new("max")],
            },
        ],
    };
    let compiled = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &request,
    )
    .unwrap();
    assert_eq!(
        compiled.text,
        "MATCH (this0:Movie)\n\
         RETURN { count: count(this0), released: { min: min(this0.release_year), max: max(this0.release_year) } } AS moviesAggregate"
    );
}

#[test]
fn test_root_connection_operation() {
    let request = SelectionRequest {
        field_name: "moviesConnection".to_string(),
        alias: None,
        arguments: json!({ "where": { "title": "The Matrix" } })
            .as_object()
            .cloned()
            .unwrap(),
        selection: vec![
            SelectionRequest {
                field_name: "edges".to_string(),
                alias: None,
                arguments: Default::default(),
                selection: vec![SelectionRequest {
                    field_name: "node".to_string(),
                    alias: None,
                    arguments: Default::default(),
                    selection: vec![SelectionRequest::new("title")],
                }],
            },
            SelectionRequest::new("totalCount"),
        ],
    };
    let compiled = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &request,
    )
    .unwrap();
    assert_eq!(
        compiled.text,
        "MATCH (this0:Movie)\n\
         WHERE (this0.title = $param0)\n\
         RETURN { edges: collect({ node: { title: this0.title } }), totalCount: count(this0) } AS moviesConnection"
    );
}

#[test]
fn test_empty_selection_is_rejected() {
    let request = SelectionRequest::new("movies");
    let err = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &request,
    )
    .unwrap_err();
    assert_eq!(
        err,
        TranslateError::Transpile(TranspileError::EmptySelection("Movie".to_string()))
    );
}

#[test]
fn test_unknown_entity_and_unknown_field() {
    let catalog = movie_catalog();
    let ctx = RequestContext::default();
    assert!(matches!(
        compile(&catalog, &ctx, "Book", &movies_request()).unwrap_err(),
        TranslateError::Catalog(_)
    ));

    let mut request = movies_request();
    request.selection.push(SelectionRequest::new("rating"));
    assert_eq!(
        compile(&catalog, &ctx, "Movie", &request).unwrap_err(),
        TranslateError::UnknownField {
            type_name: "Movie".to_string(),
            field: "rating".to_string(),
        }
    );
}

#[test]
fn test_output_alias_overrides_field_name() {
    let mut request = movies_request();
    request.alias = Some("films".to_string());
    let compiled = compile(
        &movie_catalog(),
        &RequestContext::default(),
        "Movie",
        &request,
    )
    .unwrap();
    assert!(compiled.text.ends_with("AS films"));
}
