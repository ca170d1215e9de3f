//! End-to-end translation: selection request in, parameterized Cypher out.
//!
//! `compile` is the single entry point. It owns one `RenderEnv` per call;
//! nothing is shared across compilations, so concurrent callers only need
//! shared references to the catalog.

pub mod factory;

mod auth;
mod errors;
mod filter_builder;

pub use errors::TranslateError;
pub use factory::TranslationServices;

use serde_json::{Map, Value};

use crate::cypher_generator::clause::{Clause, ProjectionItem, ReturnClause};
use crate::cypher_generator::{RenderEnv, ToCypher};
use crate::graph_catalog::{Catalog, RequestContext, SelectionRequest};
use crate::query_ast::TranslationContext;

/// Rendered statement text plus its parameter map, in allocation order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub text: String,
    pub parameters: Map<String, Value>,
}

/// Compile one selection request against the named catalog entity.
pub fn compile(
    catalog: &Catalog,
    request_ctx: &RequestContext,
    entity_name: &str,
    request: &SelectionRequest,
) -> Result<CompiledQuery, TranslateError> {
    log::debug!(
        "compiling field '{}' against entity '{}'",
        request.field_name,
        entity_name
    );
    let services = TranslationServices::new(catalog, request_ctx);
    let operation = services.build_operation(entity_name, request)?;

    let ctx = TranslationContext::root();
    let transpiled = operation.transpile(&ctx)?;

    let mut env = RenderEnv::new();
    let mut parts = Vec::with_capacity(transpiled.clauses.len() + 1);
    for clause in &transpiled.clauses {
        parts.push(clause.to_cypher(&mut env)?);
    }
    parts.push(
        Clause::Return(ReturnClause::single(ProjectionItem::as_name(
            transpiled.projection,
            request.output_alias(),
        )))
        .to_cypher(&mut env)?,
    );

    let text = parts.join("\n");
    log::debug!("compiled:\n{}", text);
    Ok(CompiledQuery {
        text,
        parameters: env.into_parameters(),
    })
}
