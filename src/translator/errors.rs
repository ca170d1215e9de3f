use thiserror::Error;

use crate::cypher_generator::CypherRenderError;
use crate::graph_catalog::CatalogError;
use crate::query_ast::TranspileError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslateError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Transpile(#[from] TranspileError),

    #[error(transparent)]
    Render(#[from] CypherRenderError),

    #[error("entity '{type_name}' has no field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("unknown filter argument '{0}'")]
    UnknownFilterArgument(String),

    #[error("invalid value for argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },
}
