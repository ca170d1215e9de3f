use thiserror::Error;

use crate::cypher_generator::CypherRenderError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranspileError {
    #[error("projection for field '{0}' was read before its operation transpiled")]
    ProjectionBeforeTranspile(String),

    #[error("operation on '{0}' selects no fields")]
    EmptySelection(String),

    #[error("correlated operation on '{0}' transpiled without a parent scope")]
    MissingParentScope(String),

    #[error(transparent)]
    Render(#[from] CypherRenderError),
}
