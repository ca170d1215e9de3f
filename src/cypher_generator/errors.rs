use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CypherRenderError {
    #[error("RETURN clause has no items")]
    EmptyReturn,

    #[error("SET clause has no assignments")]
    EmptySetClause,

    #[error("CALL subquery contains no clauses")]
    EmptyCallSubquery,

    #[error("UNION has fewer than two branches")]
    DegenerateUnion,

    #[error("non-finite float {0} cannot be rendered as a Cypher literal")]
    NonFiniteFloat(f64),

    #[error("operator {operator} applied to {found} operands")]
    ArityMismatch {
        operator: &'static str,
        found: usize,
    },
}
