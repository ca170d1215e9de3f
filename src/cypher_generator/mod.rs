//! Cypher expression/clause AST and its environment-scoped renderer.
//!
//! This is the compile target of the selection AST: patterns, expressions
//! and clauses that render themselves to parameterized Cypher text through
//! a per-compilation [`RenderEnv`].

pub mod clause;
pub mod env;
mod errors;
pub mod expr;
pub mod pattern;

pub use env::RenderEnv;
pub use errors::CypherRenderError;

/// Render a node to Cypher text against the compilation's environment.
pub trait ToCypher {
    fn to_cypher(&self, env: &mut RenderEnv) -> Result<String, CypherRenderError>;
}
