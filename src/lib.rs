//! Cypherforge - selection-to-Cypher compiler
//!
//! This crate compiles declarative selection requests into parameterized
//! Cypher through:
//! - A catalog describing entities, properties, relationships and auth rules
//! - A selection AST with a pure transpilation protocol
//! - A Cypher clause/expression AST rendered against one naming environment
//! - A translation factory wiring selection requests to all of the above

pub mod cypher_generator;
pub mod graph_catalog;
pub mod query_ast;
pub mod translator;

pub use graph_catalog::{Catalog, EntityDescriptor, RequestContext, SelectionRequest};
pub use translator::{compile, CompiledQuery, TranslateError};
