//! Node and relationship patterns for MATCH clauses.

use serde::{Deserialize, Serialize};

use super::env::RenderEnv;
use super::errors::CypherRenderError;
use super::expr::{CypherExpr, Variable};
use super::ToCypher;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePattern {
    pub variable: Variable,
    pub labels: Vec<String>,
    pub properties: Vec<(String, CypherExpr)>,
}

impl NodePattern {
    pub fn new(variable: Variable, labels: Vec<String>) -> Self {
        NodePattern {
            variable,
            labels,
            properties: Vec::new(),
        }
    }

    /// Anonymous-label node, used for the already-bound end of a
    /// correlated pattern.
    pub fn bound(variable: Variable) -> Self {
        NodePattern::new(variable, Vec::new())
    }
}

impl ToCypher for NodePattern {
    fn to_cypher(&self, env: &mut RenderEnv) -> Result<String, CypherRenderError> {
        let mut out = format!("({}", env.name_of(&self.variable));
        for label in &self.labels {
            out.push(':');
            out.push_str(label);
        }
        if !self.properties.is_empty() {
            let rendered = self
                .properties
                .iter()
                .map(|(key, value)| Ok(format!("{}: {}", key, value.to_cypher(env)?)))
                .collect::<Result<Vec<String>, CypherRenderError>>()?;
            out.push_str(&format!(" {{ {} }}", rendered.join(", ")));
        }
        out.push(')');
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipPattern {
    pub variable: Option<Variable>,
    pub rel_type: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSegment {
    pub relationship: RelationshipPattern,
    pub node: NodePattern,
}

/// A linear path pattern: a start node plus zero or more relationship hops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub start: NodePattern,
    pub segments: Vec<PatternSegment>,
}

impl Pattern {
    pub fn node(start: NodePattern) -> Self {
        Pattern {
            start,
            segments: Vec::new(),
        }
    }

    pub fn hop(start: NodePattern, relationship: RelationshipPattern, node: NodePattern) -> Self {
        Pattern {
            start,
            segments: vec![PatternSegment { relationship, node }],
        }
    }
}

impl ToCypher for Pattern {
    fn to_cypher(&self, env: &mut RenderEnv) -> Result<String, CypherRenderError> {
        let mut out = self.start.to_cypher(env)?;
        for segment in &self.segments {
            let rel = &segment.relationship;
            let name = match &rel.variable {
                Some(v) => env.name_of(v),
                None => String::new(),
            };
            let arrow = match rel.direction {
                Direction::Outgoing => format!("-[{}:{}]->", name, rel.rel_type),
                Direction::Incoming => format!("<-[{}:{}]-", name, rel.rel_type),
            };
            out.push_str(&arrow);
            out.push_str(&segment.node.to_cypher(env)?);
        }
        Ok(out)
    }
}
