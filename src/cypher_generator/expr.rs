//! Cypher expression AST.
//!
//! Expressions render inline through [`ToCypher`]; every node knows only how
//! to print itself against a [`RenderEnv`]. No semantic validation happens
//! here; callers are responsible for producing well-formed trees.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::clause::Clause;
use super::env::RenderEnv;
use super::errors::CypherRenderError;
use super::ToCypher;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0);

fn next_handle() -> u64 {
    NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
}

/// An identity-bearing reference to a bound row/entity in the target query.
///
/// Equality is by handle, never by the base name: two variables built from
/// the same base are still distinct identities and will receive distinct
/// rendered names from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    handle: u64,
    base: String,
}

impl Variable {
    pub fn new(base: impl Into<String>) -> Self {
        Variable {
            handle: next_handle(),
            base: base.into(),
        }
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Start a dotted property path rooted at this variable.
    pub fn property(&self, name: impl Into<String>) -> PropertyRef {
        PropertyRef {
            variable: self.clone(),
            path: vec![name.into()],
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Variable {}

impl std::hash::Hash for Variable {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

/// A variable plus a dotted path. Composing with [`PropertyRef::property`]
/// yields a new reference over the same variable; the original is untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRef {
    variable: Variable,
    path: Vec<String>,
}

impl PropertyRef {
    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn property(&self, name: impl Into<String>) -> PropertyRef {
        let mut path = self.path.clone();
        path.push(name.into());
        PropertyRef {
            variable: self.variable.clone(),
            path,
        }
    }
}

impl ToCypher for PropertyRef {
    fn to_cypher(&self, env: &mut RenderEnv) -> Result<String, CypherRenderError> {
        Ok(format!("{}.{}", env.name_of(&self.variable), self.path.join(".")))
    }
}

/// A placeholder for a literal value. The environment assigns its `$name`
/// the first time it is rendered and records the value into the parameter
/// map; later renders of the same placeholder reuse the assigned name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    handle: u64,
    value: Value,
}

impl Param {
    pub fn new(value: Value) -> Self {
        Param {
            handle: next_handle(),
            value,
        }
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CypherLiteral {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Null,
}

/// Escape a string for a single-quoted Cypher literal. Backslash first.
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

impl ToCypher for CypherLiteral {
    fn to_cypher(&self, _env: &mut RenderEnv) -> Result<String, CypherRenderError> {
        match self {
            CypherLiteral::Integer(i) => Ok(i.to_string()),
            CypherLiteral::Float(f) => {
                if f.is_finite() {
                    Ok(f.to_string())
                } else {
                    Err(CypherRenderError::NonFiniteFloat(*f))
                }
            }
            CypherLiteral::Boolean(b) => Ok(b.to_string()),
            CypherLiteral::String(s) => Ok(format!("'{}'", escape_string(s))),
            CypherLiteral::Null => Ok("NULL".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    In,
    StartsWith,
    EndsWith,
    Contains,
    And,
    Or,
    Not,
    IsNull,
    IsNotNull,
}

impl Operator {
    fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::LessThan => "<",
            Operator::LessThanEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanEqual => ">=",
            Operator::In => "IN",
            Operator::StartsWith => "STARTS WITH",
            Operator::EndsWith => "ENDS WITH",
            Operator::Contains => "CONTAINS",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorApplication {
    pub operator: Operator,
    pub operands: Vec<CypherExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnCall {
    pub name: String,
    pub args: Vec<CypherExpr>,
}

impl FnCall {
    pub fn new(name: impl Into<String>, args: Vec<CypherExpr>) -> Self {
        FnCall {
            name: name.into(),
            args,
        }
    }
}

/// A sub-statement embedded as an escaped string literal inside
/// `apoc.cypher.runFirstColumn*`. The nested clauses are rendered against
/// the SAME environment as the surrounding statement, so variable and
/// parameter names stay globally unique even though the text is spliced in
/// as a string. Bound variables and any parameters allocated while the
/// inner block rendered are forwarded through the argument map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFirstColumn {
    pub clauses: Vec<Clause>,
    pub bindings: Vec<Variable>,
    pub single: bool,
}

impl ToCypher for RunFirstColumn {
    fn to_cypher(&self, env: &mut RenderEnv) -> Result<String, CypherRenderError> {
        let params_before = env.parameter_count();

        // Phase one: render the inner block against the shared environment.
        let mut lines = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            lines.push(clause.to_cypher(env)?);
        }
        let inner = lines.join("\n");
        let embedded = inner.replace('\\', "\\\\").replace('"', "\\\"");

        // Phase two: forward correlated variables and newly allocated
        // parameters through the argument map.
        let mut args = Vec::new();
        for variable in &self.bindings {
            let name = env.name_of(variable);
            args.push(format!("{}: {}", name, name));
        }
        for name in env.parameter_names_from(params_before) {
            args.push(format!("{}: ${}", name, name));
        }

        let fn_name = if self.single {
            "apoc.cypher.runFirstColumnSingle"
        } else {
            "apoc.cypher.runFirstColumnMany"
        };
        Ok(format!("{}(\"{}\", {{ {} }})", fn_name, embedded, args.join(", ")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CypherExpr {
    Variable(Variable),

    Property(PropertyRef),

    Param(Param),

    Literal(CypherLiteral),

    /// Label predicate, e.g. `this0:Movie`.
    HasLabel { variable: Variable, label: String },

    OperatorApplication(OperatorApplication),

    FnCall(FnCall),

    /// Ordered key/expression pairs rendered as a map projection.
    MapLiteral(Vec<(String, CypherExpr)>),

    List(Vec<CypherExpr>),

    RunFirstColumn(RunFirstColumn),
}

impl CypherExpr {
    pub fn fn_call(name: impl Into<String>, args: Vec<CypherExpr>) -> CypherExpr {
        CypherExpr::FnCall(FnCall::new(name, args))
    }
}

impl ToCypher for CypherExpr {
    fn to_cypher(&self, env: &mut RenderEnv) -> Result<String, CypherRenderError> {
        match self {
            CypherExpr::Variable(v) => Ok(env.name_of(v)),
            CypherExpr::Property(p) => p.to_cypher(env),
            CypherExpr::Param(p) => Ok(format!("${}", env.parameter_for(p))),
            CypherExpr::Literal(lit) => lit.to_cypher(env),
            CypherExpr::HasLabel { variable, label } => {
                Ok(format!("{}:{}", env.name_of(variable), label))
            }
            CypherExpr::OperatorApplication(op) => {
                let operands = op
                    .operands
                    .iter()
                    .map(|o| o.to_cypher(env))
                    .collect::<Result<Vec<String>, CypherRenderError>>()?;
                let arity = |found: usize| CypherRenderError::ArityMismatch {
                    operator: op.operator.symbol(),
                    found,
                };
                match op.operator {
                    Operator::And | Operator::Or => match operands.len() {
                        0 => Err(arity(0)),
                        1 => Ok(operands.into_iter().next().unwrap_or_default()),
                        _ => Ok(format!(
                            "({})",
                            operands.join(&format!(" {} ", op.operator.symbol()))
                        )),
                    },
                    Operator::Not => {
                        let [operand] = operands.as_slice() else {
                            return Err(arity(operands.len()));
                        };
                        Ok(format!("NOT ({})", operand))
                    }
                    Operator::IsNull | Operator::IsNotNull => {
                        let [operand] = operands.as_slice() else {
                            return Err(arity(operands.len()));
                        };
                        Ok(format!("({} {})", operand, op.operator.symbol()))
                    }
                    _ => {
                        let [lhs, rhs] = operands.as_slice() else {
                            return Err(arity(operands.len()));
                        };
                        Ok(format!("({} {} {})", lhs, op.operator.symbol(), rhs))
                    }
                }
            }
            CypherExpr::FnCall(f) => {
                let args = f
                    .args
                    .iter()
                    .map(|a| a.to_cypher(env))
                    .collect::<Result<Vec<String>, CypherRenderError>>()?;
                Ok(format!("{}({})", f.name, args.join(", ")))
            }
            CypherExpr::MapLiteral(entries) => {
                if entries.is_empty() {
                    return Ok("{}".to_string());
                }
                let rendered = entries
                    .iter()
                    .map(|(key, value)| Ok(format!("{}: {}", key, value.to_cypher(env)?)))
                    .collect::<Result<Vec<String>, CypherRenderError>>()?;
                Ok(format!("{{ {} }}", rendered.join(", ")))
            }
            CypherExpr::List(items) => {
                let rendered = items
                    .iter()
                    .map(|i| i.to_cypher(env))
                    .collect::<Result<Vec<String>, CypherRenderError>>()?;
                Ok(format!("[{}]", rendered.join(", ")))
            }
            CypherExpr::RunFirstColumn(rfc) => rfc.to_cypher(env),
        }
    }
}
