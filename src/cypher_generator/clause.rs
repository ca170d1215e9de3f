//! Cypher clause AST.
//!
//! A clause renders to one or more lines of Cypher. Clauses may own nested
//! clauses (subqueries), which render into indented `CALL { ... }` blocks;
//! all rendering routes through one shared [`RenderEnv`] so names stay
//! globally unique.

use serde::{Deserialize, Serialize};

use super::env::RenderEnv;
use super::errors::CypherRenderError;
use super::expr::{CypherExpr, PropertyRef, Variable};
use super::pattern::Pattern;
use super::ToCypher;

const INDENT: &str = "    ";

/// Projection alias: either a builder-managed variable (named through the
/// environment) or a fixed output name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Alias {
    Var(Variable),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionItem {
    pub expression: CypherExpr,
    pub alias: Option<Alias>,
}

impl ProjectionItem {
    pub fn bare(expression: CypherExpr) -> Self {
        ProjectionItem {
            expression,
            alias: None,
        }
    }

    pub fn as_var(expression: CypherExpr, variable: Variable) -> Self {
        ProjectionItem {
            expression,
            alias: Some(Alias::Var(variable)),
        }
    }

    pub fn as_name(expression: CypherExpr, name: impl Into<String>) -> Self {
        ProjectionItem {
            expression,
            alias: Some(Alias::Name(name.into())),
        }
    }

    fn to_cypher(&self, env: &mut RenderEnv) -> Result<String, CypherRenderError> {
        let rendered = self.expression.to_cypher(env)?;
        match &self.alias {
            None => Ok(rendered),
            Some(Alias::Var(v)) => Ok(format!("{} AS {}", rendered, env.name_of(v))),
            Some(Alias::Name(n)) => Ok(format!("{} AS {}", rendered, n)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub expression: CypherExpr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchClause {
    pub optional: bool,
    pub pattern: Pattern,
    pub where_clause: Option<CypherExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithClause {
    pub items: Vec<ProjectionItem>,
    pub distinct: bool,
    pub where_clause: Option<CypherExpr>,
    pub order_by: Vec<OrderItem>,
    pub skip: Option<CypherExpr>,
    pub limit: Option<CypherExpr>,
}

impl WithClause {
    /// `WITH <variable>` carrying a single bound row forward.
    pub fn carry(variable: Variable) -> Self {
        WithClause {
            items: vec![ProjectionItem::bare(CypherExpr::Variable(variable))],
            distinct: false,
            where_clause: None,
            order_by: Vec::new(),
            skip: None,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnClause {
    pub items: Vec<ProjectionItem>,
    pub distinct: bool,
    pub order_by: Vec<OrderItem>,
    pub skip: Option<CypherExpr>,
    pub limit: Option<CypherExpr>,
}

impl ReturnClause {
    pub fn single(item: ProjectionItem) -> Self {
        ReturnClause {
            items: vec![item],
            distinct: false,
            order_by: Vec::new(),
            skip: None,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetClause {
    pub items: Vec<(PropertyRef, CypherExpr)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallProcedureClause {
    pub procedure: String,
    pub args: Vec<CypherExpr>,
    /// `YIELD <column> AS <variable>` bindings.
    pub yields: Vec<(String, Variable)>,
    pub where_clause: Option<CypherExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSubqueryClause {
    /// Variables imported from the outer scope via a leading `WITH`.
    pub imports: Vec<Variable>,
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionClause {
    pub branches: Vec<Vec<Clause>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    Match(MatchClause),
    With(WithClause),
    Return(ReturnClause),
    Set(SetClause),
    CallProcedure(CallProcedureClause),
    CallSubquery(CallSubqueryClause),
    Union(UnionClause),
}

/// Render ORDER BY / SKIP / LIMIT tails shared by WITH and RETURN.
fn render_tail(
    out: &mut String,
    order_by: &[OrderItem],
    skip: &Option<CypherExpr>,
    limit: &Option<CypherExpr>,
    env: &mut RenderEnv,
) -> Result<(), CypherRenderError> {
    if !order_by.is_empty() {
        let rendered = order_by
            .iter()
            .map(|item| {
                let direction = if item.descending { "DESC" } else { "ASC" };
                Ok(format!("{} {}", item.expression.to_cypher(env)?, direction))
            })
            .collect::<Result<Vec<String>, CypherRenderError>>()?;
        out.push_str(&format!("\nORDER BY {}", rendered.join(", ")));
    }
    if let Some(skip) = skip {
        out.push_str(&format!("\nSKIP {}", skip.to_cypher(env)?));
    }
    if let Some(limit) = limit {
        out.push_str(&format!("\nLIMIT {}", limit.to_cypher(env)?));
    }
    Ok(())
}

fn indent_block(text: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", INDENT, line))
        .collect::<Vec<String>>()
        .join("\n")
}

fn render_clause_list(
    clauses: &[Clause],
    env: &mut RenderEnv,
) -> Result<String, CypherRenderError> {
    let rendered = clauses
        .iter()
        .map(|c| c.to_cypher(env))
        .collect::<Result<Vec<String>, CypherRenderError>>()?;
    Ok(rendered.join("\n"))
}

impl ToCypher for Clause {
    fn to_cypher(&self, env: &mut RenderEnv) -> Result<String, CypherRenderError> {
        match self {
            Clause::Match(m) => {
                let keyword = if m.optional { "OPTIONAL MATCH" } else { "MATCH" };
                let mut out = format!("{} {}", keyword, m.pattern.to_cypher(env)?);
                if let Some(predicate) = &m.where_clause {
                    out.push_str(&format!("\nWHERE {}", predicate.to_cypher(env)?));
                }
                Ok(out)
            }
            Clause::With(w) => {
                let items = w
                    .items
                    .iter()
                    .map(|i| i.to_cypher(env))
                    .collect::<Result<Vec<String>, CypherRenderError>>()?;
                let distinct = if w.distinct { "DISTINCT " } else { "" };
                let mut out = format!("WITH {}{}", distinct, items.join(", "));
                if let Some(predicate) = &w.where_clause {
                    out.push_str(&format!("\nWHERE {}", predicate.to_cypher(env)?));
                }
                render_tail(&mut out, &w.order_by, &w.skip, &w.limit, env)?;
                Ok(out)
            }
            Clause::Return(r) => {
                if r.items.is_empty() {
                    return Err(CypherRenderError::EmptyReturn);
                }
                let items = r
                    .items
                    .iter()
                    .map(|i| i.to_cypher(env))
                    .collect::<Result<Vec<String>, CypherRenderError>>()?;
                let distinct = if r.distinct { "DISTINCT " } else { "" };
                let mut out = format!("RETURN {}{}", distinct, items.join(", "));
                render_tail(&mut out, &r.order_by, &r.skip, &r.limit, env)?;
                Ok(out)
            }
            Clause::Set(s) => {
                if s.items.is_empty() {
                    return Err(CypherRenderError::EmptySetClause);
                }
                let assignments = s
                    .items
                    .iter()
                    .map(|(target, value)| {
                        Ok(format!(
                            "{} = {}",
                            target.to_cypher(env)?,
                            value.to_cypher(env)?
                        ))
                    })
                    .collect::<Result<Vec<String>, CypherRenderError>>()?;
                Ok(format!("SET {}", assignments.join(", ")))
            }
            Clause::CallProcedure(c) => {
                let args = c
                    .args
                    .iter()
                    .map(|a| a.to_cypher(env))
                    .collect::<Result<Vec<String>, CypherRenderError>>()?;
                let mut out = format!("CALL {}({})", c.procedure, args.join(", "));
                if !c.yields.is_empty() {
                    let yields = c
                        .yields
                        .iter()
                        .map(|(column, variable)| {
                            format!("{} AS {}", column, env.name_of(variable))
                        })
                        .collect::<Vec<String>>();
                    out.push_str(&format!(" YIELD {}", yields.join(", ")));
                }
                if let Some(predicate) = &c.where_clause {
                    out.push_str(&format!("\nWHERE {}", predicate.to_cypher(env)?));
                }
                Ok(out)
            }
            Clause::CallSubquery(c) => {
                if c.clauses.is_empty() {
                    return Err(CypherRenderError::EmptyCallSubquery);
                }
                let mut inner = String::new();
                if !c.imports.is_empty() {
                    let names = c
                        .imports
                        .iter()
                        .map(|v| env.name_of(v))
                        .collect::<Vec<String>>();
                    inner.push_str(&format!("WITH {}\n", names.join(", ")));
                }
                inner.push_str(&render_clause_list(&c.clauses, env)?);
                Ok(format!("CALL {{\n{}\n}}", indent_block(&inner)))
            }
            Clause::Union(u) => {
                if u.branches.len() < 2 {
                    return Err(CypherRenderError::DegenerateUnion);
                }
                let rendered = u
                    .branches
                    .iter()
                    .map(|branch| render_clause_list(branch, env))
                    .collect::<Result<Vec<String>, CypherRenderError>>()?;
                Ok(rendered.join("\nUNION\n"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::cypher_generator::expr::{Operator, OperatorApplication, Param};
    use crate::cypher_generator::pattern::NodePattern;

    #[test]
    fn test_match_with_where_renders_on_two_lines() {
        let v = Variable::new("this");
        let clause = Clause::Match(MatchClause {
            optional: false,
            pattern: Pattern::node(NodePattern::new(v.clone(), vec!["Movie".to_string()])),
            where_clause: Some(CypherExpr::OperatorApplication(OperatorApplication {
                operator: Operator::Equal,
                operands: vec![
                    CypherExpr::Property(v.property("title")),
                    CypherExpr::Param(Param::new(json!("matrix"))),
                ],
            })),
        });
        let mut env = RenderEnv::new();
        assert_eq!(
            clause.to_cypher(&mut env).unwrap(),
            "MATCH (this0:Movie)\nWHERE (this0.title = $param0)"
        );
    }

    #[test]
    fn test_with_order_skip_limit() {
        let v = Variable::new("this");
        let mut clause = WithClause::carry(v.clone());
        clause.order_by.push(OrderItem {
            expression: CypherExpr::Property(v.property("title")),
            descending: false,
        });
        clause.skip = Some(CypherExpr::Param(Param::new(json!(5))));
        clause.limit = Some(CypherExpr::Param(Param::new(json!(10))));
        let mut env = RenderEnv::new();
        assert_eq!(
            Clause::With(clause).to_cypher(&mut env).unwrap(),
            "WITH this0\nORDER BY this0.title ASC\nSKIP $param0\nLIMIT $param1"
        );
    }

    #[test]
    fn test_call_subquery_indents_and_imports() {
        let outer = Variable::new("this");
        let ret = Variable::new("var");
        let clause = Clause::CallSubquery(CallSubqueryClause {
            imports: vec![outer.clone()],
            clauses: vec![Clause::Return(ReturnClause::single(ProjectionItem::as_var(
                CypherExpr::fn_call("collect", vec![CypherExpr::Variable(outer.clone())]),
                ret,
            )))],
        });
        let mut env = RenderEnv::new();
        assert_eq!(
            clause.to_cypher(&mut env).unwrap(),
            "CALL {\n    WITH this0\n    RETURN collect(this0) AS var0\n}"
        );
    }

    #[test]
    fn test_set_clause_renders_assignments() {
        let v = Variable::new("this");
        let clause = Clause::Set(SetClause {
            items: vec![
                (
                    v.property("title"),
                    CypherExpr::Param(Param::new(json!("renamed"))),
                ),
                (
                    v.property("views"),
                    CypherExpr::Literal(super::super::expr::CypherLiteral::Integer(1)),
                ),
            ],
        });
        let mut env = RenderEnv::new();
        assert_eq!(
            clause.to_cypher(&mut env).unwrap(),
            "SET this0.title = $param0, this0.views = 1"
        );
    }

    #[test]
    fn test_empty_set_clause_is_an_error() {
        let clause = Clause::Set(SetClause { items: vec![] });
        let mut env = RenderEnv::new();
        assert_eq!(
            clause.to_cypher(&mut env).unwrap_err(),
            CypherRenderError::EmptySetClause
        );
    }

    #[test]
    fn test_call_procedure_with_yield_and_where() {
        let v = Variable::new("this");
        let clause = Clause::CallProcedure(CallProcedureClause {
            procedure: "db.index.fulltext.queryNodes".to_string(),
            args: vec![
                CypherExpr::Param(Param::new(json!("MovieTitle"))),
                CypherExpr::Param(Param::new(json!("matrix"))),
            ],
            yields: vec![("node".to_string(), v.clone())],
            where_clause: Some(CypherExpr::HasLabel {
                variable: v,
                label: "Movie".to_string(),
            }),
        });
        let mut env = RenderEnv::new();
        assert_eq!(
            clause.to_cypher(&mut env).unwrap(),
            "CALL db.index.fulltext.queryNodes($param0, $param1) YIELD node AS this0\nWHERE this0:Movie"
        );
    }

    #[test]
    fn test_run_first_column_shares_parameter_counter() {
        use crate::cypher_generator::expr::RunFirstColumn;

        let outer = Variable::new("this");
        let inner = Variable::new("this");
        let mut env = RenderEnv::new();
        // Outer parameter allocated before the embedded block renders.
        let outer_param = Param::new(json!("outer"));
        assert_eq!(env.parameter_for(&outer_param), "param0");
        env.name_of(&outer);

        let rfc = CypherExpr::RunFirstColumn(RunFirstColumn {
            clauses: vec![
                Clause::Match(MatchClause {
                    optional: false,
                    pattern: Pattern::node(NodePattern::new(
                        inner.clone(),
                        vec!["Person".to_string()],
                    )),
                    where_clause: Some(CypherExpr::OperatorApplication(OperatorApplication {
                        operator: Operator::Equal,
                        operands: vec![
                            CypherExpr::Property(inner.property("name")),
                            CypherExpr::Param(Param::new(json!("keanu"))),
                        ],
                    })),
                }),
                Clause::Return(ReturnClause::single(ProjectionItem::bare(
                    CypherExpr::fn_call("count", vec![CypherExpr::Variable(inner)]),
                ))),
            ],
            bindings: vec![outer],
            single: true,
        });
        let rendered = rfc.to_cypher(&mut env).unwrap();
        // The embedded block keeps the global numbering: its parameter is
        // param1, not a restarted param0, and it is forwarded in the args.
        assert_eq!(
            rendered,
            "apoc.cypher.runFirstColumnSingle(\"MATCH (this1:Person)\nWHERE (this1.name = $param1)\nRETURN count(this1)\", { this0: this0, param1: $param1 })"
        );
        let params = env.into_parameters();
        assert_eq!(params["param1"], json!("keanu"));
    }
}
