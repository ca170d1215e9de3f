//! Scope context threaded through `transpile`.
//!
//! Each nested operation gets a child context with a fresh anchor, so
//! subqueries bind new variables without shadowing the parent's. Contexts
//! are immutable per scope; only the chain of parent references grows.

use crate::cypher_generator::expr::Variable;

#[derive(Debug)]
pub struct TranslationContext<'a> {
    anchor: Variable,
    returned: Variable,
    parent: Option<&'a TranslationContext<'a>>,
}

impl<'a> TranslationContext<'a> {
    /// Root scope of a compilation.
    pub fn root() -> TranslationContext<'static> {
        TranslationContext {
            anchor: Variable::new("this"),
            returned: Variable::new("var"),
            parent: None,
        }
    }

    /// Child scope for a nested operation: fresh anchor and return
    /// variables, parented at this scope.
    pub fn child(&self) -> TranslationContext<'_> {
        TranslationContext {
            anchor: Variable::new("this"),
            returned: Variable::new("var"),
            parent: Some(self),
        }
    }

    /// Sibling scope for one branch of a composite target: fresh anchor,
    /// but the same return variable and parent, so every branch of a UNION
    /// projects under one shared name.
    pub fn branch(&self) -> TranslationContext<'a> {
        TranslationContext {
            anchor: Variable::new("this"),
            returned: self.returned.clone(),
            parent: self.parent,
        }
    }

    /// The variable bound to "this" entity within the current scope.
    pub fn anchor(&self) -> &Variable {
        &self.anchor
    }

    /// The designated return variable of the current scope.
    pub fn returned(&self) -> &Variable {
        &self.returned
    }

    pub fn parent(&self) -> Option<&TranslationContext<'a>> {
        self.parent
    }
}
