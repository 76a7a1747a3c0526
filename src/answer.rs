use itertools::Itertools;
use tracing::debug;

use crate::{
    error::{Error, Result},
    generator::FieldNode,
    program::{Atom, Program, Rule, Term, Variable},
};

pub const ANSWER_PREDICATE: &str = "ans";

/// Scalar leaf variables of `fields`, depth-first and left to right. This
/// order is the column order of `ans`.
pub fn leaf_variables(fields: &[FieldNode]) -> Vec<Variable> {
    fn collect(node: &FieldNode, out: &mut Vec<Variable>) {
        if node.is_leaf() {
            out.push(node.var.clone());
        }
        for child in &node.children {
            collect(child, out);
        }
    }

    let mut vars = vec![];
    for field in fields {
        collect(field, &mut vars);
    }
    vars
}

/// Builds `ans(V1, ..., Vn) :- <root result goals>.` for `program`, which
/// must define every root `_result` predicate.
pub fn assemble(program: &Program, fields: &[FieldNode]) -> Result<Rule> {
    if let Some(missing) = fields
        .iter()
        .find(|field| !program.defines(&field.result.predicate))
    {
        return Err(Error::InternalInvariant(format!(
            "no rule defines `{}` for root field `{}`",
            missing.result.predicate, missing.path
        )));
    }

    let vars = leaf_variables(fields);
    if !vars.iter().all_unique() {
        return Err(Error::InternalInvariant(
            "scalar leaves share a result variable".to_owned(),
        ));
    }

    let head = Atom::new(ANSWER_PREDICATE, vars.into_iter().map(Term::Var).collect());
    let body = fields.iter().map(|field| field.result.clone()).collect();
    debug!(arity = head.arity(), "assembled answer rule");

    Ok(Rule::new(head, body))
}
