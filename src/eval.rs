//! Naive bottom-up evaluation of a generated program over a set of ground
//! facts. Every rule is re-applied until a round derives nothing new.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::{
    answer::ANSWER_PREDICATE,
    ast::Literal,
    error::{Error, Result},
    program::{Atom, Comparison, PredicateName, Program, Rule, Term, Variable},
};

pub type Tuple = Vec<Literal>;

type Bindings = HashMap<Variable, Literal>;

/// Ground facts, grouped by predicate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FactBase {
    relations: HashMap<PredicateName, HashSet<Tuple>>,
}

impl FactBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_atoms<'a>(atoms: impl IntoIterator<Item = &'a Atom>) -> Result<Self> {
        let mut base = Self::new();
        for atom in atoms {
            base.insert_atom(atom)?;
        }
        Ok(base)
    }

    pub fn insert(&mut self, predicate: &str, tuple: Tuple) -> bool {
        self.relations
            .entry(predicate.to_owned())
            .or_default()
            .insert(tuple)
    }

    pub fn insert_atom(&mut self, atom: &Atom) -> Result<bool> {
        let tuple = atom
            .args
            .iter()
            .map(|term| match term {
                Term::Lit(literal) => Ok(literal.clone()),
                Term::Var(var) => Err(Error::InternalInvariant(format!(
                    "fact `{}` mentions variable {:?}",
                    atom.predicate, var
                ))),
            })
            .collect::<Result<_>>()?;
        Ok(self.insert(&atom.predicate, tuple))
    }

    pub fn contains(&self, predicate: &str, tuple: &Tuple) -> bool {
        self.relations
            .get(predicate)
            .map_or(false, |relation| relation.contains(tuple))
    }

    /// The tuples of `predicate`, sorted.
    pub fn relation(&self, predicate: &str) -> BTreeSet<Tuple> {
        self.tuples(predicate).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.relations.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tuples(&self, predicate: &str) -> impl Iterator<Item = &Tuple> {
        self.relations.get(predicate).into_iter().flatten()
    }
}

/// Computes the least fixpoint of `program` over `base`.
pub fn evaluate(program: &Program, base: &FactBase) -> Result<FactBase> {
    for rule in &program.rules {
        check_range_restricted(rule)?;
    }

    let mut db = base.clone();
    for fact in &program.facts {
        db.insert_atom(fact)?;
    }

    let mut rounds = 0;
    loop {
        rounds += 1;

        let mut derived = vec![];
        for rule in &program.rules {
            for bindings in solve(&db, &rule.body) {
                let tuple = ground(&rule.head, &bindings)?;
                if !db.contains(&rule.head.predicate, &tuple) {
                    derived.push((&rule.head.predicate, tuple));
                }
            }
        }

        let mut changed = false;
        for (predicate, tuple) in derived {
            changed |= db.insert(predicate, tuple);
        }
        if !changed {
            break;
        }
    }

    debug!(rounds, facts = db.len(), "reached fixpoint");
    Ok(db)
}

/// The `ans` relation of `program` over `base`.
pub fn answers(program: &Program, base: &FactBase) -> Result<BTreeSet<Tuple>> {
    Ok(evaluate(program, base)?.relation(ANSWER_PREDICATE))
}

fn check_range_restricted(rule: &Rule) -> Result<()> {
    let mut bound: HashSet<&Variable> = HashSet::new();
    for goal in &rule.body {
        if goal.comparison().is_none() {
            bound.extend(goal.variables());
        } else if let Some(var) = goal.variables().find(|var| !bound.contains(var)) {
            return Err(Error::InternalInvariant(format!(
                "variable {:?} is compared before any goal of `{}` binds it",
                var, rule.head.predicate
            )));
        }
    }

    match rule.head.variables().find(|var| !bound.contains(var)) {
        Some(var) => Err(Error::InternalInvariant(format!(
            "head variable {:?} of `{}` does not occur in the rule body",
            var, rule.head.predicate
        ))),
        None => Ok(()),
    }
}

/// All bindings satisfying `body`, joining goals left to right.
fn solve(db: &FactBase, body: &[Atom]) -> Vec<Bindings> {
    let mut solutions = vec![Bindings::new()];
    for goal in body {
        if let Some(op) = goal.comparison() {
            solutions.retain(|bindings| compare(op, goal, bindings));
            if solutions.is_empty() {
                break;
            }
            continue;
        }

        let mut next = vec![];
        for bindings in &solutions {
            next.extend(
                db.tuples(&goal.predicate)
                    .filter_map(|tuple| unify(goal, tuple, bindings)),
            );
        }
        solutions = next;
        if solutions.is_empty() {
            break;
        }
    }
    solutions
}

/// Both sides are bound by the time a comparison runs; incomparable values
/// fail the goal.
fn compare(op: Comparison, goal: &Atom, bindings: &Bindings) -> bool {
    fn value<'a>(term: &'a Term, bindings: &'a Bindings) -> Option<&'a Literal> {
        match term {
            Term::Lit(literal) => Some(literal),
            Term::Var(var) => bindings.get(var),
        }
    }

    match (value(&goal.args[0], bindings), value(&goal.args[1], bindings)) {
        (Some(lhs), Some(rhs)) => lhs.compare(rhs).map_or(false, |ordering| op.holds(ordering)),
        _ => false,
    }
}

fn unify(goal: &Atom, tuple: &Tuple, bindings: &Bindings) -> Option<Bindings> {
    if goal.arity() != tuple.len() {
        return None;
    }

    let mut extended = bindings.clone();
    for (term, value) in goal.args.iter().zip(tuple) {
        match term {
            Term::Lit(literal) if literal != value => return None,
            Term::Lit(_) => {}
            Term::Var(var) => match extended.get(var) {
                Some(bound) if bound != value => return None,
                Some(_) => {}
                None => {
                    extended.insert(var.clone(), value.clone());
                }
            },
        }
    }
    Some(extended)
}

fn ground(head: &Atom, bindings: &Bindings) -> Result<Tuple> {
    head.args
        .iter()
        .map(|term| match term {
            Term::Lit(literal) => Ok(literal.clone()),
            Term::Var(var) => bindings.get(var).cloned().ok_or_else(|| {
                Error::InternalInvariant(format!(
                    "head variable {:?} of `{}` left unbound",
                    var, head.predicate
                ))
            }),
        })
        .collect()
}
