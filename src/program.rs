use std::fmt;

use itertools::Itertools;

use crate::ast::Literal;

pub type PredicateName = String;

/// Ancestor response keys from the query root down to a field occurrence.
/// Path uniqueness is what keeps predicate names unique.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(pub Vec<String>);

impl Path {
    pub fn child(&self, key: &str) -> Path {
        let mut segments = self.0.clone();
        segments.push(key.to_owned());
        Path(segments)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Segments joined by `_`, with every `_` inside a segment doubled, so
    /// `a_b.c` and `a.b_c` stay apart (`a__b_c` vs `a_b__c`). An uppercase
    /// first character is lowered and marked with `_1` to keep the result a
    /// valid atom (`Project` -> `p_1roject`).
    ///
    /// Segments must not start with `_`; the generator rejects such names.
    /// Under that rule a run of underscores is even inside a segment, odd
    /// before a separator, and odd followed by a digit only for the case
    /// marker, so distinct paths never share a base.
    pub fn predicate_base(&self) -> String {
        let mut base = String::new();
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                base.push('_');
            }
            for c in segment.chars() {
                match c {
                    '_' => base.push_str("__"),
                    c => base.push(c),
                }
            }
        }

        let mut chars = base.chars();
        match chars.next() {
            Some(first) if first.is_uppercase() => first
                .to_lowercase()
                .chain("_1".chars())
                .chain(chars)
                .collect(),
            _ => base,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("."))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variable {
    /// Parent of the root fields. Never printed in a generated program.
    Root,
    Named(String),
}

impl Variable {
    pub fn fresh(field_name: &str, counter: usize) -> Self {
        Variable::Named(format!("{}_{}", field_name.to_uppercase(), counter))
    }

    /// The `field_name` attribute of the object `owner` holds, as read by a
    /// range filter: `AGE_USERS_1`.
    pub fn attribute(field_name: &str, owner: &Variable) -> Self {
        let owner = match owner {
            Variable::Root => "ROOT",
            Variable::Named(name) => name,
        };
        Variable::Named(format!("{}_{}", field_name.to_uppercase(), owner))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Var(Variable),
    Lit(Literal),
}

impl Term {
    pub fn as_var(&self) -> Option<&Variable> {
        match self {
            Term::Var(var) => Some(var),
            Term::Lit(_) => None,
        }
    }
}

impl From<Variable> for Term {
    fn from(var: Variable) -> Self {
        Term::Var(var)
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Lit(literal)
    }
}

/// `pred(arg1, ..., argk)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Atom {
    pub predicate: PredicateName,
    pub args: Vec<Term>,
}

impl Atom {
    pub fn new(predicate: impl Into<PredicateName>, args: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.args.iter().filter_map(Term::as_var)
    }

    pub fn is_ground(&self) -> bool {
        self.variables().next().is_none()
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn compare(op: Comparison, lhs: Term, rhs: Term) -> Self {
        Atom::new(op.as_str(), vec![lhs, rhs])
    }

    /// The built-in this atom stands for, if it is a comparison goal rather
    /// than a lookup.
    pub fn comparison(&self) -> Option<Comparison> {
        match (Comparison::from_predicate(&self.predicate), self.arity()) {
            (Some(op), 2) => Some(op),
            _ => None,
        }
    }
}

/// Order comparisons between two terms. They are ordinary atoms whose
/// predicate is the operator, as in Prolog's `@>=(X, Y)`, and print infix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparison {
    AtLeast,
    AtMost,
}

impl Comparison {
    pub fn as_str(self) -> &'static str {
        match self {
            Comparison::AtLeast => "@>=",
            Comparison::AtMost => "@=<",
        }
    }

    pub fn from_predicate(predicate: &str) -> Option<Self> {
        match predicate {
            "@>=" => Some(Comparison::AtLeast),
            "@=<" => Some(Comparison::AtMost),
            _ => None,
        }
    }

    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        match self {
            Comparison::AtLeast => ordering.is_ge(),
            Comparison::AtMost => ordering.is_le(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub head: Atom,
    pub body: Vec<Atom>,
}

impl Rule {
    pub fn new(head: Atom, body: Vec<Atom>) -> Self {
        Self { head, body }
    }

    /// A copy of this rule with `guard` as its first goal.
    pub fn guarded(&self, guard: Atom) -> Rule {
        let mut body = Vec::with_capacity(self.body.len() + 1);
        body.push(guard);
        body.extend(self.body.iter().cloned());
        Rule::new(self.head.clone(), body)
    }
}

/// Per-argument bound/free pattern of one field occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Adornment(pub String);

impl Adornment {
    pub const BOUND: char = 'B';
    pub const FREE: char = 'F';

    /// True when there is nothing bound to propagate, including the empty
    /// adornment of an argument-less field.
    pub fn is_free(&self) -> bool {
        !self.0.contains(Self::BOUND)
    }

    pub fn bound_count(&self) -> usize {
        self.0.chars().filter(|&c| c == Self::BOUND).count()
    }

    /// The pattern of a demand predicate whose first position is inherited
    /// from a demanded parent.
    pub fn inherited(&self) -> Adornment {
        Adornment(format!("{}{}", Self::BOUND, self.0))
    }
}

impl fmt::Display for Adornment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the demand transformer did with one field occurrence. Only ever
/// printed as a comment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DemandInfo {
    pub path: Path,
    pub applied: bool,
    pub reason: String,
    pub adornment: Adornment,
    pub demand_predicate: PredicateName,
    pub magic_predicate: PredicateName,
}

/// A `DemandInfo` printed right before `program.rules[rule]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub rule: usize,
    pub info: DemandInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub facts: Vec<Atom>,
    pub rules: Vec<Rule>,
    pub annotations: Vec<Annotation>,
}

impl Program {
    pub fn defines(&self, predicate: &str) -> bool {
        self.rules.iter().any(|rule| rule.head.predicate == predicate)
            || self.facts.iter().any(|fact| fact.predicate == predicate)
    }

    pub fn annotations_for(&self, rule: usize) -> impl Iterator<Item = &DemandInfo> {
        self.annotations
            .iter()
            .filter(move |annotation| annotation.rule == rule)
            .map(|annotation| &annotation.info)
    }
}
