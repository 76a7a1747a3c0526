use itertools::Itertools;

use crate::{
    ast::Literal,
    program::{Atom, DemandInfo, Program, Rule, Term, Variable},
};

/// Serializes `program`: facts first, then rules, each tier in generation
/// order. Identical programs always print identically.
pub fn print(program: &Program) -> String {
    program.to_datalog()
}

impl Literal {
    pub fn to_datalog(&self) -> String {
        match self {
            Literal::String(s) => {
                let mut quoted = String::with_capacity(s.len() + 2);
                quoted.push('"');
                for c in s.chars() {
                    match c {
                        '"' => quoted.push_str("\\\""),
                        '\\' => quoted.push_str("\\\\"),
                        '\n' => quoted.push_str("\\n"),
                        '\t' => quoted.push_str("\\t"),
                        c => quoted.push(c),
                    }
                }
                quoted.push('"');
                quoted
            }
            Literal::Integer(n) => n.to_string(),
            Literal::Float(lexeme) => lexeme.clone(),
            Literal::Boolean(b) => b.to_string(),
        }
    }
}

impl Variable {
    pub fn to_datalog(&self) -> String {
        match self {
            Variable::Root => "ROOT".to_owned(),
            Variable::Named(name) => name.clone(),
        }
    }
}

impl Term {
    pub fn to_datalog(&self) -> String {
        match self {
            Term::Var(var) => var.to_datalog(),
            Term::Lit(literal) => literal.to_datalog(),
        }
    }
}

impl Atom {
    pub fn to_datalog(&self) -> String {
        if let Some(op) = self.comparison() {
            return format!(
                "{} {} {}",
                self.args[0].to_datalog(),
                op.as_str(),
                self.args[1].to_datalog()
            );
        }
        format!(
            "{}({})",
            self.predicate,
            self.args.iter().map(Term::to_datalog).join(", ")
        )
    }
}

impl Rule {
    pub fn to_datalog(&self) -> String {
        if self.body.is_empty() {
            return format!("{}.", self.head.to_datalog());
        }
        format!(
            "{} :- {}.",
            self.head.to_datalog(),
            self.body.iter().map(Atom::to_datalog).join(", ")
        )
    }
}

impl DemandInfo {
    pub fn to_comment(&self) -> String {
        if self.applied {
            format!(
                "% {} [{}]: demand applied, {} ({} / {})",
                self.path, self.adornment, self.reason, self.demand_predicate, self.magic_predicate
            )
        } else {
            format!("% {}: {}", self.path, self.reason)
        }
    }
}

impl Program {
    pub fn to_datalog(&self) -> String {
        let mut s = String::new();

        for fact in &self.facts {
            s.push_str(&fact.to_datalog());
            s.push_str(".\n");
        }

        if !self.facts.is_empty() && !self.rules.is_empty() {
            s.push('\n');
        }

        for (index, rule) in self.rules.iter().enumerate() {
            for info in self.annotations_for(index) {
                s.push_str(&info.to_comment());
                s.push('\n');
            }
            s.push_str(&rule.to_datalog());
            s.push('\n');
        }

        s
    }
}
