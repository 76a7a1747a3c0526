//! Demand (magic-sets) rewrite of a naive program.
//!
//! Every field occurrence that carries a bound argument, or hangs below one
//! that does, gets a magic predicate `m_<path>_<pattern>` holding the
//! identities that are actually reachable from the query's literals, and its
//! `_result` rule is guarded by it. Demand only ever flows from parent to
//! child, so one pre-order pass over the lowered tree is enough.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::{
    adornment::{adorn, bound_arguments},
    generator::FieldNode,
    program::{Adornment, Annotation, Atom, DemandInfo, Path, Program, Rule, Term},
};

/// Dedup key for seeds and magic rules. Keyed by path, never by bare field
/// name: two `name` fields under different parents need separate magic
/// predicates.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DemandKey {
    pub path: Path,
    pub pattern: Adornment,
}

/// Rewrites `naive` so that bottom-up evaluation only derives facts reachable
/// from bound arguments. The `ans` relation is unchanged. Returns `naive`
/// as is when no occurrence carries a bound argument.
pub fn transform(naive: &Program, fields: &[FieldNode]) -> Program {
    let mut transformer = DemandTransformer {
        naive,
        seen: HashSet::new(),
        seeds: vec![],
        magic: vec![],
        field_rules: naive.rules.iter().cloned().map(|rule| (rule, None)).collect(),
        propagation: vec![],
    };

    for field in fields {
        transformer.visit(field, None);
    }

    if transformer.seen.is_empty() {
        debug!("no bound arguments, program left unchanged");
        return naive.clone();
    }

    transformer.finish()
}

/// The magic atom of a demanded parent, as seen from its children.
#[derive(Clone, Debug)]
struct Inherited<'n> {
    path: &'n Path,
    magic: Atom,
}

#[derive(Debug)]
struct DemandTransformer<'p> {
    naive: &'p Program,
    seen: HashSet<DemandKey>,
    seeds: Vec<Atom>,
    magic: Vec<Rule>,
    field_rules: Vec<(Rule, Option<DemandInfo>)>,
    propagation: Vec<Rule>,
}

impl DemandTransformer<'_> {
    fn visit(&mut self, node: &FieldNode, inherited: Option<&Inherited>) {
        let adornment = adorn(node.field, node.def);
        let bound: Vec<Term> = bound_arguments(node.field, node.def)
            .into_iter()
            .map(|(_, literal)| Term::Lit(literal.clone()))
            .collect();

        if adornment.is_free() && inherited.is_none() {
            trace!(path = %node.path, "no demand");
            self.field_rules[node.rule].1 = Some(DemandInfo {
                path: node.path.clone(),
                applied: false,
                reason: "no bound arguments — skipped".to_owned(),
                adornment,
                ..DemandInfo::default()
            });
            for child in &node.children {
                self.visit(child, None);
            }
            return;
        }

        let pattern = match inherited {
            Some(_) => adornment.inherited(),
            None => adornment.clone(),
        };
        let base = node.path.predicate_base();
        let demand_predicate = format!("demand_{}_{}", base, pattern);
        let magic_predicate = format!("m_{}_{}", base, pattern);
        let magic = Atom::new(magic_predicate.clone(), vec![node.id.clone()]);

        let key = DemandKey {
            path: node.path.clone(),
            pattern: pattern.clone(),
        };
        if self.seen.insert(key) {
            match inherited {
                None => {
                    let demand = Atom::new(demand_predicate.clone(), bound);
                    self.seeds.push(demand.clone());

                    let mut body = vec![demand];
                    body.extend(node.selection().cloned());
                    self.magic.push(Rule::new(magic.clone(), body));
                }
                Some(parent) => {
                    let mut args = vec![node.id.clone()];
                    args.extend(bound);
                    let demand = Atom::new(demand_predicate.clone(), args);

                    self.propagation.push(Rule::new(
                        demand.clone(),
                        vec![parent.magic.clone(), node.ext.clone()],
                    ));

                    let mut body = vec![demand];
                    body.extend(node.filters.iter().cloned());
                    self.magic.push(Rule::new(magic.clone(), body));
                }
            }
        } else {
            trace!(path = %node.path, %pattern, "demand already seeded");
        }

        let guarded = self.naive.rules[node.rule].guarded(magic.clone());
        let reason = match (adornment.bound_count(), inherited) {
            (0, Some(parent)) => format!("demand inherited from `{}`", parent.path),
            (n, Some(parent)) => format!(
                "{} bound argument(s), demand inherited from `{}`",
                n, parent.path
            ),
            (n, None) => format!("{} bound argument(s)", n),
        };
        trace!(path = %node.path, %pattern, "demand applied");
        self.field_rules[node.rule] = (
            guarded,
            Some(DemandInfo {
                path: node.path.clone(),
                applied: true,
                reason,
                adornment: pattern,
                demand_predicate,
                magic_predicate,
            }),
        );

        let inherited = Inherited {
            path: &node.path,
            magic,
        };
        for child in &node.children {
            self.visit(child, Some(&inherited));
        }
    }

    fn finish(self) -> Program {
        let offset = self.magic.len();
        let mut program = Program {
            facts: self.naive.facts.clone(),
            rules: self.magic,
            annotations: self
                .naive
                .annotations
                .iter()
                .map(|annotation| Annotation {
                    rule: annotation.rule + offset,
                    info: annotation.info.clone(),
                })
                .collect(),
        };
        program.facts.extend(self.seeds);

        for (rule, info) in self.field_rules {
            if let Some(info) = info {
                program.annotations.push(Annotation {
                    rule: program.rules.len(),
                    info,
                });
            }
            program.rules.push(rule);
        }
        program.rules.extend(self.propagation);

        debug!(
            seeds = program.facts.len(),
            rules = program.rules.len(),
            "applied demand transformation"
        );
        program
    }
}
