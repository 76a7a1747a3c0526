use std::collections::{hash_map, HashMap, HashSet};

use tracing::{debug, trace};

use crate::{
    adornment::bound_arguments,
    ast::QueryField,
    error::{Error, Result},
    options::CompileOptions,
    program::{Atom, Comparison, Path, PredicateName, Program, Rule, Term, Variable},
    schema::{FieldDef, Schema, SchemaType, Shape},
};

/// A query field after lowering: its names, variables and goals. The
/// transformer and the answer assembler walk this tree instead of the raw
/// query.
#[derive(Clone, Debug)]
pub struct FieldNode<'a> {
    pub field: &'a QueryField,
    pub def: Option<&'a FieldDef>,
    pub path: Path,
    pub parent: Term,
    pub var: Variable,
    /// `var`, or the identity literal the field was looked up by.
    pub id: Term,
    pub ext: Atom,
    pub filters: Vec<Atom>,
    pub result: Atom,
    pub result_vars: Vec<Variable>,
    /// Index of this field's `_result` rule in the naive program.
    pub rule: usize,
    pub children: Vec<FieldNode<'a>>,
}

impl FieldNode<'_> {
    pub fn is_root(&self) -> bool {
        self.path.len() == 1
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The existence and filter goals that select this field's objects.
    pub fn selection(&self) -> impl Iterator<Item = &Atom> {
        std::iter::once(&self.ext).chain(&self.filters)
    }
}

#[derive(Debug)]
pub struct Lowered<'a> {
    pub program: Program,
    pub fields: Vec<FieldNode<'a>>,
}

/// Lowers `fields` to the naive rule program: one `_result` rule per field
/// occurrence, in pre-order.
///
/// Every field level reads its own stored relation, keyed by the field-name
/// path: `{ project(name: "GraphQL") { tagline } }` reads
/// `project_ext("GraphQL")` and `project_tagline_ext("GraphQL", T)`, so a
/// single `project_ext("GraphQL", "A query language for APIs")` fact matches
/// nothing. Split such facts into one `_ext/1` fact for the object and one
/// `_ext/2` fact per attribute.
pub fn generate<'a>(
    schema: &'a Schema,
    fields: &'a [QueryField],
    options: &CompileOptions,
) -> Result<Lowered<'a>> {
    if fields.is_empty() {
        return Err(Error::unsupported("query", "the query selects no fields"));
    }

    let mut generator = RuleGenerator {
        schema,
        options,
        counter: 0,
        predicates: HashMap::new(),
    };

    let root = Scope {
        path: Path::default(),
        ext_path: Path::default(),
        id: Term::Var(Variable::Root),
        object: schema.query_type(),
    };

    check_distinct_keys(fields, &root.path)?;
    let mut nodes = fields
        .iter()
        .map(|field| generator.lower(field, &root))
        .collect::<Result<Vec<_>>>()?;

    let mut program = Program::default();
    for node in &mut nodes {
        emit(node, &mut program);
    }

    debug!(
        fields = generator.counter,
        rules = program.rules.len(),
        "generated naive program"
    );

    Ok(Lowered {
        program,
        fields: nodes,
    })
}

/// Where a field occurrence sits: everything a child needs from its parent.
#[derive(Clone, Debug)]
struct Scope<'a> {
    path: Path,
    ext_path: Path,
    id: Term,
    object: Option<&'a SchemaType>,
}

impl Scope<'_> {
    fn is_top(&self) -> bool {
        self.path.is_empty()
    }
}

#[derive(Debug)]
struct RuleGenerator<'a, 'o> {
    schema: &'a Schema,
    options: &'o CompileOptions,
    counter: usize,
    predicates: HashMap<PredicateName, Path>,
}

impl<'a, 'o> RuleGenerator<'a, 'o> {
    fn lower(&mut self, field: &'a QueryField, scope: &Scope<'a>) -> Result<FieldNode<'a>> {
        let path = scope.path.child(field.response_key());
        let ext_path = scope.ext_path.child(&field.name);

        if let Some(name) = std::iter::once(&field.name)
            .chain(&field.alias)
            .find(|name| name.starts_with('_'))
        {
            return Err(Error::unsupported(
                &path,
                format!("`{}` starts with `_`; only stored fields can be lowered", name),
            ));
        }

        self.counter += 1;
        let var = Variable::fresh(&field.name, self.counter);
        let result_predicate = format!("{}_result", path.predicate_base());
        self.register(&result_predicate, &path)?;

        let (def, shape) = self.resolve(field, scope, &path)?;
        match shape {
            Some(Shape::Scalar) if !field.is_leaf() => {
                return Err(Error::unsupported(
                    &path,
                    format!("scalar field `{}` cannot have a selection set", field.name),
                ));
            }
            Some(shape) if shape.is_object() && field.is_leaf() => {
                return Err(Error::unsupported(
                    &path,
                    format!("object field `{}` needs a selection set", field.name),
                ));
            }
            _ => {}
        }
        self.check_arguments(field, def, &path)?;

        let bound = bound_arguments(field, def);
        let identity = if field.is_leaf() {
            None
        } else {
            bound
                .iter()
                .find(|(name, _)| self.options.is_identity(name))
                .copied()
        };
        let id = match identity {
            Some((_, literal)) => Term::Lit(literal.clone()),
            None => Term::Var(var.clone()),
        };

        let ext_args = if scope.is_top() {
            vec![id.clone()]
        } else {
            vec![scope.id.clone(), id.clone()]
        };
        let ext = Atom::new(self.ext_predicate(&ext_path)?, ext_args);

        let object = match shape {
            Some(Shape::ToOne(target)) | Some(Shape::ToMany(target)) => Some(target),
            _ => None,
        };

        let mut filters = vec![];
        for (name, literal) in bound
            .iter()
            .filter(|(name, _)| identity.map_or(true, |(identity, _)| identity != *name))
        {
            let literal = Term::Lit((*literal).clone());
            match range_bound(name) {
                Some((op, target)) => {
                    if let Some(object) = object.filter(|object| object.field(&target).is_none()) {
                        return Err(Error::unsupported(
                            &path,
                            format!(
                                "range argument `{}` compares `{}`, which type `{}` does not have",
                                name,
                                target,
                                object.name()
                            ),
                        ));
                    }
                    let value = Term::Var(Variable::attribute(&target, &var));
                    let join = Atom::new(
                        self.ext_predicate(&ext_path.child(&target))?,
                        vec![id.clone(), value.clone()],
                    );
                    if !filters.contains(&join) {
                        filters.push(join);
                    }
                    filters.push(Atom::compare(op, value, literal));
                }
                None => filters.push(Atom::new(
                    self.ext_predicate(&ext_path.child(name))?,
                    vec![id.clone(), literal],
                )),
            }
        }

        let child_scope = Scope {
            path: path.clone(),
            ext_path,
            id: id.clone(),
            object,
        };

        check_distinct_keys(&field.subfields, &path)?;
        let children = field
            .subfields
            .iter()
            .map(|subfield| self.lower(subfield, &child_scope))
            .collect::<Result<Vec<_>>>()?;

        let result_vars = if children.is_empty() {
            vec![var.clone()]
        } else {
            children
                .iter()
                .flat_map(|child| child.result_vars.iter().cloned())
                .collect()
        };

        let mut result_args = vec![];
        if !scope.is_top() {
            result_args.push(scope.id.clone());
        }
        result_args.extend(result_vars.iter().cloned().map(Term::Var));
        let result = Atom::new(result_predicate, result_args);

        trace!(%path, ?id, "lowered field");

        Ok(FieldNode {
            field,
            def,
            path,
            parent: scope.id.clone(),
            var,
            id,
            ext,
            filters,
            result,
            result_vars,
            rule: 0,
            children,
        })
    }

    fn resolve(
        &self,
        field: &QueryField,
        scope: &Scope<'a>,
        path: &Path,
    ) -> Result<(Option<&'a FieldDef>, Option<Shape<'a>>)> {
        match scope.object {
            Some(object) => match object.field(&field.name) {
                Some(def) => Ok((Some(def), Some(self.schema.shape(&def.ty)))),
                None => Err(Error::unsupported(
                    path,
                    format!("type `{}` has no field `{}`", object.name(), field.name),
                )),
            },
            None if scope.is_top() => Ok((
                None,
                self.schema.object_for_root(&field.name).map(Shape::ToOne),
            )),
            None => Ok((None, None)),
        }
    }

    fn check_arguments(&self, field: &QueryField, def: Option<&FieldDef>, path: &Path) -> Result<()> {
        let mut seen = HashSet::new();
        for argument in &field.arguments {
            if argument.name.starts_with('_') {
                return Err(Error::unsupported(
                    path,
                    format!("argument `{}` starts with `_`", argument.name),
                ));
            }
            if !seen.insert(argument.name.as_str()) {
                return Err(Error::unsupported(
                    path,
                    format!("argument `{}` is given more than once", argument.name),
                ));
            }
            if argument.value.as_literal().is_none() {
                return Err(Error::unsupported(
                    path,
                    format!(
                        "argument `{}` is a {}; only literal arguments can be lowered",
                        argument.name,
                        argument.value.kind()
                    ),
                ));
            }
            if let Some(def) = def {
                if !def.declares(&argument.name) {
                    return Err(Error::unsupported(
                        path,
                        format!(
                            "field `{}` declares no argument `{}`",
                            field.name, argument.name
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn ext_predicate(&mut self, ext_path: &Path) -> Result<PredicateName> {
        let predicate = format!("{}_ext", ext_path.predicate_base());
        self.register(&predicate, ext_path)?;
        Ok(predicate)
    }

    /// Records that `predicate` stands for `path`. The same path may claim a
    /// stored relation again (aliases, filters on a selected attribute); a
    /// second path may not.
    fn register(&mut self, predicate: &str, path: &Path) -> Result<()> {
        match self.predicates.entry(predicate.to_owned()) {
            hash_map::Entry::Vacant(vacant) => {
                vacant.insert(path.clone());
                Ok(())
            }
            hash_map::Entry::Occupied(occupied) if occupied.get() == path => Ok(()),
            hash_map::Entry::Occupied(occupied) => Err(Error::InternalInvariant(format!(
                "predicate name `{}` generated for both `{}` and `{}`",
                occupied.key(),
                occupied.get(),
                path
            ))),
        }
    }
}

/// `minAge` compares the `age` attribute from below, `maxAge` from above.
/// Names like `minimum` are ordinary arguments.
fn range_bound(argument: &str) -> Option<(Comparison, String)> {
    let (op, rest) = if let Some(rest) = argument.strip_prefix("min") {
        (Comparison::AtLeast, rest)
    } else if let Some(rest) = argument.strip_prefix("max") {
        (Comparison::AtMost, rest)
    } else {
        return None;
    };

    let mut chars = rest.chars();
    let first = chars.next().filter(char::is_ascii_uppercase)?;
    Some((op, format!("{}{}", first.to_ascii_lowercase(), chars.as_str())))
}

fn check_distinct_keys(fields: &[QueryField], parent: &Path) -> Result<()> {
    let mut keys = HashSet::new();
    for field in fields {
        if !keys.insert(field.response_key()) {
            return Err(Error::unsupported(
                parent.child(field.response_key()),
                "selected twice under the same response key; alias one of the occurrences",
            ));
        }
    }
    Ok(())
}

/// Pushes the `_result` rule of `node` and then those of its subtree.
fn emit(node: &mut FieldNode, program: &mut Program) {
    let body = node
        .selection()
        .cloned()
        .chain(node.children.iter().map(|child| child.result.clone()))
        .collect();

    node.rule = program.rules.len();
    program.rules.push(Rule::new(node.result.clone(), body));

    for child in &mut node.children {
        emit(child, program);
    }
}
