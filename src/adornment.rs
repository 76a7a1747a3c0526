use crate::{
    ast::{Argument, Literal, QueryField},
    program::Adornment,
    schema::FieldDef,
};

/// Arguments of `field` in declared order: the schema's order when the field
/// is declared, followed by anything the query passes that the schema does
/// not declare, in query order.
fn positions<'a>(field: &'a QueryField, def: Option<&'a FieldDef>) -> Vec<(&'a str, Option<&'a Argument>)> {
    let declared = def.map(|def| def.arguments.as_slice()).unwrap_or_default();

    let mut positions: Vec<_> = declared
        .iter()
        .map(|arg| (arg.name.as_str(), field.argument(&arg.name)))
        .collect();

    positions.extend(
        field
            .arguments
            .iter()
            .filter(|arg| !declared.iter().any(|decl| decl.name == arg.name))
            .map(|arg| (arg.name.as_str(), Some(arg))),
    );

    positions
}

/// `B` where the query supplied a literal, `F` elsewhere.
pub fn adorn(field: &QueryField, def: Option<&FieldDef>) -> Adornment {
    Adornment(
        positions(field, def)
            .into_iter()
            .map(|(_, arg)| match arg.and_then(|arg| arg.value.as_literal()) {
                Some(_) => Adornment::BOUND,
                None => Adornment::FREE,
            })
            .collect(),
    )
}

/// The literals behind the `B` positions of [`adorn`], in the same order.
pub fn bound_arguments<'a>(field: &'a QueryField, def: Option<&'a FieldDef>) -> Vec<(&'a str, &'a Literal)> {
    positions(field, def)
        .into_iter()
        .filter_map(|(name, arg)| Some((name, arg?.value.as_literal()?)))
        .collect()
}
