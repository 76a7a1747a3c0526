use num_bigint::BigInt;
use pest::Parser as _;

use crate::{
    ast::{Argument, Identifier, Literal, QueryField, Value},
    error::{Error, Result},
    program::{Atom, Path, Term},
    schema::{ArgumentDef, FieldDef, Schema, SchemaType},
};

mod graphql {
    use pest_derive::Parser;

    #[derive(Parser)]
    #[grammar = "graphql.pest"]
    pub(super) struct GraphqlParser;
}

mod facts {
    use pest_derive::Parser;

    #[derive(Parser)]
    #[grammar = "facts.pest"]
    pub(super) struct FactsParser;
}

use graphql::{GraphqlParser, Rule};

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

fn parse_error(source_name: &str, error: impl std::fmt::Display) -> Error {
    Error::Parse {
        source_name: source_name.to_owned(),
        message: error.to_string(),
    }
}

fn expect_next_rule<'a>(mut pairs: impl Iterator<Item = Pair<'a>>, rule: Rule) -> Pair<'a> {
    let pair = pairs.next().expect("missing pair");
    assert_eq!(pair.as_rule(), rule);
    pair
}

fn convert_identifier(pair: Pair) -> Identifier {
    assert_eq!(pair.as_rule(), Rule::name);
    pair.as_str().to_string()
}

fn expect_identifier<'a>(pairs: impl Iterator<Item = Pair<'a>>) -> Identifier {
    convert_identifier(expect_next_rule(pairs, Rule::name))
}

/// Parses the selection set of every query operation in `code`, in document
/// order.
pub fn parse_query(code: &str) -> Result<Vec<QueryField>> {
    let document = GraphqlParser::parse(Rule::document, code)
        .map_err(|e| parse_error("query", e))?
        .next()
        .expect("document pair");

    let mut fields = vec![];
    for definition in document
        .into_inner()
        .take_while(|pair| pair.as_rule() != Rule::EOI)
    {
        let definition = definition.into_inner().next().expect("definition body");
        match definition.as_rule() {
            Rule::fragment_definition => {
                let name = expect_identifier(definition.into_inner());
                return Err(Error::unsupported(
                    format!("fragment {}", name),
                    "fragments have no finite selection tree to lower",
                ));
            }
            Rule::operation => {
                let mut pairs = definition.into_inner().peekable();
                let operation_type =
                    pairs.next_if(|pair| pair.as_rule() == Rule::operation_type);
                if let Some(operation_type) = operation_type {
                    if operation_type.as_str() != "query" {
                        return Err(Error::unsupported(
                            operation_type.as_str(),
                            "only query operations can be lowered",
                        ));
                    }
                }
                let selection_set = pairs
                    .find(|pair| pair.as_rule() == Rule::selection_set)
                    .expect("operation selection set");
                fields.extend(convert_selection_set(selection_set, &Path::default())?);
            }
            _ => unreachable!(),
        }
    }

    Ok(fields)
}

fn convert_selection_set(pair: Pair, parent: &Path) -> Result<Vec<QueryField>> {
    assert_eq!(pair.as_rule(), Rule::selection_set);
    let at = if parent.is_empty() {
        "query".to_owned()
    } else {
        parent.to_string()
    };

    pair.into_inner()
        .map(|selection| {
            let selection = selection.into_inner().next().expect("selection body");
            match selection.as_rule() {
                Rule::field => convert_field(selection, parent),
                Rule::fragment_spread => Err(Error::unsupported(
                    &at,
                    format!(
                        "fragment spread `...{}` is not supported",
                        expect_identifier(selection.into_inner())
                    ),
                )),
                Rule::inline_fragment => Err(Error::unsupported(
                    &at,
                    "inline fragments are not supported",
                )),
                _ => unreachable!(),
            }
        })
        .collect()
}

fn convert_field(pair: Pair, parent: &Path) -> Result<QueryField> {
    let mut pairs = pair.into_inner().peekable();

    let alias = pairs
        .next_if(|pair| pair.as_rule() == Rule::alias)
        .map(|alias| expect_identifier(alias.into_inner()));
    let name = expect_identifier(&mut pairs);
    let mut field = QueryField::new(name);
    field.alias = alias;
    let path = parent.child(field.response_key());

    for pair in pairs {
        match pair.as_rule() {
            Rule::arguments => {
                field.arguments = pair
                    .into_inner()
                    .map(|argument| {
                        let mut pairs = argument.into_inner();
                        let name = expect_identifier(&mut pairs);
                        let value = convert_value(expect_next_rule(pairs, Rule::value))?;
                        Ok(Argument { name, value })
                    })
                    .collect::<Result<_>>()?;
            }
            Rule::selection_set => {
                field.subfields = convert_selection_set(pair, &path)?;
            }
            _ => unreachable!(),
        }
    }

    Ok(field)
}

fn convert_value(pair: Pair) -> Result<Value> {
    assert_eq!(pair.as_rule(), Rule::value);
    let pair = pair.into_inner().next().expect("value body");

    Ok(match pair.as_rule() {
        Rule::variable => Value::Variable(expect_identifier(pair.into_inner())),
        Rule::float => Value::Literal(Literal::Float(pair.as_str().to_owned())),
        Rule::int => Value::Literal(Literal::Integer(convert_integer(pair.as_str())?)),
        Rule::string => {
            let interior = expect_next_rule(pair.into_inner(), Rule::string_interior);
            Value::Literal(Literal::String(unescape(interior.as_str())))
        }
        Rule::boolean => Value::Literal(Literal::Boolean(pair.as_str() == "true")),
        Rule::null => Value::Null,
        Rule::enum_value => Value::Enum(expect_identifier(pair.into_inner())),
        Rule::list => Value::List(pair.into_inner().map(convert_value).collect::<Result<_>>()?),
        Rule::object => Value::Object(
            pair.into_inner()
                .map(|field| {
                    let mut pairs = field.into_inner();
                    let name = expect_identifier(&mut pairs);
                    Ok((name, convert_value(expect_next_rule(pairs, Rule::value))?))
                })
                .collect::<Result<_>>()?,
        ),
        _ => unreachable!(),
    })
}

fn convert_integer(lexeme: &str) -> Result<BigInt> {
    lexeme
        .parse()
        .map_err(|e| parse_error("integer literal", format!("{:?}: {}", lexeme, e)))
}

/// Resolves the escapes the grammar admits inside a quoted string.
fn unescape(interior: &str) -> String {
    let mut s = String::with_capacity(interior.len());
    let mut chars = interior.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            s.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => s.push('\n'),
            Some('t') => s.push('\t'),
            Some('r') => s.push('\r'),
            Some('b') => s.push('\u{8}'),
            Some('f') => s.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let c = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                s.push(c);
            }
            Some(other) => s.push(other),
            None => s.push('\\'),
        }
    }
    s
}

/// Parses `type`, `interface`, `scalar` and `enum` definitions. `schema`
/// blocks and descriptions are accepted and ignored.
pub fn parse_schema(code: &str) -> Result<Schema> {
    let document = GraphqlParser::parse(Rule::schema_document, code)
        .map_err(|e| parse_error("schema", e))?
        .next()
        .expect("schema document pair");

    let types = document
        .into_inner()
        .take_while(|pair| pair.as_rule() != Rule::EOI)
        .filter_map(|definition| {
            let body = definition
                .into_inner()
                .find(|pair| pair.as_rule() != Rule::description)
                .expect("type definition body");
            match body.as_rule() {
                Rule::object_type => Some(convert_object_type(body)),
                Rule::scalar_type | Rule::enum_type => {
                    Some(SchemaType::Scalar(expect_identifier(body.into_inner())))
                }
                Rule::schema_definition => None,
                _ => unreachable!(),
            }
        })
        .collect();

    Ok(Schema::new(types))
}

fn convert_object_type(pair: Pair) -> SchemaType {
    let mut pairs = pair.into_inner();
    expect_next_rule(&mut pairs, Rule::object_keyword);
    let name = expect_identifier(&mut pairs);

    let fields = pairs
        .find(|pair| pair.as_rule() == Rule::fields_definition)
        .map(|fields| fields.into_inner().map(convert_field_definition).collect())
        .unwrap_or_default();

    SchemaType::Object { name, fields }
}

fn convert_field_definition(pair: Pair) -> FieldDef {
    let mut pairs = pair
        .into_inner()
        .filter(|pair| pair.as_rule() != Rule::description)
        .peekable();

    let name = expect_identifier(&mut pairs);
    let arguments = pairs
        .next_if(|pair| pair.as_rule() == Rule::arguments_definition)
        .map(|arguments| {
            arguments
                .into_inner()
                .map(|argument| {
                    let mut pairs = argument
                        .into_inner()
                        .filter(|pair| pair.as_rule() != Rule::description);
                    let name = expect_identifier(&mut pairs);
                    let ty = convert_type(expect_next_rule(&mut pairs, Rule::type_ref));
                    ArgumentDef { name, ty }
                })
                .collect()
        })
        .unwrap_or_default();
    let ty = convert_type(expect_next_rule(&mut pairs, Rule::type_ref));

    FieldDef {
        name,
        ty,
        arguments,
    }
}

fn convert_type(pair: Pair) -> SchemaType {
    assert_eq!(pair.as_rule(), Rule::type_ref);
    let mut pairs = pair.into_inner();
    let base = pairs.next().expect("type body");

    let ty = match base.as_rule() {
        Rule::named_type => SchemaType::Scalar(expect_identifier(base.into_inner())),
        Rule::list_type => {
            SchemaType::list(convert_type(expect_next_rule(base.into_inner(), Rule::type_ref)))
        }
        _ => unreachable!(),
    };

    match pairs.next() {
        Some(non_null) => {
            assert_eq!(non_null.as_rule(), Rule::non_null);
            SchemaType::non_null(ty)
        }
        None => ty,
    }
}

/// Parses a fact file: ground `pred(constant, ...).` lines, `%` comments.
pub fn parse_facts(code: &str) -> Result<Vec<Atom>> {
    use facts::{FactsParser, Rule};

    let document = FactsParser::parse(Rule::facts, code)
        .map_err(|e| parse_error("facts", e))?
        .next()
        .expect("facts pair");

    document
        .into_inner()
        .take_while(|pair| pair.as_rule() != Rule::EOI)
        .map(|fact| {
            let mut pairs = fact.into_inner();
            let predicate = pairs.next().expect("fact predicate").as_str().to_owned();
            let args = pairs
                .map(|constant| {
                    let constant = constant.into_inner().next().expect("constant body");
                    let literal = match constant.as_rule() {
                        Rule::float => Literal::Float(constant.as_str().to_owned()),
                        Rule::integer => Literal::Integer(convert_integer(constant.as_str())?),
                        Rule::string => {
                            let interior = constant.into_inner().next().expect("string interior");
                            Literal::String(unescape(interior.as_str()))
                        }
                        Rule::boolean => Literal::Boolean(constant.as_str() == "true"),
                        _ => unreachable!(),
                    };
                    Ok(Term::Lit(literal))
                })
                .collect::<Result<_>>()?;
            Ok(Atom::new(predicate, args))
        })
        .collect()
}
