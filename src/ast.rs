use std::cmp::Ordering;

use num_bigint::BigInt;

pub type Identifier = String;
pub type FieldName = Identifier;
pub type ArgumentName = Identifier;

/// A constant from a query argument. Only literals can be bound arguments.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Literal {
    String(String),
    Integer(BigInt),
    /// Kept as its source lexeme so literals stay hashable and print back
    /// unchanged.
    Float(String),
    Boolean(bool),
}

impl Literal {
    /// Orders two literals by value: numbers against numbers (integers and
    /// floats mix), otherwise only literals of the same kind. `None` when the
    /// two are incomparable.
    pub fn compare(&self, other: &Literal) -> Option<Ordering> {
        match (self, other) {
            (Literal::Integer(a), Literal::Integer(b)) => Some(a.cmp(b)),
            (Literal::String(a), Literal::String(b)) => Some(a.cmp(b)),
            (Literal::Boolean(a), Literal::Boolean(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Integer(n) => n.to_string().parse().ok(),
            Literal::Float(lexeme) => lexeme.parse().ok(),
            _ => None,
        }
    }
}

/// An argument value as written in the query. Everything but `Literal` is
/// rejected by the rule generator.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Literal(Literal),
    Variable(Identifier),
    Null,
    Enum(Identifier),
    List(Vec<Value>),
    Object(Vec<(Identifier, Value)>),
}

impl Value {
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Value::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Literal(_) => "literal",
            Value::Variable(_) => "variable",
            Value::Null => "null",
            Value::Enum(_) => "enum value",
            Value::List(_) => "list",
            Value::Object(_) => "input object",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    pub name: ArgumentName,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryField {
    pub alias: Option<Identifier>,
    pub name: FieldName,
    pub arguments: Vec<Argument>,
    pub subfields: Vec<QueryField>,
}

impl QueryField {
    pub fn new(name: impl Into<FieldName>) -> Self {
        Self {
            alias: None,
            name: name.into(),
            arguments: vec![],
            subfields: vec![],
        }
    }

    pub fn alias(mut self, alias: impl Into<Identifier>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn arg(mut self, name: impl Into<ArgumentName>, value: impl Into<Value>) -> Self {
        self.arguments.push(Argument {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn select(mut self, subfield: QueryField) -> Self {
        self.subfields.push(subfield);
        self
    }

    /// The key this field answers under: its alias, or its name.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_leaf(&self) -> bool {
        self.subfields.is_empty()
    }

    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|argument| argument.name == name)
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        Value::Literal(literal)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_owned())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Integer(n.into())
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Literal(s.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Literal(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Literal(b.into())
    }
}
