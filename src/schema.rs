use crate::ast::Identifier;

/// A schema type. `Scalar(name)` also stands for a named reference to an
/// object type, resolved by name through [`Schema::object`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaType {
    Scalar(Identifier),
    Object {
        name: Identifier,
        fields: Vec<FieldDef>,
    },
    List(Box<SchemaType>),
    NonNull(Box<SchemaType>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: Identifier,
    pub ty: SchemaType,
    pub arguments: Vec<ArgumentDef>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentDef {
    pub name: Identifier,
    pub ty: SchemaType,
}

/// Relationship shape of a field, as far as the schema can tell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape<'a> {
    Scalar,
    ToOne(&'a SchemaType),
    ToMany(&'a SchemaType),
}

impl Shape<'_> {
    pub fn is_object(&self) -> bool {
        !matches!(self, Shape::Scalar)
    }
}

impl SchemaType {
    pub fn scalar(name: impl Into<Identifier>) -> Self {
        SchemaType::Scalar(name.into())
    }

    pub fn object(name: impl Into<Identifier>, fields: Vec<FieldDef>) -> Self {
        SchemaType::Object {
            name: name.into(),
            fields,
        }
    }

    pub fn list(element: SchemaType) -> Self {
        SchemaType::List(Box::new(element))
    }

    pub fn non_null(inner: SchemaType) -> Self {
        SchemaType::NonNull(Box::new(inner))
    }

    /// The name of the named type at the bottom of any list/non-null
    /// wrappers.
    pub fn name(&self) -> &str {
        match self {
            SchemaType::Scalar(name) | SchemaType::Object { name, .. } => name,
            SchemaType::List(inner) | SchemaType::NonNull(inner) => inner.name(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        match self {
            SchemaType::Object { fields, .. } => fields.iter().find(|field| field.name == name),
            _ => None,
        }
    }
}

impl FieldDef {
    pub fn new(name: impl Into<Identifier>, ty: SchemaType) -> Self {
        Self {
            name: name.into(),
            ty,
            arguments: vec![],
        }
    }

    pub fn with_argument(mut self, name: impl Into<Identifier>, ty: SchemaType) -> Self {
        self.arguments.push(ArgumentDef {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn declares(&self, argument: &str) -> bool {
        self.arguments.iter().any(|arg| arg.name == argument)
    }
}

/// The named type definitions of a schema, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    pub types: Vec<SchemaType>,
}

impl Schema {
    pub const QUERY_TYPE: &'static str = "Query";

    pub fn new(types: Vec<SchemaType>) -> Self {
        Self { types }
    }

    pub fn named(&self, name: &str) -> Option<&SchemaType> {
        self.types.iter().find(|ty| ty.name() == name)
    }

    pub fn object(&self, name: &str) -> Option<&SchemaType> {
        self.named(name)
            .filter(|ty| matches!(ty, SchemaType::Object { .. }))
    }

    pub fn query_type(&self) -> Option<&SchemaType> {
        self.object(Self::QUERY_TYPE)
    }

    /// Fallback for schemas without a `Query` type: the object named like the
    /// root field, ignoring case (`project` -> `Project`).
    pub fn object_for_root(&self, field_name: &str) -> Option<&SchemaType> {
        self.types.iter().find(|ty| {
            matches!(ty, SchemaType::Object { .. }) && ty.name().eq_ignore_ascii_case(field_name)
        })
    }

    pub fn shape<'a>(&'a self, ty: &'a SchemaType) -> Shape<'a> {
        match ty {
            SchemaType::NonNull(inner) => self.shape(inner),
            SchemaType::List(element) => match self.shape(element) {
                Shape::Scalar => Shape::Scalar,
                Shape::ToOne(target) | Shape::ToMany(target) => Shape::ToMany(target),
            },
            SchemaType::Object { .. } => Shape::ToOne(ty),
            SchemaType::Scalar(name) => match self.object(name) {
                Some(target) => Shape::ToOne(target),
                None => Shape::Scalar,
            },
        }
    }
}
