//! Shape descriptors for cached values.
//!
//! A [`Shape`] tells the typed cache how to rebuild a stored payload: which
//! containers to expect and which scalar type sits at each leaf. It is passed
//! per call and never stored alongside the value, so the shape used to read
//! does not have to be the one that was in effect when the value was written.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Structural description of a cached value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Accept any payload unchanged.
    Any,
    Bool,
    Int,
    Float,
    Str,
    /// `null` or the inner shape.
    Optional(Box<Shape>),
    /// Ordered sequence; every element has the inner shape.
    Sequence(Box<Shape>),
    /// String-keyed mapping; every value has the inner shape.
    Mapping(Box<Shape>),
    /// Named record with ordered fields.
    Record(RecordShape),
}

/// Field layout of a record leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordShape {
    pub name: String,
    pub fields: Vec<FieldShape>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldShape {
    pub name: String,
    pub shape: Shape,
}

impl Shape {
    pub fn sequence_of(inner: Self) -> Self {
        Self::Sequence(Box::new(inner))
    }

    pub fn mapping_of(inner: Self) -> Self {
        Self::Mapping(Box::new(inner))
    }

    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn record<'a>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, Self)>,
    ) -> Self {
        Self::Record(RecordShape {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(name, shape)| FieldShape {
                    name: name.to_string(),
                    shape,
                })
                .collect(),
        })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Str => write!(f, "string"),
            Self::Optional(inner) => write!(f, "optional {inner}"),
            Self::Sequence(inner) => write!(f, "sequence of {inner}"),
            Self::Mapping(inner) => write!(f, "mapping of string to {inner}"),
            Self::Record(record) => write!(f, "record {}", record.name),
        }
    }
}

/// Types that can describe their own cached shape.
pub trait Shaped {
    fn shape() -> Shape;
}

macro_rules! impl_shaped {
    ($shape:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl Shaped for $ty {
                fn shape() -> Shape {
                    $shape
                }
            }
        )+
    };
}

impl_shaped!(Shape::Bool => bool);
impl_shaped!(Shape::Int => i8, i16, i32, i64, u8, u16, u32, u64, usize);
impl_shaped!(Shape::Float => f32, f64);
impl_shaped!(Shape::Str => String);
impl_shaped!(Shape::Any => serde_json::Value);

impl<T: Shaped> Shaped for Vec<T> {
    fn shape() -> Shape {
        Shape::sequence_of(T::shape())
    }
}

impl<T: Shaped> Shaped for Option<T> {
    fn shape() -> Shape {
        Shape::optional(T::shape())
    }
}

impl<T: Shaped, S> Shaped for HashMap<String, T, S> {
    fn shape() -> Shape {
        Shape::mapping_of(T::shape())
    }
}

impl<T: Shaped> Shaped for BTreeMap<String, T> {
    fn shape() -> Shape {
        Shape::mapping_of(T::shape())
    }
}
