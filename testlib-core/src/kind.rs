//! Structural classification of inspected values.

use std::cell::Ref;
use std::fmt;

use crate::inspect::Inspect;

/// A named field of a record or enum variant.
#[derive(Clone, Copy)]
pub struct Field<'a> {
    /// Declared field name (`"0"`, `"1"`, ... for positional fields).
    pub name: &'static str,
    /// The field's value.
    pub value: &'a dyn Inspect,
}

impl<'a> Field<'a> {
    /// Create a field descriptor.
    pub fn new(name: &'static str, value: &'a dyn Inspect) -> Self {
        Self { name, value }
    }
}

/// The structural shape of a value, as seen by the comparator.
///
/// Every [`Inspect`] implementation maps a value onto exactly one of these
/// variants. Composite variants borrow their children so the comparator can
/// descend without copying.
pub enum Kind<'a> {
    /// An untyped absence (the `nil` of the comparison world).
    Invalid,
    Bool(bool),
    /// Any signed integer, widened.
    Int(i128),
    /// Any unsigned integer, widened.
    Uint(u128),
    F32(f32),
    F64(f64),
    Char(char),
    Str(&'a str),
    /// Fixed-size sequence.
    Array(Vec<&'a dyn Inspect>),
    /// Dynamically sized sequence.
    Seq(Vec<&'a dyn Inspect>),
    /// Associative map. Keys are rendered with `Debug`, entries sorted by key.
    Map(Vec<(String, &'a dyn Inspect)>),
    /// Record with fields in declaration order.
    Struct(Vec<Field<'a>>),
    /// Tagged union: the active variant and its fields.
    Enum {
        variant: &'static str,
        fields: Vec<Field<'a>>,
    },
    /// Owning or shared pointer. `addr` identifies the referent.
    Pointer { addr: usize, target: &'a dyn Inspect },
    /// Dynamic box that may be empty (`None` is nil).
    Boxed(Option<&'a dyn Inspect>),
    /// A value reached through a live shared borrow (e.g. `RefCell`).
    Borrowed(Ref<'a, dyn Inspect + 'a>),
    /// Function handle; `None` is a nil function.
    Func(Option<usize>),
    /// Channel handle with its declared capacity (`None` is unbounded).
    Chan(Option<usize>),
    /// Raw address compared numerically.
    Address(usize),
    /// The value exists but cannot be looked at right now.
    Unreadable(&'static str),
}

/// The comparison rule that applies to a [`Kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Invalid,
    Scalar,
    String,
    Array,
    Seq,
    Map,
    Struct,
    Enum,
    Pointer,
    Boxed,
    Borrowed,
    Func,
    Chan,
    Address,
    Unreadable,
}

impl Category {
    /// Human-readable category name used in difference messages.
    pub fn name(self) -> &'static str {
        match self {
            Category::Invalid => "invalid",
            Category::Scalar => "scalar",
            Category::String => "string",
            Category::Array => "array",
            Category::Seq => "sequence",
            Category::Map => "map",
            Category::Struct => "struct",
            Category::Enum => "enum",
            Category::Pointer => "pointer",
            Category::Boxed => "box",
            Category::Borrowed => "borrowed value",
            Category::Func => "function",
            Category::Chan => "channel",
            Category::Address => "address",
            Category::Unreadable => "unreadable value",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<'a> Kind<'a> {
    /// Classify this kind.
    pub fn category(&self) -> Category {
        match self {
            Kind::Invalid => Category::Invalid,
            Kind::Bool(_)
            | Kind::Int(_)
            | Kind::Uint(_)
            | Kind::F32(_)
            | Kind::F64(_)
            | Kind::Char(_) => Category::Scalar,
            Kind::Str(_) => Category::String,
            Kind::Array(_) => Category::Array,
            Kind::Seq(_) => Category::Seq,
            Kind::Map(_) => Category::Map,
            Kind::Struct(_) => Category::Struct,
            Kind::Enum { .. } => Category::Enum,
            Kind::Pointer { .. } => Category::Pointer,
            Kind::Boxed(_) => Category::Boxed,
            Kind::Borrowed(_) => Category::Borrowed,
            Kind::Func(_) => Category::Func,
            Kind::Chan(_) => Category::Chan,
            Kind::Address(_) => Category::Address,
            Kind::Unreadable(_) => Category::Unreadable,
        }
    }

    /// Returns true if this kind represents a nil value.
    ///
    /// Untyped absence, an empty box and a nil function are nil. Everything
    /// else, including empty collections, is not.
    pub fn is_nil(&self) -> bool {
        matches!(self, Kind::Invalid | Kind::Boxed(None) | Kind::Func(None))
    }

    /// Returns true if this kind is a valid (non-absent) value.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Kind::Invalid)
    }
}

/// Returns true if the inspected value is nil. See [`Kind::is_nil`].
pub fn is_nil(value: &dyn Inspect) -> bool {
    value.inspect().is_nil()
}
