//! The `Inspect` structural descriptor and its implementations for std types.
//!
//! Rust has no runtime reflection, so every type the comparator can walk
//! describes its own shape by returning a [`Kind`]. Records use
//! [`inspect_struct!`](crate::inspect_struct); enums implement the trait by
//! hand with [`Kind::Enum`].

use std::borrow::Cow;
use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use crate::kind::{Field, Kind};

/// A value whose structure can be walked by the deep-equality engine.
pub trait Inspect {
    /// Describe the structure of this value.
    fn inspect(&self) -> Kind<'_>;

    /// Runtime type identity. Two values are only compared structurally when
    /// their type names match.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The untyped absence. Equal only to other nil values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nil;

impl Inspect for Nil {
    fn inspect(&self) -> Kind<'_> {
        Kind::Invalid
    }

    fn type_name(&self) -> &'static str {
        "nil"
    }
}

// References are transparent: `&T` inspects and names as `T`.
impl<T: Inspect + ?Sized> Inspect for &T {
    fn inspect(&self) -> Kind<'_> {
        (**self).inspect()
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

impl<T: Inspect + ?Sized> Inspect for &mut T {
    fn inspect(&self) -> Kind<'_> {
        (**self).inspect()
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

// ============================================================================
// Scalars
// ============================================================================

macro_rules! inspect_signed {
    ($($t:ty),*) => {
        $(impl Inspect for $t {
            fn inspect(&self) -> Kind<'_> {
                Kind::Int(*self as i128)
            }
        })*
    };
}

macro_rules! inspect_unsigned {
    ($($t:ty),*) => {
        $(impl Inspect for $t {
            fn inspect(&self) -> Kind<'_> {
                Kind::Uint(*self as u128)
            }
        })*
    };
}

inspect_signed!(i8, i16, i32, i64, i128, isize);
inspect_unsigned!(u8, u16, u32, u64, u128, usize);

impl Inspect for bool {
    fn inspect(&self) -> Kind<'_> {
        Kind::Bool(*self)
    }
}

impl Inspect for f32 {
    fn inspect(&self) -> Kind<'_> {
        Kind::F32(*self)
    }
}

impl Inspect for f64 {
    fn inspect(&self) -> Kind<'_> {
        Kind::F64(*self)
    }
}

impl Inspect for char {
    fn inspect(&self) -> Kind<'_> {
        Kind::Char(*self)
    }
}

impl Inspect for Duration {
    fn inspect(&self) -> Kind<'_> {
        Kind::Uint(self.as_nanos())
    }
}

// ============================================================================
// Strings
// ============================================================================

impl Inspect for str {
    fn inspect(&self) -> Kind<'_> {
        Kind::Str(self)
    }
}

impl Inspect for String {
    fn inspect(&self) -> Kind<'_> {
        Kind::Str(self.as_str())
    }
}

impl Inspect for Cow<'_, str> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Str(self)
    }
}

impl Inspect for Path {
    fn inspect(&self) -> Kind<'_> {
        match self.to_str() {
            Some(s) => Kind::Str(s),
            None => Kind::Unreadable("path is not valid UTF-8"),
        }
    }
}

impl Inspect for PathBuf {
    fn inspect(&self) -> Kind<'_> {
        self.as_path().inspect()
    }
}

// ============================================================================
// Sequences
// ============================================================================

fn items<'a, T: Inspect + 'a>(iter: impl Iterator<Item = &'a T>) -> Vec<&'a dyn Inspect> {
    iter.map(|v| v as &dyn Inspect).collect()
}

impl<T: Inspect, const N: usize> Inspect for [T; N] {
    fn inspect(&self) -> Kind<'_> {
        Kind::Array(items(self.iter()))
    }
}

impl<T: Inspect> Inspect for [T] {
    fn inspect(&self) -> Kind<'_> {
        Kind::Seq(items(self.iter()))
    }
}

impl<T: Inspect> Inspect for Vec<T> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Seq(items(self.iter()))
    }
}

impl<T: Inspect> Inspect for VecDeque<T> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Seq(items(self.iter()))
    }
}

// ============================================================================
// Maps and sets
// ============================================================================

const UNIT: &() = &();

/// Render keys with `Debug` and sort so iteration order never matters.
pub(crate) fn entries<'a, K, V>(iter: impl Iterator<Item = (&'a K, &'a V)>) -> Vec<(String, &'a dyn Inspect)>
where
    K: Debug + 'a,
    V: Inspect + 'a,
{
    let mut out: Vec<(String, &'a dyn Inspect)> = iter
        .map(|(k, v)| (format!("{:?}", k), v as &dyn Inspect))
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

fn members<'a, K: Debug + 'a>(iter: impl Iterator<Item = &'a K>) -> Vec<(String, &'a dyn Inspect)> {
    let mut out: Vec<(String, &'a dyn Inspect)> = iter
        .map(|k| (format!("{:?}", k), UNIT as &dyn Inspect))
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

impl<K: Debug, V: Inspect, S> Inspect for HashMap<K, V, S> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Map(entries(self.iter()))
    }
}

impl<K: Debug, V: Inspect> Inspect for BTreeMap<K, V> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Map(entries(self.iter()))
    }
}

impl<K: Debug, S> Inspect for HashSet<K, S> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Map(members(self.iter()))
    }
}

impl<K: Debug> Inspect for BTreeSet<K> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Map(members(self.iter()))
    }
}

// ============================================================================
// Records
// ============================================================================

impl Inspect for () {
    fn inspect(&self) -> Kind<'_> {
        Kind::Struct(Vec::new())
    }
}

macro_rules! inspect_tuple {
    ($(($($name:ident $idx:tt),+))*) => {
        $(impl<$($name: Inspect),+> Inspect for ($($name,)+) {
            fn inspect(&self) -> Kind<'_> {
                Kind::Struct(vec![$(Field::new(stringify!($idx), &self.$idx)),+])
            }
        })*
    };
}

inspect_tuple! {
    (A 0)
    (A 0, B 1)
    (A 0, B 1, C 2)
    (A 0, B 1, C 2, D 3)
    (A 0, B 1, C 2, D 3, E 4)
}

impl<T: Inspect, E: Inspect> Inspect for Result<T, E> {
    fn inspect(&self) -> Kind<'_> {
        match self {
            Ok(v) => Kind::Enum {
                variant: "Ok",
                fields: vec![Field::new("0", v)],
            },
            Err(e) => Kind::Enum {
                variant: "Err",
                fields: vec![Field::new("0", e)],
            },
        }
    }
}

// ============================================================================
// Pointers and boxes
// ============================================================================

impl<T: Inspect> Inspect for Option<T> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Boxed(self.as_ref().map(|v| v as &dyn Inspect))
    }
}

impl<T: Inspect> Inspect for Box<T> {
    fn inspect(&self) -> Kind<'_> {
        let target: &T = self;
        Kind::Pointer {
            addr: target as *const T as usize,
            target,
        }
    }
}

// A boxed trait object is a dynamic value: it unwraps to the concrete type.
impl<'d> Inspect for Box<dyn Inspect + 'd> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Boxed(Some(&**self))
    }
}

impl<T: Inspect> Inspect for Rc<T> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Pointer {
            addr: Rc::as_ptr(self) as usize,
            target: &**self,
        }
    }
}

impl<T: Inspect> Inspect for Arc<T> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Pointer {
            addr: Arc::as_ptr(self) as usize,
            target: &**self,
        }
    }
}

fn as_inspect<'s, T: Inspect + 's>(value: &T) -> &(dyn Inspect + 's) {
    value
}

impl<T: Inspect> Inspect for RefCell<T> {
    fn inspect(&self) -> Kind<'_> {
        match self.try_borrow() {
            Ok(guard) => Kind::Borrowed(Ref::map(guard, as_inspect)),
            Err(_) => Kind::Unreadable("value is mutably borrowed"),
        }
    }
}

impl<T> Inspect for std::rc::Weak<T> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Address(self.as_ptr() as usize)
    }
}

impl<T> Inspect for std::sync::Weak<T> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Address(self.as_ptr() as usize)
    }
}

impl<T: ?Sized> Inspect for *const T {
    fn inspect(&self) -> Kind<'_> {
        Kind::Address(*self as *const () as usize)
    }
}

impl<T: ?Sized> Inspect for *mut T {
    fn inspect(&self) -> Kind<'_> {
        Kind::Address(*self as *const () as usize)
    }
}

// ============================================================================
// Opaque handles
// ============================================================================

macro_rules! inspect_fn {
    ($(($($arg:ident),*))*) => {
        $(impl<R, $($arg),*> Inspect for fn($($arg),*) -> R {
            fn inspect(&self) -> Kind<'_> {
                Kind::Func(Some(*self as usize))
            }
        })*
    };
}

inspect_fn! {
    ()
    (A)
    (A, B)
    (A, B, C)
}

impl<T> Inspect for std::sync::mpsc::Sender<T> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Chan(None)
    }
}

#[cfg(feature = "tokio")]
impl<T> Inspect for tokio::sync::mpsc::Sender<T> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Chan(Some(self.max_capacity()))
    }
}

#[cfg(feature = "tokio")]
impl<T> Inspect for tokio::sync::mpsc::UnboundedSender<T> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Chan(None)
    }
}

/// Implement [`Inspect`] for a record by listing its fields in declaration
/// order.
///
/// ```
/// use testlib_core::{deep_diff, inspect_struct};
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// inspect_struct!(Point { x, y });
///
/// let diff = deep_diff(&Point { x: 1, y: 2 }, &Point { x: 1, y: 3 });
/// assert!(diff.report().starts_with("y: not equal."));
/// ```
///
/// Generic records declare their parameters up front:
///
/// ```
/// use testlib_core::{deep_diff, inspect_struct, Inspect};
///
/// struct Labelled<T> {
///     label: String,
///     value: T,
/// }
///
/// inspect_struct!(impl<T: Inspect> Labelled<T> { label, value });
///
/// let a = Labelled { label: "n".into(), value: 1_u8 };
/// let b = Labelled { label: "n".into(), value: 2_u8 };
/// assert!(deep_diff(&a, &b).report().starts_with("value: not equal."));
/// ```
#[macro_export]
macro_rules! inspect_struct {
    (impl<$($gen:ident $(: $bound:path)?),+ $(,)?> $ty:ty { $($field:tt),* $(,)? }) => {
        impl<$($gen $(: $bound)?),+> $crate::Inspect for $ty {
            fn inspect(&self) -> $crate::Kind<'_> {
                $crate::Kind::Struct(vec![
                    $($crate::Field::new(stringify!($field), &self.$field)),*
                ])
            }
        }
    };
    ($ty:ty { $($field:tt),* $(,)? }) => {
        impl $crate::Inspect for $ty {
            fn inspect(&self) -> $crate::Kind<'_> {
                $crate::Kind::Struct(vec![
                    $($crate::Field::new(stringify!($field), &self.$field)),*
                ])
            }
        }
    };
}
