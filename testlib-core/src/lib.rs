//! Structural deep-equality for test assertions.
//!
//! A value takes part in comparison by implementing [`Inspect`], which
//! describes its shape as a [`Kind`]. [`deep_diff`] walks two values in
//! lockstep and reports every mismatch with the dotted path where it occurs.
//!
//! ```
//! use std::collections::HashMap;
//! use testlib_core::deep_diff;
//!
//! let have: HashMap<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
//! let want: HashMap<&str, i32> = [("b", 2), ("a", 1)].into_iter().collect();
//! assert!(deep_diff(&have, &want).is_empty());
//!
//! let diff = deep_diff(&"aaba", &"aaaa");
//! assert_eq!(diff.lines()[0], "value: difference at index 2.");
//! ```
//!
//! Cycles through `Rc`, `Arc` and `Box` are handled: a pair of referents is
//! compared at most once per top-level call.

pub mod difference;
pub mod dump;
pub mod engine;
pub mod inspect;
pub mod kind;
pub mod visited;

#[cfg(feature = "json")]
mod json;

pub use difference::Difference;
pub use dump::{render, render_typed, short_type_name};
pub use engine::{deep_diff, Comparison};
pub use inspect::{Inspect, Nil};
pub use kind::{is_nil, Category, Field, Kind};
pub use visited::{Visit, Visited};
