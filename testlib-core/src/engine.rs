//! The recursive deep-equality comparator.
//!
//! Evaluation order for every visited pair of values:
//!
//! 1. ignored path: stop, no differences
//! 2. validity: both absent is equal, exactly one absent is a difference
//! 3. type identity: differing type names are a single difference
//! 4. pointer guard: pairs already visited are treated as equal
//! 5. dispatch on the [`Kind`] of both sides

use std::collections::{HashMap, HashSet};

use crate::difference::Difference;
use crate::dump::{render, render_typed};
use crate::inspect::Inspect;
use crate::kind::{Category, Field, Kind};
use crate::visited::{Visit, Visited};

/// Compare two values with no ignored paths.
pub fn deep_diff(have: &dyn Inspect, want: &dyn Inspect) -> Difference {
    Comparison::new().diff(have, want)
}

/// A single top-level comparison.
///
/// Holds the ignore set and the visited-pair set; both live only as long as
/// one [`diff`](Comparison::diff) call.
#[derive(Debug, Default)]
pub struct Comparison {
    ignores: HashSet<String>,
    visited: Visited,
}

impl Comparison {
    /// Create a comparison with no ignored paths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip every value whose dotted path exactly matches one of `paths`.
    ///
    /// Top-level record fields have bare names (`a.b`, not `.a.b`), sequence
    /// elements use `[i]` and map entries use `[key]` with the key's `Debug`
    /// rendering.
    pub fn ignoring<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignores.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Run the comparison.
    pub fn diff(mut self, have: &dyn Inspect, want: &dyn Inspect) -> Difference {
        Difference::from(self.compare("", have, want))
    }

    fn compare(&mut self, path: &str, have: &dyn Inspect, want: &dyn Inspect) -> Vec<String> {
        if self.ignores.contains(path) {
            return Vec::new();
        }

        let have_kind = have.inspect();
        let want_kind = want.inspect();
        let at = label(path);

        match (have_kind.is_valid(), want_kind.is_valid()) {
            (false, false) => return Vec::new(),
            (false, true) => return vec![format!("{}: have invalid or nil object.", at)],
            (true, false) => return vec![format!("{}: wanted invalid or nil object.", at)],
            (true, true) => {}
        }

        if have.type_name() != want.type_name() {
            return vec![format!(
                "{}: Not the same type have: '{}', want: '{}'",
                at,
                have.type_name(),
                want.type_name()
            )];
        }

        if let (Kind::Pointer { addr: a, .. }, Kind::Pointer { addr: b, .. }) =
            (&have_kind, &want_kind)
        {
            if self.visited.enter(*a, *b, want.type_name()) != Visit::First {
                return Vec::new();
            }
        }

        match (have_kind, want_kind) {
            (Kind::Unreadable(reason), _) | (_, Kind::Unreadable(reason)) => {
                vec![format!("{}: cannot inspect value: {}", at, reason)]
            }
            (Kind::Array(h), Kind::Array(w)) | (Kind::Seq(h), Kind::Seq(w)) => {
                self.compare_items(path, have, want, &h, &w)
            }
            (Kind::Map(h), Kind::Map(w)) => self.compare_maps(path, &h, &w),
            (Kind::Struct(h), Kind::Struct(w)) => self.compare_fields(path, &h, &w),
            (
                Kind::Enum {
                    variant: hv,
                    fields: h,
                },
                Kind::Enum {
                    variant: wv,
                    fields: w,
                },
            ) => {
                if hv != wv {
                    vec![
                        format!("{}: different variants have: '{}', want: '{}'", at, hv, wv),
                        format!("  have: {}", render(have)),
                        format!("  want: {}", render(want)),
                    ]
                } else {
                    self.compare_fields(path, &h, &w)
                }
            }
            // Dereferencing is transparent to the path.
            (Kind::Pointer { target: h, .. }, Kind::Pointer { target: w, .. }) => {
                self.compare(path, h, w)
            }
            (Kind::Boxed(h), Kind::Boxed(w)) => match (h, w) {
                (Some(h), Some(w)) => self.compare(path, h, w),
                (None, None) => Vec::new(),
                (h, w) => nil_mismatch(at, h, w),
            },
            (Kind::Borrowed(h), Kind::Borrowed(w)) => self.compare(path, &*h, &*w),
            (Kind::Str(h), Kind::Str(w)) => compare_strings(at, h, w),
            (Kind::Func(h), Kind::Func(w)) => match (h, w) {
                (Some(a), Some(b)) if a != b => vec![
                    format!("{}: not equal.", at),
                    format!("  have: fn@{:#x}", a),
                    format!("  want: fn@{:#x}", b),
                ],
                (Some(_), None) => nil_mismatch(at, Some(have), None),
                (None, Some(_)) => nil_mismatch(at, None, Some(want)),
                _ => Vec::new(),
            },
            (Kind::Chan(h), Kind::Chan(w)) => {
                if h == w {
                    Vec::new()
                } else {
                    vec![
                        format!("{}: capacities differ:", at),
                        format!("  have: {}", capacity(h)),
                        format!("  want: {}", capacity(w)),
                    ]
                }
            }
            (Kind::Address(h), Kind::Address(w)) => {
                if h == w {
                    Vec::new()
                } else {
                    vec![
                        format!("{}: not equal.", at),
                        format!("  have: {:#x}", h),
                        format!("  want: {:#x}", w),
                    ]
                }
            }
            (h, w) => {
                if h.category() == Category::Scalar && w.category() == Category::Scalar {
                    if scalars_equal(&h, &w) {
                        Vec::new()
                    } else {
                        vec![
                            format!("{}: not equal.", at),
                            format!("  have: {}", render_typed(have)),
                            format!("  want: {}", render_typed(want)),
                        ]
                    }
                } else {
                    vec![
                        format!(
                            "{}: kinds differ have: {}, want: {}",
                            at,
                            h.category(),
                            w.category()
                        ),
                        format!("  have: {}", render(have)),
                        format!("  want: {}", render(want)),
                    ]
                }
            }
        }
    }

    fn compare_items(
        &mut self,
        path: &str,
        have: &dyn Inspect,
        want: &dyn Inspect,
        h: &[&dyn Inspect],
        w: &[&dyn Inspect],
    ) -> Vec<String> {
        if h.len() != w.len() {
            return vec![
                format!(
                    "{}: (len(have): {}, len(want): {})",
                    label(path),
                    h.len(),
                    w.len()
                ),
                format!("  have: {}", render(have)),
                format!("  want: {}", render(want)),
            ];
        }
        let mut diffs = Vec::new();
        for (i, (hv, wv)) in h.iter().zip(w).enumerate() {
            diffs.extend(self.compare(&format!("{}[{}]", path, i), *hv, *wv));
        }
        diffs
    }

    fn compare_maps(
        &mut self,
        path: &str,
        h: &[(String, &dyn Inspect)],
        w: &[(String, &dyn Inspect)],
    ) -> Vec<String> {
        let have_index: HashMap<&str, &dyn Inspect> =
            h.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let want_keys: HashSet<&str> = w.iter().map(|(k, _)| k.as_str()).collect();
        let at = label(path);

        let mut diffs = Vec::new();
        for (key, wv) in w {
            match have_index.get(key.as_str()) {
                Some(hv) => {
                    diffs.extend(self.compare(&format!("{}[{}]", path, key), *hv, *wv));
                }
                None => {
                    diffs.push(format!("{}: expected key [{}] is missing.", at, key));
                    diffs.push("  have: not present".to_string());
                    diffs.push(format!("  want: {}", render(*wv)));
                }
            }
        }
        for (key, hv) in h {
            if !want_keys.contains(key.as_str()) {
                diffs.push(format!("{}: unexpected key [{}].", at, key));
                diffs.push(format!("  have: {}", render(*hv)));
                diffs.push("  want: not present".to_string());
            }
        }
        diffs
    }

    fn compare_fields(&mut self, path: &str, h: &[Field<'_>], w: &[Field<'_>]) -> Vec<String> {
        if h.len() != w.len() {
            return vec![format!(
                "{}: field count differs have: {}, want: {}",
                label(path),
                h.len(),
                w.len()
            )];
        }
        let mut diffs = Vec::new();
        for (hf, wf) in h.iter().zip(w) {
            let child = if path.is_empty() {
                wf.name.to_string()
            } else {
                format!("{}.{}", path, wf.name)
            };
            diffs.extend(self.compare(&child, hf.value, wf.value));
        }
        diffs
    }
}

fn label(path: &str) -> &str {
    if path.is_empty() {
        "value"
    } else {
        path
    }
}

fn capacity(cap: Option<usize>) -> String {
    match cap {
        Some(c) => c.to_string(),
        None => "unbounded".to_string(),
    }
}

fn nil_mismatch(at: &str, have: Option<&dyn Inspect>, want: Option<&dyn Inspect>) -> Vec<String> {
    let side = |v: Option<&dyn Inspect>| v.map_or_else(|| "nil".to_string(), render);
    vec![
        format!("{}: not equal.", at),
        format!("  have: {}", side(have)),
        format!("  want: {}", side(want)),
    ]
}

/// Exact scalar equality; floats follow native `==` so NaN is never equal.
fn scalars_equal(h: &Kind<'_>, w: &Kind<'_>) -> bool {
    match (h, w) {
        (Kind::Bool(a), Kind::Bool(b)) => a == b,
        (Kind::Int(a), Kind::Int(b)) => a == b,
        (Kind::Uint(a), Kind::Uint(b)) => a == b,
        (Kind::F32(a), Kind::F32(b)) => a == b,
        (Kind::F64(a), Kind::F64(b)) => a == b,
        (Kind::Char(a), Kind::Char(b)) => a == b,
        _ => false,
    }
}

fn compare_strings(at: &str, h: &str, w: &str) -> Vec<String> {
    if h.len() != w.len() {
        return vec![
            format!("{}: len(have) {} != len(want) {}.", at, h.len(), w.len()),
            format!("  have: {:?}", h),
            format!("  want: {:?}", w),
        ];
    }
    match h.bytes().zip(w.bytes()).position(|(a, b)| a != b) {
        Some(i) => vec![
            format!("{}: difference at index {}.", at, i),
            format!("  have: {:?}", h),
            format!("  want: {:?}", w),
        ],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Nil;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, HashMap};
    use std::rc::Rc;

    #[derive(Clone)]
    struct Pair {
        field1: String,
        field2: String,
    }

    crate::inspect_struct!(Pair { field1, field2 });

    struct Outer {
        a: Inner,
        c: i32,
    }

    struct Inner {
        b: i32,
        c: i32,
    }

    crate::inspect_struct!(Outer { a, c });
    crate::inspect_struct!(Inner { b, c });

    struct Node {
        value: String,
        next: RefCell<Option<Rc<Node>>>,
    }

    crate::inspect_struct!(Node { value, next });

    /// Build a ring of nodes holding `values`, returning the first node.
    fn ring(values: &[&str]) -> Rc<Node> {
        let nodes: Vec<Rc<Node>> = values
            .iter()
            .map(|v| {
                Rc::new(Node {
                    value: v.to_string(),
                    next: RefCell::new(None),
                })
            })
            .collect();
        for (i, node) in nodes.iter().enumerate() {
            let next = Rc::clone(&nodes[(i + 1) % nodes.len()]);
            *node.next.borrow_mut() = Some(next);
        }
        Rc::clone(&nodes[0])
    }

    fn unlink(node: &Rc<Node>) {
        node.next.borrow_mut().take();
    }

    struct Queue {
        capacity: usize,
    }

    impl Inspect for Queue {
        fn inspect(&self) -> Kind<'_> {
            Kind::Chan(Some(self.capacity))
        }
    }

    enum Shape {
        Circle { radius: u32 },
        Square { side: u32 },
    }

    impl Inspect for Shape {
        fn inspect(&self) -> Kind<'_> {
            match self {
                Shape::Circle { radius } => Kind::Enum {
                    variant: "Circle",
                    fields: vec![Field::new("radius", radius)],
                },
                Shape::Square { side } => Kind::Enum {
                    variant: "Square",
                    fields: vec![Field::new("side", side)],
                },
            }
        }
    }

    fn noop() {}
    fn other() {}

    // ========================================================================
    // Scalars and strings
    // ========================================================================

    #[test]
    fn equal_scalars_have_no_differences() {
        assert!(deep_diff(&5_i8, &5_i8).is_empty());
        assert!(deep_diff(&u64::MAX, &u64::MAX).is_empty());
        assert!(deep_diff(&1.25_f32, &1.25_f32).is_empty());
        assert!(deep_diff(&true, &true).is_empty());
        assert!(deep_diff(&'z', &'z').is_empty());
    }

    #[test]
    fn scalar_mismatch_is_typed() {
        let diff = deep_diff(&2_i16, &1_i16);
        assert_eq!(
            diff.lines(),
            &["value: not equal.", "  have: i16(2)", "  want: i16(1)"]
        );
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        assert!(!deep_diff(&f64::NAN, &f64::NAN).is_empty());
    }

    #[test]
    fn differing_types_name_both() {
        let diff = deep_diff(&1_i32, &1_u32);
        assert_eq!(diff.len(), 1);
        assert!(diff.mentions("'i32'"));
        assert!(diff.mentions("'u32'"));

        let diff = deep_diff(&"1", &1_i64);
        assert!(diff.mentions("Not the same type"));
    }

    #[test]
    fn string_reports_first_differing_index() {
        let diff = deep_diff(&"aaba", &"aaaa");
        assert_eq!(diff.lines()[0], "value: difference at index 2.");
        assert_eq!(diff.lines()[1], "  have: \"aaba\"");
        assert_eq!(diff.lines()[2], "  want: \"aaaa\"");
    }

    #[test]
    fn string_length_mismatch_short_circuits() {
        let diff = deep_diff(&"22", &"1");
        assert_eq!(diff.len(), 3);
        assert_eq!(diff.lines()[0], "value: len(have) 2 != len(want) 1.");
    }

    // ========================================================================
    // Validity
    // ========================================================================

    #[test]
    fn invalid_values() {
        assert!(deep_diff(&Nil, &Nil).is_empty());
        assert_eq!(
            deep_diff(&Nil, &1).lines(),
            &["value: have invalid or nil object."]
        );
        assert_eq!(
            deep_diff(&1, &Nil).lines(),
            &["value: wanted invalid or nil object."]
        );
    }

    // ========================================================================
    // Sequences and maps
    // ========================================================================

    #[test]
    fn arrays_compare_positionally() {
        assert!(deep_diff(&[0, 1, 2, 3, 4], &[0, 1, 2, 3, 4]).is_empty());
        let diff = deep_diff(&[0, 1, 2, 3, 5], &[0, 1, 2, 3, 4]);
        assert_eq!(diff.lines()[0], "[4]: not equal.");
        // Arrays of different length are different types.
        assert!(deep_diff(&[0, 1, 2, 3], &[0, 1, 2, 3, 4]).mentions("Not the same type"));
    }

    #[test]
    fn slice_length_mismatch_dumps_both() {
        let diff = deep_diff(&vec![0, 1, 2, 3], &vec![0, 1, 2, 3, 4]);
        assert_eq!(
            diff.lines(),
            &[
                "value: (len(have): 4, len(want): 5)",
                "  have: [0, 1, 2, 3]",
                "  want: [0, 1, 2, 3, 4]",
            ]
        );
    }

    #[test]
    fn maps_compare_by_key_not_order() {
        let mut m1 = HashMap::new();
        m1.insert("a", 1);
        m1.insert("b", 2);
        let mut m2 = HashMap::new();
        m2.insert("b", 2);
        m2.insert("a", 1);
        assert!(deep_diff(&m1, &m2).is_empty());
    }

    #[test]
    fn map_missing_and_unexpected_keys() {
        let have: BTreeMap<&str, i32> = [("a", 1), ("b", 2), ("d", 3)].into_iter().collect();
        let want: BTreeMap<&str, i32> = [("a", -1), ("b", 2), ("c", 3)].into_iter().collect();
        let diff = deep_diff(&have, &want);
        assert_eq!(
            diff.lines(),
            &[
                "[\"a\"]: not equal.",
                "  have: i32(1)",
                "  want: i32(-1)",
                "value: expected key [\"c\"] is missing.",
                "  have: not present",
                "  want: 3",
                "value: unexpected key [\"d\"].",
                "  have: 3",
                "  want: not present",
            ]
        );
    }

    // ========================================================================
    // Records and enums
    // ========================================================================

    #[test]
    fn struct_fields_use_dotted_paths() {
        let have = vec![
            Pair {
                field1: "a".into(),
                field2: "b".into(),
            },
            Pair {
                field1: "a".into(),
                field2: "c".into(),
            },
        ];
        let mut want = have.clone();
        assert!(deep_diff(&have, &want).is_empty());

        want[1].field2 = "b".into();
        let diff = deep_diff(&have, &want);
        assert_eq!(diff.lines()[0], "[1].field2: difference at index 0.");
    }

    #[test]
    fn top_level_struct_fields_have_bare_names() {
        let have = Outer {
            a: Inner { b: 1, c: 2 },
            c: 3,
        };
        let want = Outer {
            a: Inner { b: 9, c: 2 },
            c: 3,
        };
        assert_eq!(deep_diff(&have, &want).lines()[0], "a.b: not equal.");
    }

    #[test]
    fn ignored_paths_are_skipped() {
        let have = Outer {
            a: Inner { b: 1, c: 2 },
            c: 3,
        };
        let want = Outer {
            a: Inner { b: 9, c: 2 },
            c: 3,
        };
        assert!(Comparison::new()
            .ignoring(["a.b"])
            .diff(&have, &want)
            .is_empty());
        let diff = Comparison::new().ignoring(["a.c"]).diff(&have, &want);
        assert!(diff.mentions("a.b: not equal."));
    }

    #[test]
    fn enum_variants() {
        let circle = Shape::Circle { radius: 2 };
        assert!(deep_diff(&circle, &Shape::Circle { radius: 2 }).is_empty());

        let diff = deep_diff(&circle, &Shape::Circle { radius: 3 });
        assert_eq!(diff.lines()[0], "radius: not equal.");

        let diff = deep_diff(&circle, &Shape::Square { side: 2 });
        assert_eq!(
            diff.lines(),
            &[
                "value: different variants have: 'Circle', want: 'Square'",
                "  have: Circle { radius: 2 }",
                "  want: Square { side: 2 }",
            ]
        );
    }

    #[test]
    fn results_compare_variant_then_payload() {
        let ok: Result<i32, String> = Ok(1);
        let err: Result<i32, String> = Err("boom".into());
        assert!(deep_diff(&ok, &Ok::<i32, String>(1)).is_empty());
        assert!(deep_diff(&ok, &err).mentions("different variants"));
    }

    // ========================================================================
    // Pointers, boxes, handles
    // ========================================================================

    #[test]
    fn pointers_are_followed() {
        assert!(deep_diff(&Box::new("a".to_string()), &Box::new("a".to_string())).is_empty());
        let diff = deep_diff(&Box::new("a".to_string()), &Box::new("b".to_string()));
        assert_eq!(diff.lines()[0], "value: difference at index 0.");
    }

    #[test]
    fn shared_referent_short_circuits() {
        let shared = Rc::new(vec![1, 2, 3]);
        let again = Rc::clone(&shared);
        assert!(deep_diff(&shared, &again).is_empty());
    }

    #[test]
    fn option_nil_mismatch() {
        let diff = deep_diff(&Some(1), &None::<i32>);
        assert_eq!(
            diff.lines(),
            &["value: not equal.", "  have: 1", "  want: nil"]
        );
        assert!(deep_diff(&None::<i32>, &None::<i32>).is_empty());
    }

    #[test]
    fn dynamic_boxes_unwrap_to_concrete_values() {
        let a: Box<dyn Inspect> = Box::new("a".to_string());
        let b: Box<dyn Inspect> = Box::new("a".to_string());
        let c: Box<dyn Inspect> = Box::new(1_u8);
        assert!(deep_diff(&a, &b).is_empty());
        assert!(deep_diff(&a, &c).mentions("Not the same type"));
    }

    #[test]
    fn functions_compare_by_identity() {
        let f: fn() = noop;
        let g: fn() = noop;
        let h: fn() = other;
        assert!(deep_diff(&f, &g).is_empty());
        assert!(!deep_diff(&f, &h).is_empty());
        assert!(deep_diff(&Some(f), &None::<fn()>).mentions("want: nil"));
    }

    #[test]
    fn channels_compare_capacity_only() {
        assert!(deep_diff(&Queue { capacity: 10 }, &Queue { capacity: 10 }).is_empty());
        let diff = deep_diff(&Queue { capacity: 10 }, &Queue { capacity: 1000 });
        assert_eq!(
            diff.lines(),
            &["value: capacities differ:", "  have: 10", "  want: 1000"]
        );

        let (a, _ra) = std::sync::mpsc::channel::<bool>();
        let (b, _rb) = std::sync::mpsc::channel::<bool>();
        assert!(deep_diff(&a, &b).is_empty());
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn tokio_senders_compare_capacity_only() {
        use tokio::sync::mpsc;

        let (a, _ra) = mpsc::channel::<u8>(10);
        let (b, _rb) = mpsc::channel::<u8>(10);
        assert!(deep_diff(&a, &b).is_empty());

        let (big, _rbig) = mpsc::channel::<u8>(1000);
        assert_eq!(
            deep_diff(&a, &big).lines(),
            &["value: capacities differ:", "  have: 10", "  want: 1000"]
        );

        let (u1, _ru1) = mpsc::unbounded_channel::<u8>();
        let (u2, _ru2) = mpsc::unbounded_channel::<u8>();
        assert!(deep_diff(&u1, &u2).is_empty());
        assert!(deep_diff(&a, &u1).mentions("Not the same type"));
    }

    #[test]
    fn raw_addresses_compare_numerically() {
        let x = 1;
        let y = 1;
        let px: *const i32 = &x;
        let py: *const i32 = &y;
        assert!(deep_diff(&px, &px).is_empty());
        assert!(!deep_diff(&px, &py).is_empty());
    }

    #[test]
    fn mutably_borrowed_cells_cannot_be_compared() {
        let a = RefCell::new(1);
        let b = RefCell::new(1);
        let _guard = b.borrow_mut();
        assert!(deep_diff(&a, &b).mentions("cannot inspect value: value is mutably borrowed"));
    }

    // ========================================================================
    // Cycles
    // ========================================================================

    #[test]
    fn isomorphic_cycles_are_equal() {
        let a = ring(&["a"]);
        let b = ring(&["a"]);
        assert!(deep_diff(&a, &b).is_empty());

        let c = ring(&["a", "b", "c"]);
        let d = ring(&["a", "b", "c"]);
        assert!(deep_diff(&c, &d).is_empty());

        for n in [&a, &b, &c, &d] {
            unlink(n);
        }
    }

    #[test]
    fn one_node_cycle_against_two_node_cycle_terminates() {
        let one = ring(&["a"]);
        let two = ring(&["a", "b"]);
        let diff = deep_diff(&one, &two);
        assert_eq!(diff.lines()[0], "next.value: difference at index 0.");

        unlink(&one);
        unlink(&two);
    }

    // ========================================================================
    // Properties
    // ========================================================================

    proptest! {
        #[test]
        fn integers_equal_themselves(v in any::<i64>()) {
            prop_assert!(deep_diff(&v, &v).is_empty());
        }

        #[test]
        fn distinct_integers_differ(a in any::<u32>(), b in any::<u32>()) {
            prop_assume!(a != b);
            prop_assert!(!deep_diff(&a, &b).is_empty());
        }

        #[test]
        fn strings_equal_their_clones(s in ".*") {
            prop_assert!(deep_diff(&s, &s.clone()).is_empty());
        }

        #[test]
        fn vectors_equal_their_clones(v in proptest::collection::vec(any::<i32>(), 0..32)) {
            prop_assert!(deep_diff(&v, &v.clone()).is_empty());
        }

        #[test]
        fn maps_equal_their_clones(
            m in proptest::collection::hash_map(".{0,8}", any::<u16>(), 0..16)
        ) {
            prop_assert!(deep_diff(&m, &m.clone()).is_empty());
        }
    }
}
