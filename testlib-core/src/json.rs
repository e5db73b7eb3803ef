//! `Inspect` for `serde_json` documents.
//!
//! `null` is a nil box, numbers keep the narrowest of signed, unsigned and
//! floating representation, and objects compare as maps.

use serde_json::{Map, Number, Value};

use crate::inspect::{entries, Inspect};
use crate::kind::Kind;

impl Inspect for Value {
    fn inspect(&self) -> Kind<'_> {
        match self {
            Value::Null => Kind::Boxed(None),
            Value::Bool(b) => Kind::Bool(*b),
            Value::Number(n) => n.inspect(),
            Value::String(s) => Kind::Str(s),
            Value::Array(items) => items.inspect(),
            Value::Object(map) => map.inspect(),
        }
    }
}

impl Inspect for Number {
    fn inspect(&self) -> Kind<'_> {
        if let Some(i) = self.as_i64() {
            Kind::Int(i128::from(i))
        } else if let Some(u) = self.as_u64() {
            Kind::Uint(u128::from(u))
        } else {
            Kind::F64(self.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl Inspect for Map<String, Value> {
    fn inspect(&self) -> Kind<'_> {
        Kind::Map(entries(self.iter()))
    }
}
