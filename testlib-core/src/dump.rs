//! Cycle-safe rendering of inspected values for difference messages.

use std::fmt::Write;

use crate::inspect::Inspect;
use crate::kind::{Field, Kind};

/// Render a value in a compact, Rust-like notation.
///
/// Pointers already being rendered further up are printed as `&<cycle>` so
/// cyclic graphs terminate.
pub fn render(value: &dyn Inspect) -> String {
    let mut renderer = Renderer::default();
    renderer.value(value);
    renderer.out
}

/// Render a scalar together with its type, e.g. `i32(5)`.
pub fn render_typed(value: &dyn Inspect) -> String {
    format!("{}({})", short_type_name(value.type_name()), render(value))
}

/// Strip module paths from every path segment of a type name.
///
/// `alloc::vec::Vec<my_crate::Point>` becomes `Vec<Point>`.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            push_last_segment(&mut out, &segment);
            segment.clear();
            out.push(c);
        }
    }
    push_last_segment(&mut out, &segment);
    out
}

fn push_last_segment(out: &mut String, segment: &str) {
    out.push_str(segment.rsplit("::").next().unwrap_or(segment));
}

#[derive(Default)]
struct Renderer {
    out: String,
    stack: Vec<usize>,
}

impl Renderer {
    fn value(&mut self, value: &dyn Inspect) {
        match value.inspect() {
            Kind::Invalid => self.out.push_str("nil"),
            Kind::Bool(b) => self.write(format_args!("{}", b)),
            Kind::Int(i) => self.write(format_args!("{}", i)),
            Kind::Uint(u) => self.write(format_args!("{}", u)),
            Kind::F32(f) => self.write(format_args!("{:?}", f)),
            Kind::F64(f) => self.write(format_args!("{:?}", f)),
            Kind::Char(c) => self.write(format_args!("{:?}", c)),
            Kind::Str(s) => self.write(format_args!("{:?}", s)),
            Kind::Array(items) | Kind::Seq(items) => {
                self.out.push('[');
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.value(item);
                }
                self.out.push(']');
            }
            Kind::Map(entries) => {
                self.out.push('{');
                for (i, (key, item)) in entries.into_iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&key);
                    self.out.push_str(": ");
                    self.value(item);
                }
                self.out.push('}');
            }
            Kind::Struct(fields) => {
                // Tuples print without their type name.
                let full = value.type_name();
                let name = if full.starts_with('(') {
                    String::new()
                } else {
                    short_type_name(full)
                };
                if fields.is_empty() && name.is_empty() {
                    self.out.push_str("()");
                } else {
                    self.fields(&name, &fields);
                }
            }
            Kind::Enum { variant, fields } => self.fields(variant, &fields),
            Kind::Pointer { addr, target } => {
                self.out.push('&');
                if self.stack.contains(&addr) {
                    self.out.push_str("<cycle>");
                } else {
                    self.stack.push(addr);
                    self.value(target);
                    self.stack.pop();
                }
            }
            Kind::Boxed(None) | Kind::Func(None) => self.out.push_str("nil"),
            Kind::Boxed(Some(inner)) => self.value(inner),
            Kind::Borrowed(inner) => self.value(&*inner),
            Kind::Func(Some(addr)) => self.write(format_args!("fn@{:#x}", addr)),
            Kind::Chan(Some(cap)) => self.write(format_args!("chan(capacity={})", cap)),
            Kind::Chan(None) => self.out.push_str("chan(unbounded)"),
            Kind::Address(addr) => self.write(format_args!("{:#x}", addr)),
            Kind::Unreadable(reason) => self.write(format_args!("<{}>", reason)),
        }
    }

    fn fields(&mut self, name: &str, fields: &[Field<'_>]) {
        self.out.push_str(name);
        if fields.is_empty() {
            return;
        }
        let positional = fields
            .iter()
            .all(|f| f.name.bytes().all(|b| b.is_ascii_digit()));
        if positional {
            self.out.push('(');
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.value(field.value);
            }
            self.out.push(')');
        } else {
            self.out.push_str(" { ");
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.out.push_str(field.name);
                self.out.push_str(": ");
                self.value(field.value);
            }
            self.out.push_str(" }");
        }
    }

    fn write(&mut self, args: std::fmt::Arguments<'_>) {
        // Writing into a String cannot fail.
        let _ = self.out.write_fmt(args);
    }
}
