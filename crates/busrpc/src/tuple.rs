//! # Tuple Descriptors
//!
//! A `TupleLayout` names and types the members of one record in an
//! array-of-tuples reply. A `Tuple` is one such record after its handles have
//! been matched against the layout.
//!
//! ```ignore
//! let mut layout = TupleLayout::new();
//! let id = layout.int("id");
//! let name = layout.string("name");
//!
//! let rows: Vec<Tuple> = layout.assign_rows(&reply)?;
//! println!("{} is {}", rows[0].get(id)?, rows[0].get(name)?);
//! ```

use std::fmt;
use std::marker::PhantomData;

use crate::shadow::Handle;

/// A decoded member of a tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Double(f64),
    Boolean(bool),
    String(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{:?}", v),
            FieldValue::Boolean(v) => write!(f, "{}", v),
            FieldValue::String(v) => f.write_str(v),
        }
    }
}

/// A native type a tuple member can be read as.
pub trait FieldType: Sized {
    fn extract(handle: &Handle) -> Option<FieldValue>;
    fn from_field(value: &FieldValue) -> Option<Self>;
}

impl FieldType for i32 {
    fn extract(handle: &Handle) -> Option<FieldValue> {
        handle.as_i32().map(FieldValue::Int)
    }
    fn from_field(value: &FieldValue) -> Option<Self> {
        match value { FieldValue::Int(v) => Some(*v), _ => None }
    }
}

impl FieldType for f64 {
    fn extract(handle: &Handle) -> Option<FieldValue> {
        handle.as_f64().map(FieldValue::Double)
    }
    fn from_field(value: &FieldValue) -> Option<Self> {
        match value { FieldValue::Double(v) => Some(*v), _ => None }
    }
}

impl FieldType for bool {
    fn extract(handle: &Handle) -> Option<FieldValue> {
        handle.as_bool().map(FieldValue::Boolean)
    }
    fn from_field(value: &FieldValue) -> Option<Self> {
        match value { FieldValue::Boolean(v) => Some(*v), _ => None }
    }
}

impl FieldType for String {
    fn extract(handle: &Handle) -> Option<FieldValue> {
        handle.as_str().map(FieldValue::String)
    }
    fn from_field(value: &FieldValue) -> Option<Self> {
        match value { FieldValue::String(v) => Some(v.clone()), _ => None }
    }
}

/// Typed accessor for one member of a layout.
pub struct Field<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({})", self.index)
    }
}

struct FieldSpec {
    name: String,
    extract: fn(&Handle) -> Option<FieldValue>,
}

/// Ordered, typed member list of a tuple.
#[derive(Default)]
pub struct TupleLayout {
    fields: Vec<FieldSpec>,
}

impl TupleLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the next member.
    pub fn field<T: FieldType>(&mut self, name: impl Into<String>) -> Field<T> {
        let index = self.fields.len();
        self.fields.push(FieldSpec {
            name: name.into(),
            extract: T::extract,
        });
        Field { index, _marker: PhantomData }
    }

    pub fn int(&mut self, name: impl Into<String>) -> Field<i32> {
        self.field(name)
    }

    pub fn double(&mut self, name: impl Into<String>) -> Field<f64> {
        self.field(name)
    }

    pub fn boolean(&mut self, name: impl Into<String>) -> Field<bool> {
        self.field(name)
    }

    pub fn string(&mut self, name: impl Into<String>) -> Field<String> {
        self.field(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Assigns every row, failing if any row does not match.
    pub fn assign_rows(&self, rows: &[Vec<Handle>]) -> Option<Vec<Tuple>> {
        rows.iter().map(|row| Tuple::assign(self, row)).collect()
    }
}

/// One record read through a `TupleLayout`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    values: Vec<FieldValue>,
}

impl Tuple {
    /// Matches `handles` against `layout` position by position.
    ///
    /// Returns `None` unless there is exactly one handle per member and every
    /// member extracts its declared type.
    pub fn assign(layout: &TupleLayout, handles: &[Handle]) -> Option<Self> {
        if handles.len() != layout.fields.len() {
            return None;
        }
        let values = layout
            .fields
            .iter()
            .zip(handles)
            .map(|(spec, handle)| (spec.extract)(handle))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { values })
    }

    /// Reads a member. `None` if the field belongs to a different layout.
    pub fn get<T: FieldType>(&self, field: Field<T>) -> Option<T> {
        self.values.get(field.index).and_then(T::from_field)
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", value)?;
        }
        f.write_str(")")
    }
}
