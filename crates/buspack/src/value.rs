//! # Dynamic values
//!
//! A `Value` is a runtime-typed bus value. Scalars map directly onto Rust
//! primitives; containers carry the signature of their elements so that the
//! type of a value never depends on its contents.

use crate::Error;
use crate::Result;
use crate::Signature;
use crate::TypeCode;
use crate::names;

/// A validated object path, e.g. `/org/freedesktop/resolve1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        names::validate_object_path(&path)?;
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// A homogeneous array.
///
/// # Invariants
/// - Every item has the signature `elem`.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    elem: Signature,
    items: Vec<Value>,
}

impl Array {
    /// Creates an empty array of the given element type.
    pub fn new(elem: Signature) -> Self {
        Self { elem, items: Vec::new() }
    }

    /// Builds an array, checking every item against `elem`.
    pub fn from_values(elem: Signature, items: Vec<Value>) -> Result<Self> {
        let mut array = Self::new(elem);
        for item in items {
            array.push(item)?;
        }
        Ok(array)
    }

    /// Appends an item.
    ///
    /// # Errors
    /// Returns `Error::TypeMismatch` if the item's signature differs from the element type.
    pub fn push(&mut self, item: Value) -> Result<()> {
        let found = item.signature();
        if found != self.elem {
            return Err(Error::TypeMismatch {
                expected: self.elem.to_string(),
                found: found.to_string(),
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn elem(&self) -> &Signature {
        &self.elem
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// An array of dict entries, `a{kv}`.
///
/// Entries keep insertion order; keys are not deduplicated, matching the
/// wire representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Dict {
    key: Signature,
    value: Signature,
    entries: Vec<(Value, Value)>,
}

impl Dict {
    /// Creates an empty dict.
    ///
    /// # Errors
    /// Returns `Error::InvalidDictKey` if `key` is not a basic type.
    pub fn new(key: Signature, value: Signature) -> Result<Self> {
        if !key.is_basic() {
            return Err(Error::InvalidDictKey(key.as_str().as_bytes()[0]));
        }
        Ok(Self { key, value, entries: Vec::new() })
    }

    pub fn insert(&mut self, key: Value, value: Value) -> Result<()> {
        for (expected, item) in [(&self.key, &key), (&self.value, &value)] {
            let found = item.signature();
            if &found != expected {
                return Err(Error::TypeMismatch {
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
        self.entries.push((key, value));
        Ok(())
    }

    pub fn key_signature(&self) -> &Signature {
        &self.key
    }

    pub fn value_signature(&self) -> &Signature {
        &self.value
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(Value, Value)> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A runtime-typed bus value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(u8),
    Bool(bool),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Str(String),
    ObjectPath(ObjectPath),
    Signature(Signature),
    /// A boxed value of any type, `v`.
    Variant(Box<Value>),
    Array(Array),
    Dict(Dict),
    /// A struct, `(...)`. Never empty when built through a signature.
    Struct(Vec<Value>),
}

impl Value {
    /// Computes the signature of this value.
    pub fn signature(&self) -> Signature {
        let basic = |code: TypeCode| Signature(String::from(code as u8 as char));
        match self {
            Value::Byte(_) => basic(TypeCode::Byte),
            Value::Bool(_) => basic(TypeCode::Bool),
            Value::Int16(_) => basic(TypeCode::Int16),
            Value::UInt16(_) => basic(TypeCode::UInt16),
            Value::Int32(_) => basic(TypeCode::Int32),
            Value::UInt32(_) => basic(TypeCode::UInt32),
            Value::Int64(_) => basic(TypeCode::Int64),
            Value::UInt64(_) => basic(TypeCode::UInt64),
            Value::Double(_) => basic(TypeCode::Double),
            Value::Str(_) => basic(TypeCode::String),
            Value::ObjectPath(_) => basic(TypeCode::ObjectPath),
            Value::Signature(_) => basic(TypeCode::Signature),
            Value::Variant(_) => basic(TypeCode::Variant),
            Value::Array(a) => Signature::assemble(format!("a{}", a.elem().as_str())),
            Value::Dict(d) => Signature::assemble(format!(
                "a{{{}{}}}",
                d.key_signature().as_str(),
                d.value_signature().as_str()
            )),
            Value::Struct(fields) => {
                let body: String = fields.iter().map(|f| f.signature().as_str().to_string()).collect();
                Signature::assemble(format!("({})", body))
            }
        }
    }

    /// Wraps a value in a variant.
    pub fn variant(inner: Value) -> Self {
        Value::Variant(Box::new(inner))
    }

    /// Whether this value holds other values (variant, array, dict, struct).
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Variant(_) | Value::Array(_) | Value::Dict(_) | Value::Struct(_))
    }

    /// The direct children of a container, in order.
    ///
    /// Dict entries are returned as two-member structs, the way they appear
    /// when a dict is iterated as an array of entries.
    pub fn children(&self) -> Option<Vec<Value>> {
        match self {
            Value::Variant(inner) => Some(vec![(**inner).clone()]),
            Value::Array(a) => Some(a.items().to_vec()),
            Value::Dict(d) => Some(
                d.entries()
                    .iter()
                    .map(|(k, v)| Value::Struct(vec![k.clone(), v.clone()]))
                    .collect(),
            ),
            Value::Struct(fields) => Some(fields.clone()),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> Option<u8> {
        match self { Value::Byte(v) => Some(*v), _ => None }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self { Value::Bool(v) => Some(*v), _ => None }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self { Value::Int16(v) => Some(*v), _ => None }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self { Value::UInt16(v) => Some(*v), _ => None }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self { Value::Int32(v) => Some(*v), _ => None }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self { Value::UInt32(v) => Some(*v), _ => None }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self { Value::Int64(v) => Some(*v), _ => None }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self { Value::UInt64(v) => Some(*v), _ => None }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self { Value::Double(v) => Some(*v), _ => None }
    }

    /// The string of a `s` value. Object paths and signatures are not strings.
    pub fn as_str(&self) -> Option<&str> {
        match self { Value::Str(v) => Some(v), _ => None }
    }

    pub fn as_object_path(&self) -> Option<&ObjectPath> {
        match self { Value::ObjectPath(v) => Some(v), _ => None }
    }

    pub fn as_variant(&self) -> Option<&Value> {
        match self { Value::Variant(v) => Some(v), _ => None }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self { Value::Array(v) => Some(v), _ => None }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self { Value::Dict(v) => Some(v), _ => None }
    }

    pub fn as_struct(&self) -> Option<&[Value]> {
        match self { Value::Struct(v) => Some(v), _ => None }
    }
}

macro_rules! impl_from_scalar {
    ($ty:ty, $var:ident) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$var(v)
            }
        }
    };
}

impl_from_scalar!(u8, Byte);
impl_from_scalar!(bool, Bool);
impl_from_scalar!(i16, Int16);
impl_from_scalar!(u16, UInt16);
impl_from_scalar!(i32, Int32);
impl_from_scalar!(u32, UInt32);
impl_from_scalar!(i64, Int64);
impl_from_scalar!(u64, UInt64);
impl_from_scalar!(f64, Double);
impl_from_scalar!(String, Str);
impl_from_scalar!(ObjectPath, ObjectPath);
impl_from_scalar!(Array, Array);
impl_from_scalar!(Dict, Dict);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}
