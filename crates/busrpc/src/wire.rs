//! # Wire Types
//!
//! The catalog of parameter types a call can declare, and how each converts
//! between its native Rust type and a `buspack::Value`.
//!
//! Each wire type is a zero-sized marker (`Int32`, `StrArray`, ...) naming a
//! bus signature and a native type. Markers implement `Encode` if they may be
//! used as inputs and `Decode` if they may be used as outputs.
//!
//! ## Invariants
//!
//! - Decoding checks the exact wire type. An `i` never decodes as a `u`, and
//!   an `as` never decodes from an `ao`.
//! - Encoding yields `None` only for native values that have no wire form
//!   (an object path that breaks the naming rules).
//! - Variants travel as text: an input `Variant` boxes a string, an output
//!   `Variant` yields the printed form of whatever the variant holds.

use std::collections::BTreeMap;
use std::sync::Arc;

use buspack::Array;
use buspack::Dict;
use buspack::Signature;
use buspack::TypeCode;
use buspack::Value;
use buspack::print::print;

use crate::shadow::Handle;
use crate::shadow::ShadowStore;

/// A parameter type: a bus signature paired with a native type.
pub trait WireType: 'static {
    /// Bus signature, for diagnostics. `*` stands for "any".
    const SIGNATURE: &'static str;
    /// The native type held in the parameter's cell. Its `Default` is the
    /// value an output is reset to after a failed call.
    type Native: Default + Clone + Send + Sync + 'static;
}

/// Wire types usable as inputs.
pub trait Encode: WireType {
    fn encode(native: &Self::Native) -> Option<Value>;
}

/// Wire types usable as outputs.
pub trait Decode: WireType {
    /// Composite results are attached to `store` as handles.
    fn decode(value: &Value, store: &Arc<ShadowStore>) -> Option<Self::Native>;
}

/// Scalar wire types that map one-to-one onto a `Value` variant.
///
/// Arguments passed to callback:
/// 1. Marker name
/// 2. Signature
/// 3. Native type
/// 4. `Value` variant
macro_rules! for_each_scalar {
    ($m:ident) => {
        $m!(Str,    "s", String, Str);
        $m!(Byte,   "y", u8,     Byte);
        $m!(Bool,   "b", bool,   Bool);
        $m!(Int16,  "n", i16,    Int16);
        $m!(UInt16, "q", u16,    UInt16);
        $m!(Int32,  "i", i32,    Int32);
        $m!(UInt32, "u", u32,    UInt32);
        $m!(Int64,  "x", i64,    Int64);
        $m!(UInt64, "t", u64,    UInt64);
        $m!(Double, "d", f64,    Double);
    };
}

macro_rules! scalar_wire_type {
    ($marker:ident, $sig:literal, $native:ty, $var:ident) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $marker;

        impl WireType for $marker {
            const SIGNATURE: &'static str = $sig;
            type Native = $native;
        }

        impl Encode for $marker {
            fn encode(native: &$native) -> Option<Value> {
                Some(Value::$var(native.clone()))
            }
        }

        impl Decode for $marker {
            fn decode(value: &Value, _: &Arc<ShadowStore>) -> Option<$native> {
                match value {
                    Value::$var(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

for_each_scalar!(scalar_wire_type);

fn string_signature() -> Option<Signature> {
    Signature::of(TypeCode::String)
}

fn path_signature() -> Option<Signature> {
    Signature::of(TypeCode::ObjectPath)
}

fn variant_signature() -> Option<Signature> {
    Signature::of(TypeCode::Variant)
}

/// Reads every item of an array whose element type is `elem`.
fn array_items<'a, T>(
    value: &'a Value,
    elem: Option<Signature>,
    item: impl Fn(&'a Value) -> Option<T>,
) -> Option<Vec<T>> {
    let array = value.as_array()?;
    if Some(array.elem()) != elem.as_ref() {
        return None;
    }
    array.items().iter().map(item).collect()
}

/// Reads every entry of a dict of type `a{<key><value>}`.
fn dict_entries<'a, K: Ord, V>(
    value: &'a Value,
    key_sig: Option<Signature>,
    value_sig: Option<Signature>,
    entry: impl Fn(&'a Value, &'a Value) -> Option<(K, V)>,
) -> Option<BTreeMap<K, V>> {
    let dict = value.as_dict()?;
    if Some(dict.key_signature()) != key_sig.as_ref()
        || Some(dict.value_signature()) != value_sig.as_ref()
    {
        return None;
    }
    dict.entries().iter().map(|(k, v)| entry(k, v)).collect()
}

/// Object path `o`, held as a string.
#[derive(Debug, Clone, Copy)]
pub struct ObjectPath;

impl WireType for ObjectPath {
    const SIGNATURE: &'static str = "o";
    type Native = String;
}

impl Encode for ObjectPath {
    fn encode(native: &String) -> Option<Value> {
        buspack::ObjectPath::new(native.as_str()).ok().map(Value::ObjectPath)
    }
}

impl Decode for ObjectPath {
    fn decode(value: &Value, _: &Arc<ShadowStore>) -> Option<String> {
        value.as_object_path().map(|p| p.as_str().to_string())
    }
}

/// Variant `v`, carried as text.
#[derive(Debug, Clone, Copy)]
pub struct Variant;

impl WireType for Variant {
    const SIGNATURE: &'static str = "v";
    type Native = String;
}

impl Encode for Variant {
    fn encode(native: &String) -> Option<Value> {
        Some(Value::variant(Value::Str(native.clone())))
    }
}

impl Decode for Variant {
    fn decode(value: &Value, _: &Arc<ShadowStore>) -> Option<String> {
        value.as_variant().map(print)
    }
}

/// Array of strings `as`.
#[derive(Debug, Clone, Copy)]
pub struct StrArray;

impl WireType for StrArray {
    const SIGNATURE: &'static str = "as";
    type Native = Vec<String>;
}

impl Encode for StrArray {
    fn encode(native: &Vec<String>) -> Option<Value> {
        let items = native.iter().map(|s| Value::Str(s.clone())).collect();
        Array::from_values(string_signature()?, items).ok().map(Value::Array)
    }
}

impl Decode for StrArray {
    fn decode(value: &Value, _: &Arc<ShadowStore>) -> Option<Vec<String>> {
        array_items(value, string_signature(), |item| item.as_str().map(str::to_string))
    }
}

/// Array of object paths `ao`, held as strings.
#[derive(Debug, Clone, Copy)]
pub struct PathArray;

impl WireType for PathArray {
    const SIGNATURE: &'static str = "ao";
    type Native = Vec<String>;
}

impl Encode for PathArray {
    fn encode(native: &Vec<String>) -> Option<Value> {
        let items = native
            .iter()
            .map(|s| buspack::ObjectPath::new(s.as_str()).ok().map(Value::ObjectPath))
            .collect::<Option<Vec<_>>>()?;
        Array::from_values(path_signature()?, items).ok().map(Value::Array)
    }
}

impl Decode for PathArray {
    fn decode(value: &Value, _: &Arc<ShadowStore>) -> Option<Vec<String>> {
        array_items(value, path_signature(), |item| {
            item.as_object_path().map(|p| p.as_str().to_string())
        })
    }
}

/// String to string mapping `a{ss}`.
#[derive(Debug, Clone, Copy)]
pub struct StrDict;

impl WireType for StrDict {
    const SIGNATURE: &'static str = "a{ss}";
    type Native = BTreeMap<String, String>;
}

impl Encode for StrDict {
    fn encode(native: &BTreeMap<String, String>) -> Option<Value> {
        let mut dict = Dict::new(string_signature()?, string_signature()?).ok()?;
        for (k, v) in native {
            dict.insert(Value::Str(k.clone()), Value::Str(v.clone())).ok()?;
        }
        Some(Value::Dict(dict))
    }
}

impl Decode for StrDict {
    fn decode(value: &Value, _: &Arc<ShadowStore>) -> Option<BTreeMap<String, String>> {
        dict_entries(value, string_signature(), string_signature(), |k, v| {
            Some((k.as_str()?.to_string(), v.as_str()?.to_string()))
        })
    }
}

/// String to variant mapping `a{sv}`, output only. Values are printed.
#[derive(Debug, Clone, Copy)]
pub struct VariantDict;

impl WireType for VariantDict {
    const SIGNATURE: &'static str = "a{sv}";
    type Native = BTreeMap<String, String>;
}

impl Decode for VariantDict {
    fn decode(value: &Value, _: &Arc<ShadowStore>) -> Option<BTreeMap<String, String>> {
        dict_entries(value, string_signature(), variant_signature(), |k, v| {
            Some((k.as_str()?.to_string(), print(v.as_variant()?)))
        })
    }
}

/// Array of tuples `a(...)`, output only.
///
/// Every container element becomes one row with a handle per member.
/// Non-container elements are skipped. A dict decodes as rows of
/// `[key, value]`.
#[derive(Debug, Clone, Copy)]
pub struct TupleArray;

impl WireType for TupleArray {
    const SIGNATURE: &'static str = "a(*)";
    type Native = Vec<Vec<Handle>>;
}

impl Decode for TupleArray {
    fn decode(value: &Value, store: &Arc<ShadowStore>) -> Option<Vec<Vec<Handle>>> {
        if !matches!(value, Value::Array(_) | Value::Dict(_)) {
            return None;
        }
        let rows = value
            .children()?
            .into_iter()
            .filter_map(|item| item.children())
            .map(|members| members.into_iter().map(|m| store.insert(m)).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        Some(rows)
    }
}

/// Any value, output only, as its printed form.
#[derive(Debug, Clone, Copy)]
pub struct AnyText;

impl WireType for AnyText {
    const SIGNATURE: &'static str = "*";
    type Native = String;
}

impl Decode for AnyText {
    fn decode(value: &Value, _: &Arc<ShadowStore>) -> Option<String> {
        Some(print(value))
    }
}
