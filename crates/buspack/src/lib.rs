//! # Buspack
//!
//! The dynamic value model of a typed message bus.
//!
//! ## Philosophy
//!
//! - **Self-describing**: Every `Value` knows its own `Signature`. Containers
//!   carry their element types, so an empty array still has a type.
//! - **Checked at the edges**: Signatures, object paths and bus names are
//!   validated when they are constructed, never when they are used.
//! - **Printable**: Every value has a textual form (see [`print`]) that is
//!   stable enough to hand to a caller who does not know the type.
//!
//! ## Signatures
//!
//! - **Basic**: `y b n q i u x t d s o g`
//! - **Variant**: `v`
//! - **Array**: `a` followed by one complete type
//! - **Struct**: `(` one or more complete types `)`
//! - **Dict entry**: `{` basic type, complete type `}`, only directly after `a`

pub mod names;
pub mod print;
pub mod value;

pub use value::Array;
pub use value::Dict;
pub use value::ObjectPath;
pub use value::Value;

#[cfg(test)]
mod tests;

/// Maximum length of a signature string, in bytes.
pub const MAX_SIGNATURE_LEN: usize = 255;

/// Maximum nesting depth of arrays and structs inside one signature.
pub const MAX_NESTING: usize = 64;

/// Buspack validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Byte does not correspond to a valid `TypeCode`.
    InvalidTypeCode(u8),
    /// Signature ended in the middle of a type.
    UnexpectedEnd,
    /// A signature that must hold exactly one complete type holds more.
    TrailingTypes(String),
    /// A struct with no members, `()`.
    EmptyStruct,
    /// A dict entry whose key is not a basic type.
    InvalidDictKey(u8),
    /// A dict entry that is not the element of an array.
    StrayDictEntry,
    /// Arrays and structs nested deeper than `MAX_NESTING`.
    NestingTooDeep,
    /// Signature longer than `MAX_SIGNATURE_LEN`.
    SignatureTooLong(usize),
    /// A value did not match the element type of its container.
    TypeMismatch { expected: String, found: String },
    /// String is not a valid object path.
    InvalidObjectPath(String),
    /// String is not a valid bus name.
    InvalidBusName(String),
    /// String is not a valid interface name.
    InvalidInterfaceName(String),
    /// String is not a valid member (method or signal) name.
    InvalidMemberName(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidTypeCode(b) => write!(f, "Invalid type code: {:?}", *b as char),
            Error::TrailingTypes(rest) => write!(f, "Expected a single complete type, found trailing '{}'", rest),
            Error::InvalidDictKey(b) => write!(f, "Dict entry key must be a basic type, found {:?}", *b as char),
            Error::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected '{}', found '{}'", expected, found)
            }
            Error::InvalidObjectPath(s) => write!(f, "{}: invalid object path", s),
            Error::InvalidBusName(s) => write!(f, "{}: invalid bus name", s),
            Error::InvalidInterfaceName(s) => write!(f, "{}: invalid interface name", s),
            Error::InvalidMemberName(s) => write!(f, "{}: invalid member name", s),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for Buspack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A single character of a type signature.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    // Basic types
    Byte = b'y',
    Bool = b'b',
    Int16 = b'n',
    UInt16 = b'q',
    Int32 = b'i',
    UInt32 = b'u',
    Int64 = b'x',
    UInt64 = b't',
    Double = b'd',
    String = b's',
    ObjectPath = b'o',
    Signature = b'g',

    // Containers
    Variant = b'v',
    Array = b'a',
    StructBegin = b'(',
    StructEnd = b')',
    DictBegin = b'{',
    DictEnd = b'}',
}

impl TypeCode {
    /// Returns the TypeCode for a given byte, or `None` if invalid.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            b'y' => Some(TypeCode::Byte),
            b'b' => Some(TypeCode::Bool),
            b'n' => Some(TypeCode::Int16),
            b'q' => Some(TypeCode::UInt16),
            b'i' => Some(TypeCode::Int32),
            b'u' => Some(TypeCode::UInt32),
            b'x' => Some(TypeCode::Int64),
            b't' => Some(TypeCode::UInt64),
            b'd' => Some(TypeCode::Double),
            b's' => Some(TypeCode::String),
            b'o' => Some(TypeCode::ObjectPath),
            b'g' => Some(TypeCode::Signature),
            b'v' => Some(TypeCode::Variant),
            b'a' => Some(TypeCode::Array),
            b'(' => Some(TypeCode::StructBegin),
            b')' => Some(TypeCode::StructEnd),
            b'{' => Some(TypeCode::DictBegin),
            b'}' => Some(TypeCode::DictEnd),
            _ => None,
        }
    }

    /// Basic types may be dict keys.
    pub fn is_basic(self) -> bool {
        matches!(
            self,
            TypeCode::Byte
                | TypeCode::Bool
                | TypeCode::Int16
                | TypeCode::UInt16
                | TypeCode::Int32
                | TypeCode::UInt32
                | TypeCode::Int64
                | TypeCode::UInt64
                | TypeCode::Double
                | TypeCode::String
                | TypeCode::ObjectPath
                | TypeCode::Signature
        )
    }
}

/// A validated signature of exactly one complete type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(String);

impl Signature {
    /// Parses and validates a single complete type.
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() > MAX_SIGNATURE_LEN {
            return Err(Error::SignatureTooLong(bytes.len()));
        }
        let end = skip_type(bytes, 0, 0)?;
        if end != bytes.len() {
            return Err(Error::TrailingTypes(s[end..].to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Signature of a basic or variant type code.
    ///
    /// Container codes do not form a complete type on their own; for those
    /// use [`Signature::parse`].
    pub fn of(code: TypeCode) -> Option<Self> {
        (code.is_basic() || code == TypeCode::Variant).then(|| Self((code as u8 as char).to_string()))
    }

    /// Builds `a<elem>`.
    pub fn array_of(elem: &Signature) -> Result<Self> {
        Self::parse(&format!("a{}", elem.0))
    }

    /// Builds `a{<key><value>}`. The key must be basic.
    pub fn dict_of(key: &Signature, value: &Signature) -> Result<Self> {
        Self::parse(&format!("a{{{}{}}}", key.0, value.0))
    }

    /// Builds `(<members>...)`. At least one member is required.
    pub fn struct_of<'a>(members: impl IntoIterator<Item = &'a Signature>) -> Result<Self> {
        let body: String = members.into_iter().map(|m| m.as_str()).collect();
        Self::parse(&format!("({})", body))
    }

    /// Wraps text already known to describe one complete type, such as the
    /// shape of an existing value.
    pub(crate) fn assemble(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The leading type code.
    pub fn code(&self) -> TypeCode {
        // Validated at construction; never empty.
        TypeCode::from_u8(self.0.as_bytes()[0]).unwrap_or(TypeCode::Variant)
    }

    /// Whether this is a basic type (valid as a dict key).
    pub fn is_basic(&self) -> bool {
        self.0.len() == 1 && self.code().is_basic()
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Signature::parse(s)
    }
}

/// Skips one complete type starting at `pos`, returning the position after it.
fn skip_type(sig: &[u8], pos: usize, depth: usize) -> Result<usize> {
    if depth > MAX_NESTING {
        return Err(Error::NestingTooDeep);
    }
    let Some(&b) = sig.get(pos) else {
        return Err(Error::UnexpectedEnd);
    };
    let code = TypeCode::from_u8(b).ok_or(Error::InvalidTypeCode(b))?;

    match code {
        c if c.is_basic() => Ok(pos + 1),
        TypeCode::Variant => Ok(pos + 1),
        TypeCode::Array => {
            if sig.get(pos + 1) == Some(&b'{') {
                skip_dict_entry(sig, pos + 1, depth + 1)
            } else {
                skip_type(sig, pos + 1, depth + 1)
            }
        }
        TypeCode::StructBegin => {
            let mut cursor = pos + 1;
            if sig.get(cursor) == Some(&b')') {
                return Err(Error::EmptyStruct);
            }
            loop {
                match sig.get(cursor) {
                    None => return Err(Error::UnexpectedEnd),
                    Some(b')') => return Ok(cursor + 1),
                    Some(_) => cursor = skip_type(sig, cursor, depth + 1)?,
                }
            }
        }
        TypeCode::DictBegin => Err(Error::StrayDictEntry),
        _ => Err(Error::InvalidTypeCode(b)),
    }
}

/// Skips `{kv}`; `pos` points at the opening brace.
fn skip_dict_entry(sig: &[u8], pos: usize, depth: usize) -> Result<usize> {
    let key = *sig.get(pos + 1).ok_or(Error::UnexpectedEnd)?;
    match TypeCode::from_u8(key) {
        Some(code) if code.is_basic() => {}
        _ => return Err(Error::InvalidDictKey(key)),
    }
    let after_value = skip_type(sig, pos + 2, depth + 1)?;
    match sig.get(after_value) {
        Some(b'}') => Ok(after_value + 1),
        Some(&other) => Err(Error::TrailingTypes((other as char).to_string())),
        None => Err(Error::UnexpectedEnd),
    }
}
