//! # Bus naming rules
//!
//! Validation for the four kinds of names a call target is made of:
//! bus names, object paths, interface names and member names.

use crate::Error;
use crate::Result;

/// Maximum length of bus, interface and member names.
pub const MAX_NAME_LEN: usize = 255;

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Validates a bus name.
///
/// Unique names start with `:` and their elements may start with a digit.
/// Well-known names may not. Both have at least two elements separated by `.`,
/// made of `[A-Za-z0-9_-]`.
pub fn validate_bus_name(name: &str) -> Result<()> {
    let invalid = || Error::InvalidBusName(name.to_string());
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(invalid());
    }
    let (unique, body) = match name.strip_prefix(':') {
        Some(rest) => (true, rest),
        None => (false, name),
    };

    let mut elements = 0;
    for element in body.split('.') {
        let bytes = element.as_bytes();
        let Some(first) = bytes.first() else { return Err(invalid()) };
        if !unique && first.is_ascii_digit() {
            return Err(invalid());
        }
        if !bytes.iter().all(|&b| is_name_char(b) || b == b'-') {
            return Err(invalid());
        }
        elements += 1;
    }
    if elements < 2 {
        return Err(invalid());
    }
    Ok(())
}

/// Validates an object path: `/` or `/`-separated non-empty `[A-Za-z0-9_]` elements.
pub fn validate_object_path(path: &str) -> Result<()> {
    let invalid = || Error::InvalidObjectPath(path.to_string());
    let Some(rest) = path.strip_prefix('/') else { return Err(invalid()) };
    if rest.is_empty() {
        return Ok(());
    }
    for element in rest.split('/') {
        if element.is_empty() || !element.bytes().all(is_name_char) {
            return Err(invalid());
        }
    }
    Ok(())
}

/// Validates an interface name: two or more `.`-separated `[A-Za-z0-9_]`
/// elements, none starting with a digit.
pub fn validate_interface_name(name: &str) -> Result<()> {
    let invalid = || Error::InvalidInterfaceName(name.to_string());
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(invalid());
    }
    let mut elements = 0;
    for element in name.split('.') {
        if !is_identifier(element) {
            return Err(invalid());
        }
        elements += 1;
    }
    if elements < 2 {
        return Err(invalid());
    }
    Ok(())
}

/// Validates a member (method or signal) name: one `[A-Za-z0-9_]` element,
/// not starting with a digit.
pub fn validate_member_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LEN || !is_identifier(name) {
        return Err(Error::InvalidMemberName(name.to_string()));
    }
    Ok(())
}

fn is_identifier(s: &str) -> bool {
    match s.as_bytes().first() {
        None => false,
        Some(first) if first.is_ascii_digit() => false,
        Some(_) => s.bytes().all(is_name_char),
    }
}

pub fn is_bus_name(name: &str) -> bool {
    validate_bus_name(name).is_ok()
}

pub fn is_object_path(path: &str) -> bool {
    validate_object_path(path).is_ok()
}

pub fn is_interface_name(name: &str) -> bool {
    validate_interface_name(name).is_ok()
}

pub fn is_member_name(name: &str) -> bool {
    validate_member_name(name).is_ok()
}
