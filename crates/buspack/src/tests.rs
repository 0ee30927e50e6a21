use crate::*;
use crate::names::*;

// ============================================================================
//  SIGNATURE TESTS
// ============================================================================

#[test]
fn test_signature_basic_types() -> Result<()> {
    for sig in ["y", "b", "n", "q", "i", "u", "x", "t", "d", "s", "o", "g", "v"] {
        let parsed = Signature::parse(sig)?;
        assert_eq!(parsed.as_str(), sig);
    }
    Ok(())
}

#[test]
fn test_signature_containers() -> Result<()> {
    for sig in ["as", "ao", "a{ss}", "a{sv}", "(si)", "a(sib)", "aas", "a{sa{sv}}", "((i)(s))"] {
        Signature::parse(sig)?;
    }
    assert_eq!(Signature::parse("a{sv}")?.code(), TypeCode::Array);
    assert_eq!(Signature::parse("(ii)")?.code(), TypeCode::StructBegin);
    Ok(())
}

#[test]
fn test_signature_rejects_malformed() {
    assert_eq!(Signature::parse(""), Err(Error::UnexpectedEnd));
    assert_eq!(Signature::parse("a"), Err(Error::UnexpectedEnd));
    assert_eq!(Signature::parse("(si"), Err(Error::UnexpectedEnd));
    assert_eq!(Signature::parse("()"), Err(Error::EmptyStruct));
    assert_eq!(Signature::parse("z"), Err(Error::InvalidTypeCode(b'z')));
    assert_eq!(Signature::parse("{ss}"), Err(Error::StrayDictEntry));
    assert_eq!(Signature::parse("a{vs}"), Err(Error::InvalidDictKey(b'v')));
    assert_eq!(Signature::parse("a{sss}"), Err(Error::TrailingTypes("s".into())));
    assert_eq!(Signature::parse("ss"), Err(Error::TrailingTypes("s".into())));
}

#[test]
fn test_signature_limits() {
    let deep = format!("{}i", "a".repeat(MAX_NESTING + 2));
    assert_eq!(Signature::parse(&deep), Err(Error::NestingTooDeep));

    let long = format!("({})", "i".repeat(MAX_SIGNATURE_LEN));
    assert_eq!(Signature::parse(&long), Err(Error::SignatureTooLong(MAX_SIGNATURE_LEN + 2)));
}

#[test]
fn test_signature_builders_validate() -> Result<()> {
    let s = Signature::parse("s")?;
    let v = Signature::parse("v")?;
    assert_eq!(Signature::struct_of([]), Err(Error::EmptyStruct));
    assert_eq!(Signature::dict_of(&v, &s), Err(Error::InvalidDictKey(b'v')));

    let mut deep = s.clone();
    for _ in 0..MAX_NESTING {
        deep = Signature::array_of(&deep)?;
    }
    assert_eq!(Signature::array_of(&deep), Err(Error::NestingTooDeep));
    Ok(())
}

#[test]
fn test_signature_builders() -> Result<()> {
    let s = Signature::parse("s")?;
    let v = Signature::parse("v")?;
    assert_eq!(Signature::array_of(&s)?.as_str(), "as");
    assert_eq!(Signature::dict_of(&s, &v)?.as_str(), "a{sv}");
    assert_eq!(Signature::struct_of([&s, &v])?.as_str(), "(sv)");
    assert_eq!(Signature::of(TypeCode::UInt64), Some(Signature::parse("t")?));
    assert_eq!(Signature::of(TypeCode::Array), None);
    Ok(())
}

// ============================================================================
//  VALUE TESTS
// ============================================================================

#[test]
fn test_value_signatures() -> Result<()> {
    assert_eq!(Value::from(1i32).signature().as_str(), "i");
    assert_eq!(Value::from(1u64).signature().as_str(), "t");
    assert_eq!(Value::from("x").signature().as_str(), "s");
    assert_eq!(Value::variant(Value::from(true)).signature().as_str(), "v");
    assert_eq!(Value::Struct(vec![Value::from("a"), Value::from(2i16)]).signature().as_str(), "(sn)");

    let empty = Array::new(Signature::parse("o")?);
    assert_eq!(Value::from(empty).signature().as_str(), "ao");

    let dict = Dict::new(Signature::parse("s")?, Signature::parse("v")?)?;
    assert_eq!(Value::from(dict).signature().as_str(), "a{sv}");
    Ok(())
}

#[test]
fn test_array_enforces_element_type() -> Result<()> {
    let mut array = Array::new(Signature::parse("s")?);
    array.push(Value::from("ok"))?;

    let err = array.push(Value::from(7u32)).unwrap_err();
    assert_eq!(err, Error::TypeMismatch { expected: "s".into(), found: "u".into() });
    assert_eq!(array.len(), 1);
    Ok(())
}

#[test]
fn test_dict_enforces_key_and_value_types() -> Result<()> {
    assert!(Dict::new(Signature::parse("as")?, Signature::parse("s")?).is_err());

    let mut dict = Dict::new(Signature::parse("s")?, Signature::parse("s")?)?;
    dict.insert(Value::from("k"), Value::from("v"))?;
    assert!(dict.insert(Value::from("k"), Value::from(1i32)).is_err());
    assert_eq!(dict.len(), 1);
    Ok(())
}

#[test]
fn test_children_of_containers() -> Result<()> {
    let tuple = Value::Struct(vec![Value::from("a"), Value::from(1i32)]);
    assert_eq!(tuple.children().map(|c| c.len()), Some(2));
    assert!(tuple.is_container());

    let mut dict = Dict::new(Signature::parse("s")?, Signature::parse("i")?)?;
    dict.insert(Value::from("k"), Value::from(3i32))?;
    let entries = Value::from(dict).children().unwrap();
    assert_eq!(entries, vec![Value::Struct(vec![Value::from("k"), Value::from(3i32)])]);

    assert!(!Value::from(1u8).is_container());
    assert_eq!(Value::from(1u8).children(), None);
    Ok(())
}

#[test]
fn test_object_path_is_validated() {
    assert!(ObjectPath::new("/org/freedesktop/resolve1").is_ok());
    assert!(ObjectPath::new("/").is_ok());
    assert_eq!(
        ObjectPath::new("org/x"),
        Err(Error::InvalidObjectPath("org/x".into()))
    );
}

// ============================================================================
//  PRINT TESTS
// ============================================================================

#[test]
fn test_print_scalars() -> Result<()> {
    assert_eq!(Value::from("hi").to_string(), "'hi'");
    assert_eq!(Value::from("it's").to_string(), "'it\\'s'");
    assert_eq!(Value::from(-5i32).to_string(), "-5");
    assert_eq!(Value::from(10u8).to_string(), "0x0a");
    assert_eq!(Value::from(true).to_string(), "true");
    assert_eq!(Value::from(1.5f64).to_string(), "1.5");
    assert_eq!(Value::from(ObjectPath::new("/a/b")?).to_string(), "'/a/b'");
    assert_eq!(Value::variant(Value::from(3u32)).to_string(), "<3>");
    Ok(())
}

#[test]
fn test_print_doubles() {
    let printed = |v: f64| Value::from(v).to_string();
    assert_eq!(printed(1.0), "1.0");
    assert_eq!(printed(-0.0), "-0.0");
    assert_eq!(printed(12345.0), "12345.0");
    assert_eq!(printed(0.1), "0.10000000000000001");
    assert_eq!(printed(1e20), "1e+20");
    assert_eq!(printed(2.5e-7), "2.4999999999999999e-07");
    assert_eq!(printed(f64::MAX), "1.7976931348623157e+308");
    assert_eq!(printed(f64::NAN), "nan");
    assert_eq!(printed(f64::NEG_INFINITY), "-inf");
}

#[test]
fn test_print_containers() -> Result<()> {
    let strings = Array::from_values(
        Signature::parse("s")?,
        vec![Value::from("a"), Value::from("b")],
    )?;
    assert_eq!(Value::from(strings).to_string(), "['a', 'b']");
    assert_eq!(Value::from(Array::new(Signature::parse("s")?)).to_string(), "@as []");

    let mut dict = Dict::new(Signature::parse("s")?, Signature::parse("v")?)?;
    dict.insert(Value::from("k"), Value::variant(Value::from(1i32)))?;
    assert_eq!(Value::from(dict).to_string(), "{'k': <1>}");

    let single = Value::Struct(vec![Value::from("only")]);
    assert_eq!(print::print(&single), "('only',)");
    let pair = Value::Struct(vec![Value::from("a"), Value::from(2i32)]);
    assert_eq!(pair.to_string(), "('a', 2)");
    Ok(())
}

// ============================================================================
//  NAME TESTS
// ============================================================================

#[test]
fn test_bus_names() {
    assert!(is_bus_name("org.freedesktop.resolve1"));
    assert!(is_bus_name("com.lgi.rdk.utils.networkconfig1.restricted"));
    assert!(is_bus_name(":1.42"));
    assert!(is_bus_name("org.with-dash.x"));
    assert!(!is_bus_name("single"));
    assert!(!is_bus_name("org..double"));
    assert!(!is_bus_name("org.1digit"));
    assert!(!is_bus_name(""));
    assert!(!is_bus_name(&format!("a.{}", "b".repeat(MAX_NAME_LEN))));
}

#[test]
fn test_object_paths() {
    assert!(is_object_path("/"));
    assert!(is_object_path("/org/freedesktop/resolve1"));
    assert!(!is_object_path(""));
    assert!(!is_object_path("/trailing/"));
    assert!(!is_object_path("//double"));
    assert!(!is_object_path("/has-dash"));
}

#[test]
fn test_interface_and_member_names() {
    assert!(is_interface_name("org.freedesktop.resolve1.Manager"));
    assert!(!is_interface_name("Manager"));
    assert!(!is_interface_name("org.9lives"));
    assert!(!is_interface_name("org.with-dash"));

    assert!(is_member_name("GetResourceIds"));
    assert!(is_member_name("_private"));
    assert!(!is_member_name(""));
    assert!(!is_member_name("Get.Ids"));
    assert!(!is_member_name("1st"));
}
