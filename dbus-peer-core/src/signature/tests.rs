use super::{Signature, SignatureBuf};

#[test]
fn accepts_basic_types() {
    for s in ["y", "b", "n", "q", "i", "u", "x", "t", "d", "s", "o", "g", "v", "h"] {
        assert!(Signature::new(s).is_ok(), "{s} should be valid");
    }
}

#[test]
fn accepts_nested_containers() {
    assert!(Signature::new("a{sv}").is_ok());
    assert!(Signature::new("a(ii)").is_ok());
    assert!(Signature::new("(a{sv}as)").is_ok());
    assert!(Signature::new("aaaai").is_ok());
    assert!(Signature::new("").is_ok());
}

#[test]
fn rejects_unbalanced_containers() {
    assert!(Signature::new("(").is_err());
    assert!(Signature::new(")").is_err());
    assert!(Signature::new("a{sv").is_err());
    assert!(Signature::new("a{sv}}").is_err());
    assert!(Signature::new("()").is_err());
}

#[test]
fn rejects_dict_key_not_basic() {
    assert!(Signature::new("a{(ii)v}").is_err());
}

#[test]
fn rejects_dict_not_in_array() {
    // a dict-entry can only occur as the element type of an array; this is
    // not directly reachable from a top-level parse since `{` only appears
    // after `a`, but nested inside a struct it must still be wrapped in `a`.
    assert!(Signature::new("({sv})").is_err());
}

#[test]
fn rejects_missing_array_element() {
    assert!(Signature::new("a").is_err());
    assert!(Signature::new("aa").is_err());
}

#[test]
fn iterates_top_level_types() {
    let sig = Signature::new("ysa{sv}").unwrap();
    let kinds: Vec<_> = sig.iter().collect();
    assert_eq!(kinds.len(), 3);
}

#[test]
fn signature_buf_round_trips() {
    let buf = SignatureBuf::new("a{sv}".to_owned()).unwrap();
    assert_eq!(buf.as_signature(), Signature::new("a{sv}").unwrap());
    assert_eq!(buf.to_owned().into_string(), "a{sv}");
}

#[test]
fn signature_buf_push() {
    let mut buf = SignatureBuf::empty();
    buf.push_signature(Signature::STRING);
    buf.push_signature(Signature::UINT32);
    assert_eq!(buf.as_str(), "su");
}

#[test]
fn new_const_matches_runtime_validation() {
    assert_eq!(Signature::VARIANT.as_str(), "v");
    assert!(Signature::new("v").is_ok());
}

/// A recursive, depth-bounded description of a single complete type, used to
/// generate strings that are valid by construction rather than throwing
/// random bytes at the validator and hoping enough of them parse.
#[derive(Clone, Debug)]
enum ArbitraryType {
    Basic(u8),
    Array(Box<ArbitraryType>),
    Struct(Vec<ArbitraryType>),
    Dict(u8, Box<ArbitraryType>),
}

const BASIC_CODES: &[u8] = b"ybnqiuxtdsogvh";

fn gen_type(g: &mut quickcheck::Gen, depth: u32) -> ArbitraryType {
    if depth >= 4 {
        return ArbitraryType::Basic(*g.choose(BASIC_CODES).unwrap());
    }

    match *g.choose(&[0u8, 1, 2, 3]).unwrap() {
        0 => ArbitraryType::Basic(*g.choose(BASIC_CODES).unwrap()),
        1 => ArbitraryType::Array(Box::new(gen_type(g, depth + 1))),
        2 => {
            let n = *g.choose(&[1usize, 2, 3]).unwrap();
            ArbitraryType::Struct((0..n).map(|_| gen_type(g, depth + 1)).collect())
        }
        // Dict keys must be a basic type, not an arbitrary one; the `a`
        // wrapping it is rendered by the caller, since a dict-entry is
        // only ever valid as an array's element type.
        _ => ArbitraryType::Dict(*g.choose(BASIC_CODES).unwrap(), Box::new(gen_type(g, depth + 1))),
    }
}

impl ArbitraryType {
    fn write_into(&self, out: &mut String) {
        match self {
            ArbitraryType::Basic(code) => out.push(*code as char),
            ArbitraryType::Array(inner) => {
                out.push('a');
                inner.write_into(out);
            }
            ArbitraryType::Struct(fields) => {
                out.push('(');
                for field in fields {
                    field.write_into(out);
                }
                out.push(')');
            }
            ArbitraryType::Dict(key, value) => {
                out.push_str("a{");
                out.push(*key as char);
                value.write_into(out);
                out.push('}');
            }
        }
    }
}

#[derive(Clone, Debug)]
struct ArbitrarySignature(String);

impl quickcheck::Arbitrary for ArbitrarySignature {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let n = *g.choose(&[0usize, 1, 2, 3, 4]).unwrap();
        let mut out = String::new();
        for _ in 0..n {
            gen_type(g, 0).write_into(&mut out);
        }
        ArbitrarySignature(out)
    }
}

#[quickcheck_macros::quickcheck]
fn signature_round_trips_through_parse_and_render(signature: ArbitrarySignature) -> bool {
    let Ok(parsed) = Signature::new(&signature.0) else {
        return false;
    };

    parsed.as_str() == signature.0
}
