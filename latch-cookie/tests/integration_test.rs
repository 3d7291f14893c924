//! Integration tests for latch-cookie

use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use latch_cookie::*;

fn pair(seed: &str) -> KeyPair {
    KeyPair::new(format!("signing-{}", seed), generate_random_key(32))
}

#[test]
fn test_generated_ids_roundtrip() {
    let codecs = codecs_from_pairs([KeyPair::generate()]).unwrap();

    for _ in 0..32 {
        let id = generate_random_key(32);
        let encoded = encode_multi("session", &id, &codecs).unwrap();
        assert_eq!(decode_multi("session", &encoded, &codecs).unwrap(), id);
    }
}

#[test]
fn test_rotation_accepts_either_order() {
    let k1 = pair("one");
    let k2 = pair("two");

    let encoded = encode_multi("sid", "SESSIONID", &codecs_from_pairs([k2.clone()]).unwrap()).unwrap();

    let k1_k2 = codecs_from_pairs([k1.clone(), k2.clone()]).unwrap();
    assert_eq!(decode_multi("sid", &encoded, &k1_k2).unwrap(), b"SESSIONID");

    let k2_k1 = codecs_from_pairs([k2, k1.clone()]).unwrap();
    assert_eq!(decode_multi("sid", &encoded, &k2_k1).unwrap(), b"SESSIONID");

    let k1_only = codecs_from_pairs([k1]).unwrap();
    assert!(matches!(
        decode_multi("sid", &encoded, &k1_only),
        Err(CookieError::AllCodecsFailed(_))
    ));
}

#[test]
fn test_rotation_encodes_with_newest_key() {
    let new = pair("new");
    let old = pair("old");
    let codecs = codecs_from_pairs([new.clone(), old.clone()]).unwrap();

    let encoded = encode_multi("sid", "ID", &codecs).unwrap();

    assert!(SecureCookie::from_pair(&new).unwrap().decode("sid", &encoded).is_ok());
    assert!(SecureCookie::from_pair(&old).unwrap().decode("sid", &encoded).is_err());
}

#[test]
fn test_request_to_response_flow() {
    let codec = SecureCookie::new(b"flow-signing-key".to_vec(), None).unwrap();
    let options = CookieOptions::default().with_max_age(7200);

    let mut response = HeaderMap::new();
    let value = codec.encode("sid", "ABC").unwrap();
    SessionCookie::new("sid", value, options)
        .append_to(&mut response)
        .unwrap();

    // Browser echoes the name=value pair back.
    let set_cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    let pair = set_cookie.split(';').next().unwrap().to_string();

    let mut request = HeaderMap::new();
    request.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());

    let echoed = find_cookie(&request, "sid").unwrap();
    assert_eq!(codec.decode("sid", &echoed).unwrap(), b"ABC");
}

#[test]
fn test_expired_error_detection() {
    let err = CookieError::AllCodecsFailed(vec![CookieError::MacInvalid, CookieError::Expired]);
    assert!(err.is_expired());
    assert!(!CookieError::MacInvalid.is_expired());
}

#[test]
fn test_error_display() {
    let err = CookieError::AllCodecsFailed(vec![CookieError::MacInvalid, CookieError::MacInvalid]);
    assert_eq!(err.to_string(), "Cookie rejected by all 2 codecs");
}
