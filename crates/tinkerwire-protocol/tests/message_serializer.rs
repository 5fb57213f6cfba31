//! Round-trip tests run against every serializer.

use std::collections::BTreeMap;
use std::sync::Arc;

use tinkerwire_bytecode::{
    Binding, CustomValue, GremlinLang, Predicate, Token, TokenKind, TraversalStrategy, Value,
};
use tinkerwire_protocol::{
    CustomTypeRegistry, MAX_NESTING_DEPTH, MaterializeProperties, MessageSerializer, Point,
    ProtocolError, RequestMessage, ResponseMessage, Serializers, StatusCode,
};

// =========================================================================
// Helpers
// =========================================================================

const ALL: [Serializers; 2] = [Serializers::GraphBinaryV4, Serializers::GraphSonV4];

fn serializers() -> Vec<Arc<dyn MessageSerializer>> {
    ALL.iter().map(|s| s.simple_instance()).collect()
}

fn request_round_trip(serializer: &dyn MessageSerializer, request: &RequestMessage) -> RequestMessage {
    let bytes = serializer.serialize_request(request).unwrap();
    serializer.deserialize_request(&bytes).unwrap()
}

fn response_round_trip(serializer: &dyn MessageSerializer, response: &ResponseMessage) -> ResponseMessage {
    let bytes = serializer.serialize_response(response).unwrap();
    serializer.deserialize_response(&bytes).unwrap()
}

/// `g.V().in(a).choose(__.out().count()).option(two, __.values('name'))
///   .where(__.out(b).has('age', c))`
fn traversal_with_bindings() -> GremlinLang {
    let mut count = GremlinLang::new();
    count.add_step("out", vec![]).unwrap();
    count.add_step("count", vec![]).unwrap();

    let mut name = GremlinLang::new();
    name.add_step("values", vec!["name".into()]).unwrap();

    let mut filter = GremlinLang::new();
    filter.add_step("out", vec![Binding::new("b", "knows").into()]).unwrap();
    filter
        .add_step("has", vec!["age".into(), Binding::new("c", Predicate::gt(32)).into()])
        .unwrap();

    let mut g = GremlinLang::new();
    g.add_source("withStrategies", vec![TraversalStrategy::new("ReadOnlyStrategy").into()])
        .unwrap();
    g.add_step("V", vec![]).unwrap();
    g.add_step("in", vec![Binding::new("a", "created").into()]).unwrap();
    g.add_step("choose", vec![count.into()]).unwrap();
    g.add_step("option", vec![Binding::new("two", 2).into(), name.into()])
        .unwrap();
    g.add_step("where", vec![filter.into()]).unwrap();
    g
}

// =========================================================================
// Requests
// =========================================================================

#[test]
fn test_request_with_every_field_round_trips() {
    for serializer in serializers() {
        let request = RequestMessage::build("gremlin")
            .add_materialize_properties(MaterializeProperties::Tokens)
            .add_timeout_millis(500)
            .add_g("g1")
            .add_language("some-lang")
            .add_binding("k", "v")
            .create();

        let decoded = request_round_trip(serializer.as_ref(), &request);
        assert_eq!(decoded.gremlin(), Some("gremlin"), "{}", serializer.mime_type());
        assert_eq!(decoded.materialize_properties(), Some(MaterializeProperties::Tokens));
        assert_eq!(decoded.timeout_millis(), Some(500));
        assert_eq!(decoded.g(), Some("g1"));
        assert_eq!(decoded.language(), Some("some-lang"));
        assert_eq!(decoded.binding("k"), Some(&Value::from("v")));
        assert_eq!(decoded, request);
    }
}

#[test]
fn test_request_with_only_a_script_round_trips() {
    for serializer in serializers() {
        let request = RequestMessage::build("query").create();
        let decoded = request_round_trip(serializer.as_ref(), &request);
        assert_eq!(decoded.gremlin(), Some("query"));
        assert!(decoded.g().is_none());
        assert!(decoded.language().is_none());
        assert!(decoded.timeout_millis().is_none());
        assert!(decoded.materialize_properties().is_none());
        assert!(decoded.bindings().is_empty());
    }
}

#[test]
fn test_request_with_many_bindings_round_trips() {
    for serializer in serializers() {
        let request = RequestMessage::build("g.V(x).has('age', gt(y)).limit(z)")
            .add_binding("x", 1i64)
            .add_binding("y", 32.5f64)
            .add_binding("z", 10)
            .add_binding("names", Value::list(["a", "b"]))
            .add_binding("none", Value::Null)
            .create();
        let decoded = request_round_trip(serializer.as_ref(), &request);
        assert_eq!(decoded.bindings().len(), 5);
        assert_eq!(decoded.binding("x"), Some(&Value::Long(1)));
        assert_eq!(decoded.binding("y"), Some(&Value::Double(32.5)));
        assert_eq!(decoded.binding("none"), Some(&Value::Null));
        assert_eq!(decoded, request);
    }
}

#[test]
fn test_bytecode_request_round_trips_with_its_bindings() {
    for serializer in serializers() {
        let g = traversal_with_bindings();
        let request = RequestMessage::build(g.clone()).add_g("g").create();
        assert_eq!(request.bindings().len(), 4);

        let decoded = request_round_trip(serializer.as_ref(), &request);
        assert_eq!(decoded.bytecode(), Some(&g), "{}", serializer.mime_type());
        assert_eq!(decoded.binding("c"), Some(&Value::from(Predicate::gt(32))));
        assert_eq!(decoded, request);
    }
}

#[test]
fn test_explicit_binding_overrides_collected_one() {
    for serializer in serializers() {
        let request = RequestMessage::build(traversal_with_bindings())
            .add_binding("a", "knows")
            .create();
        let decoded = request_round_trip(serializer.as_ref(), &request);
        assert_eq!(decoded.binding("a"), Some(&Value::from("knows")));
    }
}

// =========================================================================
// Responses
// =========================================================================

#[test]
fn test_response_with_result_round_trips() {
    for serializer in serializers() {
        let response = ResponseMessage::build()
            .code(200)
            .status_message("OK")
            .result(vec![123.3f64.into()])
            .create();
        let decoded = response_round_trip(serializer.as_ref(), &response);
        assert_eq!(decoded.status().code(), StatusCode::OK);
        assert_eq!(decoded.status().message(), Some("OK"));
        assert_eq!(decoded.result(), Some(&[Value::Double(123.3)][..]));
    }
}

#[test]
fn test_response_without_result_round_trips() {
    for serializer in serializers() {
        let response = ResponseMessage::build()
            .code(403)
            .status_message("Forbidden")
            .exception("AuthorizationException")
            .create();
        let decoded = response_round_trip(serializer.as_ref(), &response);
        assert_eq!(decoded.status().code(), StatusCode::FORBIDDEN);
        assert_eq!(decoded.status().message(), Some("Forbidden"));
        assert_eq!(decoded.status().exception(), Some("AuthorizationException"));
        assert!(decoded.result().is_none());
        assert!(decoded.status().code().is_error());
    }
}

#[test]
fn test_empty_result_is_not_absent_result() {
    for serializer in serializers() {
        let empty = ResponseMessage::build().code(204).result(vec![]).create();
        let absent = ResponseMessage::build().code(204).create();

        let decoded_empty = response_round_trip(serializer.as_ref(), &empty);
        let decoded_absent = response_round_trip(serializer.as_ref(), &absent);
        assert_eq!(decoded_empty.result(), Some(&[][..]));
        assert_eq!(decoded_absent.result(), None);
        assert_ne!(decoded_empty, decoded_absent);
    }
}

#[test]
fn test_response_with_mixed_result_and_attributes_round_trips() {
    for serializer in serializers() {
        let mut attributes = BTreeMap::new();
        attributes.insert("host".to_owned(), Value::from("10.0.0.1"));
        attributes.insert("partial".to_owned(), Value::Boolean(false));

        let response = ResponseMessage::build()
            .code(206)
            .status_attributes(attributes)
            .result(vec![
                Value::Int(1),
                Value::Long(2),
                Value::Short(3),
                Value::Byte(4),
                Value::Float(0.5),
                Value::Double(f64::INFINITY),
                Value::from("five"),
                Value::Binary(vec![0xCA, 0xFE]),
                Value::set([Value::Int(1)]),
                Value::map([("k", Value::list([1, 2]))]),
                Value::from(Token::new(TokenKind::Direction, "OUT")),
                Value::from(Point::new(3, 4)),
                Value::Null,
            ])
            .create();
        let decoded = response_round_trip(serializer.as_ref(), &response);
        assert!(decoded.status().code().is_partial());
        assert_eq!(decoded, response, "{}", serializer.mime_type());
    }
}

// =========================================================================
// Custom types
// =========================================================================

#[test]
fn test_point_converts_back_after_round_trip() {
    for serializer in serializers() {
        let response = ResponseMessage::build()
            .result(vec![Point::new(-1, 9).into()])
            .create();
        let decoded = response_round_trip(serializer.as_ref(), &response);
        let items = decoded.result().unwrap();
        assert_eq!(Point::try_from(&items[0]).unwrap(), Point::new(-1, 9));
    }
}

#[test]
fn test_unregistered_custom_type_fails_to_serialize() {
    for serializer in serializers() {
        let response = ResponseMessage::build()
            .result(vec![CustomValue::new("acme.Widget", vec![Value::Int(1)]).into()])
            .create();
        let err = serializer.serialize_response(&response).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCustomType(ref name) if name == "acme.Widget"));
    }
}

#[test]
fn test_custom_type_missing_on_the_reading_side() {
    for choice in ALL {
        let writer = choice.simple_instance();
        let reader = choice.with_registry(Arc::new(CustomTypeRegistry::new()));
        let response = ResponseMessage::build().result(vec![Point::new(1, 2).into()]).create();

        let bytes = writer.serialize_response(&response).unwrap();
        let err = reader.deserialize_response(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCustomType(_)));
    }
}

// =========================================================================
// Nesting depth
// =========================================================================

fn nested_lists(levels: usize) -> Value {
    (0..levels).fold(Value::Int(1), |inner, _| Value::List(vec![inner]))
}

/// A traversal `levels` sub-traversals deep, counting itself.
fn nested_traversal(levels: usize) -> GremlinLang {
    let mut g = GremlinLang::new();
    g.add_step("out", vec![Value::Binary(vec![1, 2])]).unwrap();
    for _ in 1..levels {
        let mut outer = GremlinLang::new();
        outer.add_step("where", vec![g.into()]).unwrap();
        g = outer;
    }
    g
}

#[test]
fn test_result_nested_to_the_limit_round_trips() {
    for serializer in serializers() {
        // The result list itself is the first level.
        let response = ResponseMessage::build()
            .result(vec![nested_lists(MAX_NESTING_DEPTH - 1)])
            .create();
        let decoded = response_round_trip(serializer.as_ref(), &response);
        assert_eq!(decoded, response, "{}", serializer.mime_type());
    }
}

#[test]
fn test_result_nested_past_the_limit_fails_to_serialize() {
    for serializer in serializers() {
        let response = ResponseMessage::build()
            .result(vec![nested_lists(MAX_NESTING_DEPTH)])
            .create();
        let err = serializer.serialize_response(&response).unwrap_err();
        assert!(
            matches!(err, ProtocolError::NestingTooDeep { limit: MAX_NESTING_DEPTH, .. }),
            "{}: {err}",
            serializer.mime_type()
        );
    }
}

#[test]
fn test_traversal_nested_to_the_limit_round_trips() {
    for serializer in serializers() {
        let request = RequestMessage::build(nested_traversal(MAX_NESTING_DEPTH))
            .add_binding("deep", nested_lists(MAX_NESTING_DEPTH - 1))
            .create();
        let decoded = request_round_trip(serializer.as_ref(), &request);
        assert_eq!(decoded, request, "{}", serializer.mime_type());

        let too_deep = RequestMessage::build(nested_traversal(MAX_NESTING_DEPTH + 1)).create();
        assert!(matches!(
            serializer.serialize_request(&too_deep),
            Err(ProtocolError::NestingTooDeep { context: "bytecode", .. })
        ));
    }
}

#[test]
fn test_deeply_nested_binary_frame_is_rejected() {
    let mut frame = vec![0x81];
    for _ in 0..300_000 {
        frame.extend_from_slice(&[0x09, 0x00, 0, 0, 0, 1]);
    }
    frame.extend_from_slice(&[0x01, 0x00, 0, 0, 0, 7]);
    // Status tail: code 200, no message, no exception, no attributes.
    frame.extend_from_slice(&[0x01, 0x00, 0, 0, 0, 200, 0x03, 0x01, 0x03, 0x01, 0x0A, 0x01]);

    let serializer = Serializers::GraphBinaryV4.simple_instance();
    let err = serializer.deserialize_response(&frame).unwrap_err();
    assert!(matches!(err, ProtocolError::NestingTooDeep { context: "list", .. }));
}

#[test]
fn test_deeply_nested_json_is_an_error_not_a_crash() {
    let serializer = Serializers::GraphSonV4.simple_instance();
    let depth = 100_000;
    let body = format!(
        r#"{{"result": {}1{}, "status": {{"code": 200}}}}"#,
        "[".repeat(depth),
        "]".repeat(depth)
    );
    assert!(serializer.deserialize_response(body.as_bytes()).is_err());
}

// =========================================================================
// Malformed input
// =========================================================================

#[test]
fn test_truncated_input_fails_for_every_prefix() {
    for serializer in serializers() {
        let response = ResponseMessage::build()
            .status_message("OK")
            .result(vec![Value::from("abc"), Value::Long(7)])
            .create();
        let bytes = serializer.serialize_response(&response).unwrap();
        for len in 0..bytes.len() {
            assert!(
                serializer.deserialize_response(&bytes[..len]).is_err(),
                "{} accepted a {len}-byte prefix",
                serializer.mime_type()
            );
        }
    }
}

#[test]
fn test_binary_trailing_bytes_are_rejected() {
    let serializer = Serializers::GraphBinaryV4.simple_instance();
    let request = RequestMessage::build("query").create();
    let mut bytes = serializer.serialize_request(&request).unwrap().to_vec();
    bytes.push(0x00);
    let err = serializer.deserialize_request(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::TrailingBytes(1)));
}

#[test]
fn test_binary_wrong_version_is_rejected() {
    let serializer = Serializers::GraphBinaryV4.simple_instance();
    let response = ResponseMessage::build().create();
    let mut bytes = serializer.serialize_response(&response).unwrap().to_vec();
    bytes[0] = 0x01;
    let err = serializer.deserialize_response(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::UnsupportedVersion(0x01)));
}

#[test]
fn test_graphson_rejects_non_json() {
    let serializer = Serializers::GraphSonV4.simple_instance();
    let err = serializer.deserialize_response(b"\x81\x09\x01").unwrap_err();
    assert!(matches!(err, ProtocolError::Json(_)));
}
