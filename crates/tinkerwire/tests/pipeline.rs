//! Request out, response back: every layer through the facade.

use tinkerwire::prelude::*;

fn knows_traversal() -> Result<GremlinLang, TinkerwireError> {
    let mut g = GremlinLang::new();
    g.add_source("withStrategies", vec![TraversalStrategy::new("ReadOnlyStrategy").into()])?;
    g.add_step("V", vec![Binding::new("id", 1i64).into()])?
        .add_step("out", vec![Binding::new("label", "knows").into()])?
        .add_step("values", vec!["name".into()])?;
    Ok(g)
}

#[tokio::test]
async fn test_request_and_chunked_response_round_trip() -> Result<(), TinkerwireError> {
    for choice in [Serializers::GraphBinaryV4, Serializers::GraphSonV4] {
        let serializer = choice.simple_instance();

        let request = RequestMessage::build(knows_traversal()?)
            .add_g("g")
            .add_timeout_millis(1_000)
            .create();
        let wire = serializer.serialize_request(&request)?;
        let received = serializer.deserialize_request(&wire)?;
        assert_eq!(received.bindings().len(), 2);
        assert_eq!(received, request);

        let response = ResponseMessage::build()
            .code(StatusCode::OK)
            .result(vec!["vadas".into(), "josh".into(), Point::new(1, 2).into()])
            .create();
        let frame = serializer.serialize_response(&response)?;

        let mut decoder = ResponseStreamDecoder::new(
            ConnectionId::new(1),
            serializer.clone(),
            DecoderConfig::default().with_max_content_length(frame.len() as u64),
        );
        let (tx, mut source) = ChannelSource::channel(64);
        tx.send(Inbound::Head { content_length: frame.len() as u64 })
            .await
            .unwrap();
        for piece in frame.chunks(5) {
            tx.send(Inbound::Chunk(piece.to_vec().into())).await.unwrap();
        }
        drop(tx);

        let responses = read_responses(&mut source, &mut decoder).await?;
        assert_eq!(responses, vec![response]);
    }
    Ok(())
}

#[test]
fn test_malformed_argument_surfaces_through_facade() {
    let mut g = GremlinLang::new();
    let err: TinkerwireError = g.add_step("", vec![]).unwrap_err().into();
    assert!(matches!(err, TinkerwireError::Bytecode(_)));
}
