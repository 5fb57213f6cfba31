//! Builds a traversal, ships it as a request, then streams the response
//! back through the decoder in small chunks.
//!
//! Run with `RUST_LOG=debug` to watch the frame lifecycle.

use tinkerwire::prelude::*;
use tracing_subscriber::EnvFilter;

const CHUNK_SIZE: usize = 8;

#[tokio::main]
async fn main() -> Result<(), TinkerwireError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut filter = GremlinLang::new();
    filter.add_step("has", vec!["age".into(), Binding::new("min", Predicate::gt(30)).into()])?;

    let mut g = GremlinLang::new();
    g.add_step("V", vec![])?
        .add_step("where", vec![filter.into()])?
        .add_step("values", vec![Value::list(["name", "age"])])?;
    tracing::info!(script = %g.to_gremlin(), "built traversal");

    for choice in [Serializers::GraphBinaryV4, Serializers::GraphSonV4] {
        let serializer = choice.simple_instance();

        let request = RequestMessage::build(g.clone())
            .add_g("g")
            .add_materialize_properties(MaterializeProperties::Tokens)
            .create();
        let wire = serializer.serialize_request(&request)?;
        let echoed = serializer.deserialize_request(&wire)?;
        tracing::info!(
            mime = serializer.mime_type(),
            bytes = wire.len(),
            bindings = echoed.bindings().len(),
            "request round trip"
        );

        let response = ResponseMessage::build()
            .code(StatusCode::OK)
            .status_message("OK")
            .result(vec!["josh".into(), 32.into(), Point::new(4, 2).into()])
            .create();
        let frame = serializer.serialize_response(&response)?;

        let (tx, mut source) = ChannelSource::channel(16);
        tokio::spawn(async move {
            let head = Inbound::Head {
                content_length: frame.len() as u64,
            };
            if tx.send(head).await.is_err() {
                return;
            }
            for piece in frame.chunks(CHUNK_SIZE) {
                if tx.send(Inbound::Chunk(piece.to_vec().into())).await.is_err() {
                    return;
                }
            }
        });

        let mut decoder =
            ResponseStreamDecoder::new(ConnectionId::next(), serializer.clone(), DecoderConfig::default());
        for decoded in read_responses(&mut source, &mut decoder).await? {
            tracing::info!(
                mime = serializer.mime_type(),
                code = %decoded.status().code(),
                items = decoded.result().map_or(0, <[tinkerwire::bytecode::Value]>::len),
                equal = (decoded == response),
                "response decoded"
            );
        }
    }

    Ok(())
}
