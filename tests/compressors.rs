use ferrous_flow::{
    Construct, DiResult, MessageCompressor, MessageContext, MiddlewareBuilder, MiddlewareError, ResolverCore,
    ServiceCollection,
};
use std::sync::Arc;

/// Reverses the payload; its own inverse.
struct Reverse;

impl Construct for Reverse {
    fn construct(_: &dyn ResolverCore) -> DiResult<Self> {
        Ok(Reverse)
    }
}

impl MessageCompressor for Reverse {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, MiddlewareError> {
        Ok(data.iter().rev().copied().collect())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, MiddlewareError> {
        self.compress(data)
    }
}

#[test]
fn test_producer_compresses_and_consumer_decompresses() {
    let mut services = ServiceCollection::new();
    let mut producer = MiddlewareBuilder::producer(&mut services);
    producer.add_compressor::<Reverse>();
    let producer = producer.build();
    let mut consumer = MiddlewareBuilder::consumer(&mut services);
    consumer.add_compressor::<Reverse>();
    let consumer = consumer.build();

    // Registered once per declaration.
    assert_eq!(services.len(), 2);
    assert!(services.contains::<Reverse>());

    let provider = services.build();
    let scope = provider.create_scope().unwrap();

    let mut outbound = MessageContext::inbound("raw", b"abc".to_vec());
    producer.chain_for(&scope).unwrap().execute(&mut outbound).unwrap();
    assert_eq!(outbound.bytes(), Some(&b"cba"[..]));

    let mut inbound = MessageContext::inbound("raw", outbound.bytes().unwrap().to_vec());
    consumer.chain_for(&scope).unwrap().execute(&mut inbound).unwrap();
    assert_eq!(inbound.bytes(), Some(&b"abc"[..]));
}

#[test]
fn test_compressor_factory_registers_nothing() {
    let mut services = ServiceCollection::new();
    let mut producer = MiddlewareBuilder::producer(&mut services);
    producer.add_compressor_factory(|_| Ok(Arc::new(Reverse)));
    let producer = producer.build();
    assert!(services.is_empty());

    let provider = services.build();
    let chain = producer.materialize(&provider).unwrap();
    let mut ctx = MessageContext::inbound("raw", b"xy".to_vec());
    chain.execute(&mut ctx).unwrap();
    assert_eq!(ctx.bytes(), Some(&b"yx"[..]));
}

#[test]
fn test_compressor_needs_bytes() {
    let mut services = ServiceCollection::new();
    let mut producer = MiddlewareBuilder::producer(&mut services);
    producer.add_compressor_factory(|_| Ok(Arc::new(Reverse)));
    let producer = producer.build();

    let provider = services.build();
    let chain = producer.materialize(&provider).unwrap();
    let mut ctx = MessageContext::outbound("raw", 5u8);
    assert!(matches!(
        chain.execute(&mut ctx),
        Err(MiddlewareError::UnexpectedPayload { expected: "bytes", .. })
    ));
}

#[cfg(all(feature = "json", feature = "gzip"))]
mod pipeline {
    use ferrous_flow::{
        Configurator, GzipMessageCompressor, JsonMessageSerializer, JsonTypes, MessageContext, MiddlewareBuilder,
        ServiceCollection, MESSAGE_TYPE_HEADER,
    };
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Shipment {
        id: u64,
        lines: Vec<String>,
    }

    #[test]
    fn test_json_and_gzip_round_trip() {
        let mut services = ServiceCollection::new();
        services.add_instance(Arc::new(JsonTypes::new().with::<Shipment>()));

        let mut producer = MiddlewareBuilder::producer(&mut services);
        producer
            .add_serializer::<JsonMessageSerializer>()
            .add_compressor::<GzipMessageCompressor>();
        let producer = producer.build();

        let mut consumer = MiddlewareBuilder::consumer(&mut services);
        consumer
            .add_compressor::<GzipMessageCompressor>()
            .add_serializer::<JsonMessageSerializer>();
        let consumer = consumer.build();

        let provider = services.build();
        let scope = provider.create_scope().unwrap();

        let shipment = Shipment {
            id: 12,
            lines: vec!["pallet".to_string(); 40],
        };
        let mut outbound = MessageContext::outbound("shipments", shipment.clone()).with_key("12");
        producer.chain_for(&scope).unwrap().execute(&mut outbound).unwrap();

        let wire = outbound.bytes().unwrap().to_vec();
        assert_eq!(&wire[..2], &[0x1f, 0x8b]);
        assert!(wire.len() < serde_json::to_vec(&shipment).unwrap().len());

        let mut inbound = MessageContext::inbound("shipments", wire).with_key("12");
        for (key, value) in outbound.headers().iter() {
            inbound.headers_mut().add(key, value);
        }
        assert!(inbound.headers().get(MESSAGE_TYPE_HEADER).is_some());

        consumer.chain_for(&scope).unwrap().execute(&mut inbound).unwrap();
        assert_eq!(inbound.message::<Shipment>(), Some(&shipment));
        assert_eq!(inbound.key(), Some(&b"12"[..]));
    }
}
