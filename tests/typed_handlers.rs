use ferrous_flow::{
    BoxError, Construct, DiResult, Lifetime, MessageContext, MessageHandler, MiddlewareBuilder, MiddlewareError,
    Resolver, ResolverCore, ServiceCollection,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

struct OrderPlaced {
    id: u32,
}

struct OrderCancelled {
    id: u32,
}

/// Shared record of handled messages.
#[derive(Default)]
struct Journal {
    entries: Mutex<Vec<String>>,
}

struct Placements {
    journal: Arc<Journal>,
}

impl Construct for Placements {
    fn construct(resolver: &dyn ResolverCore) -> DiResult<Self> {
        Ok(Placements { journal: resolver.resolve::<Journal>()? })
    }
}

impl MessageHandler<OrderPlaced> for Placements {
    fn handle(&self, ctx: &MessageContext, message: &OrderPlaced) -> Result<(), BoxError> {
        self.journal
            .entries
            .lock()
            .unwrap()
            .push(format!("{}:placed:{}", ctx.topic(), message.id));
        Ok(())
    }
}

struct Audit {
    journal: Arc<Journal>,
}

impl Construct for Audit {
    fn construct(resolver: &dyn ResolverCore) -> DiResult<Self> {
        Ok(Audit { journal: resolver.resolve::<Journal>()? })
    }
}

impl MessageHandler<OrderPlaced> for Audit {
    fn handle(&self, _: &MessageContext, message: &OrderPlaced) -> Result<(), BoxError> {
        self.journal.entries.lock().unwrap().push(format!("audit:placed:{}", message.id));
        Ok(())
    }
}

impl MessageHandler<OrderCancelled> for Audit {
    fn handle(&self, _: &MessageContext, message: &OrderCancelled) -> Result<(), BoxError> {
        self.journal.entries.lock().unwrap().push(format!("audit:cancelled:{}", message.id));
        Ok(())
    }
}

struct Rejecting;

impl Construct for Rejecting {
    fn construct(_: &dyn ResolverCore) -> DiResult<Self> {
        Ok(Rejecting)
    }
}

impl MessageHandler<OrderPlaced> for Rejecting {
    fn handle(&self, _: &MessageContext, _: &OrderPlaced) -> Result<(), BoxError> {
        Err("out of stock".into())
    }
}

static CREATED: AtomicU32 = AtomicU32::new(0);

struct Counted;

impl Construct for Counted {
    fn construct(_: &dyn ResolverCore) -> DiResult<Self> {
        CREATED.fetch_add(1, Ordering::SeqCst);
        Ok(Counted)
    }
}

impl MessageHandler<OrderCancelled> for Counted {
    fn handle(&self, _: &MessageContext, _: &OrderCancelled) -> Result<(), BoxError> {
        Ok(())
    }
}

fn journal_services() -> (ServiceCollection, Arc<Journal>) {
    use ferrous_flow::Configurator;

    let journal = Arc::new(Journal::default());
    let mut services = ServiceCollection::new();
    services.add_instance(journal.clone());
    (services, journal)
}

#[test]
fn test_handlers_receive_messages_of_their_type() {
    let (mut services, journal) = journal_services();
    let mut consumer = MiddlewareBuilder::consumer(&mut services);
    consumer.add_typed_handlers(|handlers| {
        handlers
            .add_handler::<Placements, OrderPlaced>()
            .add_handler::<Audit, OrderPlaced>()
            .add_handler::<Audit, OrderCancelled>()
    });
    let configuration = consumer.build();

    let provider = services.build();
    let scope = provider.create_scope().unwrap();
    let chain = configuration.chain_for(&scope).unwrap();

    chain.execute(&mut MessageContext::outbound("orders", OrderPlaced { id: 1 })).unwrap();
    chain.execute(&mut MessageContext::outbound("orders", OrderCancelled { id: 2 })).unwrap();
    // No handler for this type: ignored.
    chain.execute(&mut MessageContext::outbound("orders", 3u64)).unwrap();

    assert_eq!(
        *journal.entries.lock().unwrap(),
        vec!["orders:placed:1", "audit:placed:1", "audit:cancelled:2"]
    );
}

#[test]
fn test_handlers_are_registered_with_the_chosen_lifetime() {
    let (mut services, _) = journal_services();
    let mut consumer = MiddlewareBuilder::consumer(&mut services);
    consumer.add_typed_handlers(|handlers| {
        handlers
            .add_handler::<Placements, OrderPlaced>()
            .with_handler_lifetime(Lifetime::Scoped)
    });
    let _ = consumer.build();

    let placements = services
        .descriptors()
        .iter()
        .find(|d| d.type_name() == std::any::type_name::<Placements>())
        .unwrap();
    assert_eq!(placements.lifetime(), Lifetime::Scoped);
}

#[test]
fn test_default_handler_lifetime_is_singleton() {
    let mut services = ServiceCollection::new();
    let mut consumer = MiddlewareBuilder::consumer(&mut services);
    consumer.add_typed_handlers(|handlers| handlers.add_handler::<Counted, OrderCancelled>());
    let configuration = consumer.build();
    assert_eq!(services.descriptors()[0].lifetime(), Lifetime::Singleton);

    let provider = services.build();
    let before = CREATED.load(Ordering::SeqCst);
    for _ in 0..3 {
        let scope = provider.create_scope().unwrap();
        configuration.chain_for(&scope).unwrap();
    }
    assert_eq!(CREATED.load(Ordering::SeqCst) - before, 1);
}

#[test]
fn test_handler_failure_names_the_handler() {
    let mut services = ServiceCollection::new();
    let mut consumer = MiddlewareBuilder::consumer(&mut services);
    consumer.add_typed_handlers(|handlers| handlers.add_handler::<Rejecting, OrderPlaced>());
    let configuration = consumer.build();

    let provider = services.build();
    let scope = provider.create_scope().unwrap();
    let result = configuration
        .chain_for(&scope)
        .unwrap()
        .execute(&mut MessageContext::outbound("orders", OrderPlaced { id: 9 }));

    match result {
        Err(MiddlewareError::Handler { handler, source }) => {
            assert!(handler.ends_with("Rejecting"));
            assert_eq!(source.to_string(), "out of stock");
        }
        _ => panic!("expected a handler error"),
    }
}

#[test]
fn test_handler_step_needs_an_object() {
    let mut services = ServiceCollection::new();
    let mut consumer = MiddlewareBuilder::consumer(&mut services);
    consumer.add_typed_handlers(|handlers| handlers.add_handler::<Rejecting, OrderPlaced>());
    let configuration = consumer.build();

    let provider = services.build();
    let chain = configuration.materialize(&provider).unwrap();
    assert!(matches!(
        chain.execute(&mut MessageContext::inbound("orders", b"raw".to_vec())),
        Err(MiddlewareError::UnexpectedPayload { expected: "object", .. })
    ));
}

#[test]
fn test_missing_handler_dependency_fails_materialization() {
    let mut services = ServiceCollection::new();
    let mut consumer = MiddlewareBuilder::consumer(&mut services);
    consumer.add_typed_handlers(|handlers| handlers.add_handler::<Placements, OrderPlaced>());
    let configuration = consumer.build();

    let provider = services.build();
    let scope = provider.create_scope().unwrap();
    assert!(matches!(
        configuration.chain_for(&scope),
        Err(ferrous_flow::DiError::NotFound(_))
    ));
}
