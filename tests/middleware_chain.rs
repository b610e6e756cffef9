use ferrous_flow::{
    Construct, DiError, DiResult, Lifetime, MessageContext, Middleware, MiddlewareBuilder, MiddlewareError,
    Resolver, ResolverCore, ServiceCollection,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Appends its label to the `trail` header.
struct Step {
    label: String,
}

impl Middleware for Step {
    fn invoke(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
        let mut trail = ctx.headers().get_str("trail").unwrap_or_default().to_string();
        trail.push_str(&self.label);
        ctx.headers_mut().set("trail", trail);
        Ok(())
    }
}

fn step(label: impl Into<String>) -> Arc<dyn Middleware> {
    Arc::new(Step { label: label.into() })
}

struct Failing;

impl Middleware for Failing {
    fn invoke(&self, _: &mut MessageContext) -> Result<(), MiddlewareError> {
        Err(MiddlewareError::MissingTypeHeader("X-Required"))
    }
}

proptest! {
    #[test]
    fn consumer_steps_run_in_declaration_order(count in 0usize..8) {
        let mut services = ServiceCollection::new();
        let mut builder = MiddlewareBuilder::consumer(&mut services);
        for i in 0..count {
            builder.add(move |_| Ok(step(i.to_string())));
        }
        let configuration = builder.build();
        prop_assert_eq!(configuration.len(), count);

        let provider = services.build();
        let scope = provider.create_scope().unwrap();
        let chain = configuration.chain_for(&scope).unwrap();
        prop_assert_eq!(chain.len(), count);

        let mut ctx = MessageContext::inbound("orders", b"{}".to_vec());
        chain.execute(&mut ctx).unwrap();

        let expected: String = (0..count).map(|i| i.to_string()).collect();
        prop_assert_eq!(ctx.headers().get_str("trail").unwrap_or_default(), expected.as_str());
    }
}

proptest! {
    #[test]
    fn producer_steps_run_in_declaration_order(labels in proptest::collection::vec("[a-z]", 0..6)) {
        let mut services = ServiceCollection::new();
        let mut builder = MiddlewareBuilder::producer(&mut services);
        for label in labels.clone() {
            builder.add(move |_| Ok(step(label.clone())));
        }
        let configuration = builder.build();

        let provider = services.build();
        let chain = configuration.materialize(&provider).unwrap();

        let mut ctx = MessageContext::outbound("orders", ());
        chain.execute(&mut ctx).unwrap();
        prop_assert_eq!(ctx.headers().get_str("trail").unwrap_or_default(), labels.concat());
    }
}

#[test]
fn test_each_factory_runs_once_per_scope() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut services = ServiceCollection::new();
    let mut builder = MiddlewareBuilder::consumer(&mut services);
    for label in ["a", "b"] {
        let c = calls.clone();
        builder.add(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(step(label))
        });
    }
    let configuration = builder.build();

    let provider = services.build();
    let first_scope = provider.create_scope().unwrap();
    let first = configuration.chain_for(&first_scope).unwrap();
    let again = configuration.chain_for(&first_scope).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // A clone of the configuration shares the per-scope cache.
    let cloned = configuration.clone().chain_for(&first_scope).unwrap();
    assert!(Arc::ptr_eq(&first, &cloned));

    let second_scope = provider.create_scope().unwrap();
    let second = configuration.chain_for(&second_scope).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_materialize_invokes_factories_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut services = ServiceCollection::new();
    let mut builder = MiddlewareBuilder::producer(&mut services);
    for label in ["serializer", "compressor", "audit"] {
        let o = order.clone();
        builder.add(move |_| {
            o.lock().unwrap().push(label);
            Ok(step(label))
        });
    }
    let configuration = builder.build();

    let provider = services.build();
    let scope = provider.create_scope().unwrap();
    configuration.materialize(scope.resolver()).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["serializer", "compressor", "audit"]);
}

#[test]
fn test_unresolved_dependency_aborts_without_partial_chain() {
    struct Missing;

    let built = Arc::new(AtomicU32::new(0));
    let mut services = ServiceCollection::new();
    let mut builder = MiddlewareBuilder::consumer(&mut services);
    let b = built.clone();
    builder.add(move |_| {
        b.fetch_add(1, Ordering::SeqCst);
        Ok(step("first"))
    });
    builder.add(|r| {
        r.resolve::<Missing>()?;
        Ok(step("second"))
    });
    let b = built.clone();
    builder.add(move |_| {
        b.fetch_add(1, Ordering::SeqCst);
        Ok(step("third"))
    });
    let configuration = builder.build();

    let provider = services.build();
    let scope = provider.create_scope().unwrap();
    match configuration.chain_for(&scope) {
        Err(DiError::NotFound(name)) => assert!(name.ends_with("Missing")),
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
    // Factories after the failing one never ran.
    assert_eq!(built.load(Ordering::SeqCst), 1);

    // The failure is not cached and the scope stays usable.
    assert!(configuration.chain_for(&scope).is_err());
    assert_eq!(built.load(Ordering::SeqCst), 2);
    assert!(!scope.is_released());
}

#[test]
fn test_failure_is_retried_once_the_dependency_exists() {
    let available = Arc::new(AtomicU32::new(0));
    let mut services = ServiceCollection::new();
    let mut builder = MiddlewareBuilder::consumer(&mut services);
    let a = available.clone();
    builder.add(move |_| {
        if a.load(Ordering::SeqCst) == 0 {
            Err(DiError::NotFound("Feature"))
        } else {
            Ok(step("ready"))
        }
    });
    let configuration = builder.build();

    let provider = services.build();
    let scope = provider.create_scope().unwrap();
    assert!(configuration.chain_for(&scope).is_err());

    available.store(1, Ordering::SeqCst);
    let chain = configuration.chain_for(&scope).unwrap();
    assert_eq!(chain.len(), 1);
}

#[test]
fn test_execute_stops_at_the_first_error() {
    let mut services = ServiceCollection::new();
    let mut builder = MiddlewareBuilder::consumer(&mut services);
    builder
        .add(|_| Ok(step("a")))
        .add(|_| Ok(Arc::new(Failing) as Arc<dyn Middleware>))
        .add(|_| Ok(step("c")));
    let configuration = builder.build();

    let provider = services.build();
    let chain = configuration.materialize(&provider).unwrap();
    let mut ctx = MessageContext::inbound("orders", Vec::new());

    assert!(matches!(
        chain.execute(&mut ctx),
        Err(MiddlewareError::MissingTypeHeader("X-Required"))
    ));
    assert_eq!(ctx.headers().get_str("trail"), Some("a"));
}

#[test]
fn test_released_scope_refuses_chains() {
    let mut services = ServiceCollection::new();
    let mut builder = MiddlewareBuilder::consumer(&mut services);
    builder.add(|_| Ok(step("a")));
    let configuration = builder.build();

    let provider = services.build();
    let scope = provider.create_scope().unwrap();
    let chain = configuration.chain_for(&scope).unwrap();
    scope.release().unwrap();

    assert!(matches!(configuration.chain_for(&scope), Err(DiError::ScopeReleased(_))));
    // Chains already handed out keep working.
    let mut ctx = MessageContext::inbound("orders", Vec::new());
    chain.execute(&mut ctx).unwrap();
}

struct ScopedCounter {
    id: u32,
}

static NEXT_COUNTER: AtomicU32 = AtomicU32::new(0);

impl Construct for ScopedCounter {
    fn construct(_: &dyn ResolverCore) -> DiResult<Self> {
        Ok(ScopedCounter { id: NEXT_COUNTER.fetch_add(1, Ordering::SeqCst) })
    }
}

impl Middleware for ScopedCounter {
    fn invoke(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
        ctx.headers_mut().set("counter", self.id.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scoped-counter"
    }
}

#[test]
fn test_typed_middleware_uses_its_lifetime() {
    let mut services = ServiceCollection::new();
    let mut builder = MiddlewareBuilder::consumer(&mut services);
    builder.add_middleware::<ScopedCounter>(Lifetime::Scoped).unwrap();
    assert!(builder.add_middleware::<ScopedCounter>("hourly").is_err());
    assert_eq!(builder.len(), 1);
    let configuration = builder.build();
    assert_eq!(services.len(), 1);

    let provider = services.build();
    let scope = provider.create_scope().unwrap();
    let chain = configuration.chain_for(&scope).unwrap();
    assert_eq!(chain.names(), vec!["scoped-counter"]);

    // The middleware is the scope's own instance.
    let resolved = scope.resolve::<ScopedCounter>().unwrap();
    let mut ctx = MessageContext::inbound("orders", Vec::new());
    chain.execute(&mut ctx).unwrap();
    assert_eq!(ctx.headers().get_str("counter"), Some(resolved.id.to_string().as_str()));
}

#[test]
fn test_configuration_reports_its_direction() {
    let mut services = ServiceCollection::new();
    let producer = MiddlewareBuilder::producer(&mut services).build();
    let consumer = MiddlewareBuilder::consumer(&mut services).build();

    assert_eq!(producer.direction(), "producer");
    assert_eq!(consumer.direction(), "consumer");
    assert!(producer.is_empty());
}
