use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_flow::*;
use std::sync::Arc;

// ===== Resolution =====

fn bench_singleton_hit(c: &mut Criterion) {
    let mut sc = ServiceCollection::new();
    sc.add_instance(Arc::new(42u64));
    let sp = sc.build();

    // Prime the singleton
    let _ = sp.resolve::<u64>().unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = sp.resolve::<u64>().unwrap();
            black_box(v);
        })
    });
}

fn bench_scoped_vs_transient(c: &mut Criterion) {
    struct Service {
        data: [u8; 64],
    }

    let mut group = c.benchmark_group("scoped_vs_transient");

    let mut sc_scoped = ServiceCollection::new();
    sc_scoped
        .add_factory::<Service, _>(Lifetime::Scoped, |_| Ok(Arc::new(Service { data: [0; 64] })))
        .unwrap();
    let sp_scoped = sc_scoped.build();
    let scope = sp_scoped.create_scope().unwrap();

    group.bench_function("scoped_hit", |b| {
        b.iter(|| {
            let v = scope.resolve::<Service>().unwrap();
            black_box(&v.data);
        })
    });

    let mut sc_transient = ServiceCollection::new();
    sc_transient
        .add_factory::<Service, _>(Lifetime::Transient, |_| Ok(Arc::new(Service { data: [0; 64] })))
        .unwrap();
    let sp_transient = sc_transient.build();
    let transient_scope = sp_transient.create_scope().unwrap();

    group.bench_function("transient", |b| {
        b.iter(|| {
            let v = transient_scope.resolve::<Service>().unwrap();
            black_box(&v.data);
        })
    });

    group.finish();
}

fn bench_scope_lifecycle(c: &mut Criterion) {
    struct Unit;

    let mut sc = ServiceCollection::new();
    sc.add_factory::<Unit, _>(Lifetime::Scoped, |_| Ok(Arc::new(Unit))).unwrap();
    let sp = sc.build();

    c.bench_function("scope_create_resolve_release", |b| {
        b.iter(|| {
            let scope = sp.create_scope().unwrap();
            black_box(scope.resolve::<Unit>().unwrap());
            scope.release().unwrap();
        })
    });
}

// ===== Middleware =====

struct Stamp;

impl Middleware for Stamp {
    fn invoke(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
        ctx.headers_mut().set("stamp", "1");
        Ok(())
    }
}

fn configuration_with(steps: usize, services: &mut ServiceCollection) -> MiddlewareConfiguration {
    let mut builder = MiddlewareBuilder::consumer(services);
    for _ in 0..steps {
        builder.add(|_| Ok(Arc::new(Stamp) as Arc<dyn Middleware>));
    }
    builder.build()
}

fn bench_chain_for(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_for");

    for steps in [1usize, 4, 16] {
        let mut services = ServiceCollection::new();
        let configuration = configuration_with(steps, &mut services);
        let provider = services.build();

        group.bench_with_input(BenchmarkId::new("cached", steps), &steps, |b, _| {
            let scope = provider.create_scope().unwrap();
            configuration.chain_for(&scope).unwrap();
            b.iter(|| black_box(configuration.chain_for(&scope).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("fresh_scope", steps), &steps, |b, _| {
            b.iter(|| {
                let scope = provider.create_scope().unwrap();
                black_box(configuration.chain_for(&scope).unwrap());
            })
        });
    }

    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");

    for steps in [1usize, 4, 16] {
        let mut services = ServiceCollection::new();
        let configuration = configuration_with(steps, &mut services);
        let provider = services.build();
        let chain = configuration.materialize(&provider).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, _| {
            b.iter(|| {
                let mut ctx = MessageContext::inbound("bench", vec![0u8; 32]);
                chain.execute(&mut ctx).unwrap();
                black_box(ctx);
            })
        });
    }

    group.finish();
}

#[cfg(all(feature = "json", feature = "gzip"))]
fn bench_json_gzip_round_trip(c: &mut Criterion) {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Order {
        id: u64,
        sku: String,
    }

    let mut services = ServiceCollection::new();
    services.add_instance(Arc::new(JsonTypes::new().with::<Order>()));
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
    let producer = producer.chain_for(&scope).unwrap();
    let consumer = consumer.chain_for(&scope).unwrap();

    c.bench_function("json_gzip_round_trip", |b| {
        b.iter(|| {
            let mut outbound = MessageContext::outbound("orders", Order { id: 1, sku: "A-1".to_string() });
            producer.execute(&mut outbound).unwrap();
            let mut inbound = MessageContext::inbound("orders", outbound.bytes().unwrap().to_vec());
            for (key, value) in outbound.headers().iter() {
                inbound.headers_mut().add(key, value);
            }
            consumer.execute(&mut inbound).unwrap();
            black_box(inbound.message::<Order>().map(|o| o.id));
        })
    });
}

#[cfg(not(all(feature = "json", feature = "gzip")))]
fn bench_json_gzip_round_trip(_: &mut Criterion) {}

criterion_group!(
    resolution_benches,
    bench_singleton_hit,
    bench_scoped_vs_transient,
    bench_scope_lifecycle,
);

criterion_group!(
    middleware_benches,
    bench_chain_for,
    bench_execute,
    bench_json_gzip_round_trip,
);

criterion_main!(resolution_benches, middleware_benches);
