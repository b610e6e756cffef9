//! # ferrous-flow
//!
//! Dependency resolution and middleware composition for message-bus clients.
//!
//! ## Features
//!
//! - **Container-agnostic contracts**: register through [`ConfiguratorCore`],
//!   resolve through [`ResolverCore`], scope through [`ScopeBackend`]
//! - **Three lifetimes**: Singleton, Scoped and Transient, with lifetimes
//!   validated at registration time
//! - **Deterministic scope teardown**: children first, dispose hooks in LIFO
//!   order, idempotent release
//! - **Middleware chains**: declared once, materialized once per scope
//! - **Serializer and compressor steps**: pluggable serializers, type
//!   resolvers and compressors, with JSON and gzip built in
//! - **Typed handlers**: dispatch deserialized messages by type
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_flow::{Configurator, GzipMessageCompressor, JsonMessageSerializer, JsonTypes,
//!     MessageContext, MiddlewareBuilder, ServiceCollection};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct OrderPlaced { id: u32 }
//!
//! let mut services = ServiceCollection::new();
//! services.add_instance(Arc::new(JsonTypes::new().with::<OrderPlaced>()));
//!
//! let mut producer = MiddlewareBuilder::producer(&mut services);
//! producer
//!     .add_serializer::<JsonMessageSerializer>()
//!     .add_compressor::<GzipMessageCompressor>();
//! let producer = producer.build();
//!
//! let mut consumer = MiddlewareBuilder::consumer(&mut services);
//! consumer
//!     .add_compressor::<GzipMessageCompressor>()
//!     .add_serializer::<JsonMessageSerializer>();
//! let consumer = consumer.build();
//!
//! let provider = services.build();
//! let scope = provider.create_scope().unwrap();
//!
//! let mut outbound = MessageContext::outbound("orders", OrderPlaced { id: 7 });
//! producer.chain_for(&scope).unwrap().execute(&mut outbound).unwrap();
//!
//! let mut inbound = MessageContext::inbound("orders", outbound.bytes().unwrap().to_vec());
//! for (key, value) in outbound.headers().iter() {
//!     inbound.headers_mut().add(key, value);
//! }
//! consumer.chain_for(&scope).unwrap().execute(&mut inbound).unwrap();
//! assert_eq!(inbound.message::<OrderPlaced>(), Some(&OrderPlaced { id: 7 }));
//!
//! scope.release().unwrap();
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: Created once and shared across every scope
//! - **Scoped**: Created once per scope; released with it
//! - **Transient**: Created fresh on every resolution
//!
//! Re-registering a service appends another registration. `resolve` returns
//! the last one, `resolve_all` returns all of them in registration order.
//!
//! ## Scopes
//!
//! ```rust
//! use ferrous_flow::{Configurator, Lifetime, Resolver, ServiceCollection};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! struct RequestId(u32);
//!
//! let counter = Arc::new(AtomicU32::new(0));
//! let c = counter.clone();
//! let mut services = ServiceCollection::new();
//! services.add_factory::<RequestId, _>(Lifetime::Scoped, move |_| {
//!     Ok(Arc::new(RequestId(c.fetch_add(1, Ordering::SeqCst))))
//! }).unwrap();
//!
//! let provider = services.build();
//! let outer = provider.create_scope().unwrap();
//! let inner = outer.create_scope().unwrap();
//!
//! let a = outer.resolve::<RequestId>().unwrap();
//! let b = inner.resolve::<RequestId>().unwrap();
//! assert_ne!(a.0, b.0);
//!
//! outer.release().unwrap(); // releases `inner` first
//! assert!(inner.is_released());
//! ```

// Module declarations
pub mod collection;
pub mod compressor;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod middleware;
pub mod observer;
pub mod provider;
pub mod serializer;
pub mod traits;
pub mod typed_handler;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use collection::{ConfiguratorModuleExt, ServiceCollection, ServiceModule};
pub use config::ProviderOptions;
pub use descriptors::{AnyArc, Construct, Ctor, Implementation, ServiceDescriptor, Upcast};
pub use error::{BoxError, DiError, DiResult, DisposalError, MiddlewareError, ReleaseError};
pub use internal::Disposer;
pub use key::Key;
pub use lifetime::{IntoLifetime, Lifetime};
pub use observer::{DiObserver, TracingObserver};
pub use provider::{ResolverScope, ScopeBackend, ServiceProvider};
pub use traits::{Configurator, ConfiguratorCore, Dispose, Resolver, ResolverCore};

pub use compressor::{CompressorConsumerMiddleware, CompressorProducerMiddleware, MessageCompressor};
#[cfg(feature = "gzip")]
pub use compressor::GzipMessageCompressor;
pub use middleware::{
    Consumer, Direction, MessageContext, MessageHeaders, MessageType, MessageValue, Middleware,
    MiddlewareBuilder, MiddlewareChain, MiddlewareConfiguration, MiddlewareFactory, Producer,
};
#[cfg(feature = "json")]
pub use serializer::{JsonMessageSerializer, JsonTypes};
pub use serializer::{
    DefaultMessageTypeResolver, MessageSerializer, MessageTypeResolver, SerializerConsumerMiddleware,
    SerializerProducerMiddleware, SingleMessageTypeResolver, MESSAGE_TYPE_HEADER,
};
pub use typed_handler::{MessageHandler, TypedHandlerBuilder, TypedHandlerMiddleware};
