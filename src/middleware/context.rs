//! Message envelope passed through a middleware chain.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Identifier of a message payload type.
///
/// Built-in resolvers and serializers name types by their Rust type name,
/// which is also what the `Message-Type` header carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageType {
    name: Cow<'static, str>,
}

impl MessageType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: Cow::Borrowed(std::any::type_name::<T>()),
        }
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Ordered message headers. Keys may repeat; lookups return the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeaders {
    entries: Vec<(String, Vec<u8>)>,
}

impl MessageHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Replaces every value of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        let key = key.into();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Header value as UTF-8, `None` when absent or not valid UTF-8.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Message payload in one of its pipeline stages.
#[derive(Clone, Default)]
pub enum MessageValue {
    #[default]
    Empty,
    /// Wire bytes, before deserialization or after serialization
    Bytes(Vec<u8>),
    /// Application object
    Object {
        message_type: MessageType,
        value: Arc<dyn Any + Send + Sync>,
    },
}

impl MessageValue {
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        MessageValue::Object {
            message_type: MessageType::of::<T>(),
            value: Arc::new(value),
        }
    }
}

impl fmt::Debug for MessageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageValue::Empty => f.write_str("Empty"),
            MessageValue::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            MessageValue::Object { message_type, .. } => write!(f, "Object({})", message_type),
        }
    }
}

/// A message travelling through a producer or consumer chain.
///
/// # Examples
///
/// ```
/// use ferrous_flow::MessageContext;
///
/// #[derive(Debug, PartialEq)]
/// struct OrderPlaced { id: u32 }
///
/// let ctx = MessageContext::outbound("orders", OrderPlaced { id: 7 })
///     .with_key("order-7")
///     .with_header("source", "checkout");
///
/// assert_eq!(ctx.topic(), "orders");
/// assert_eq!(ctx.message::<OrderPlaced>(), Some(&OrderPlaced { id: 7 }));
/// assert_eq!(ctx.headers().get_str("source"), Some("checkout"));
/// ```
#[derive(Debug, Clone)]
pub struct MessageContext {
    topic: String,
    key: Option<Vec<u8>>,
    headers: MessageHeaders,
    value: MessageValue,
}

impl MessageContext {
    /// Context for a message the application is producing.
    pub fn outbound<T: Any + Send + Sync>(topic: impl Into<String>, message: T) -> Self {
        Self::with_value(topic, MessageValue::object(message))
    }

    /// Context for bytes received from the broker.
    pub fn inbound(topic: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::with_value(topic, MessageValue::Bytes(bytes.into()))
    }

    pub fn with_value(topic: impl Into<String>, value: MessageValue) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            headers: MessageHeaders::new(),
            value,
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.add(key, value);
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }

    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut MessageHeaders {
        &mut self.headers
    }

    pub fn value(&self) -> &MessageValue {
        &self.value
    }

    pub fn set_value(&mut self, value: MessageValue) {
        self.value = value;
    }

    pub fn take_value(&mut self) -> MessageValue {
        std::mem::take(&mut self.value)
    }

    /// Payload bytes, when the message is in wire form.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.value {
            MessageValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Payload object, when it is a `T`.
    pub fn message<T: Any>(&self) -> Option<&T> {
        match &self.value {
            MessageValue::Object { value, .. } => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn message_type(&self) -> Option<&MessageType> {
        match &self.value {
            MessageValue::Object { message_type, .. } => Some(message_type),
            _ => None,
        }
    }
}
