//! JSON serializer backed by `serde_json`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::descriptors::Construct;
use crate::error::{BoxError, DiResult, MiddlewareError};
use crate::middleware::MessageType;
use crate::serializer::MessageSerializer;
use crate::traits::{Resolver, ResolverCore};

type Encode = fn(&(dyn Any + Send + Sync)) -> Result<Vec<u8>, BoxError>;
type Decode = fn(&[u8]) -> Result<Arc<dyn Any + Send + Sync>, BoxError>;

struct JsonCodec {
    encode: Encode,
    decode: Decode,
}

fn encode<T: Serialize + 'static>(message: &(dyn Any + Send + Sync)) -> Result<Vec<u8>, BoxError> {
    let message = message
        .downcast_ref::<T>()
        .ok_or_else(|| format!("payload is not a {}", std::any::type_name::<T>()))?;
    Ok(serde_json::to_vec(message)?)
}

fn decode<T: DeserializeOwned + Send + Sync + 'static>(bytes: &[u8]) -> Result<Arc<dyn Any + Send + Sync>, BoxError> {
    let message: T = serde_json::from_slice(bytes)?;
    Ok(Arc::new(message))
}

/// Catalogue of message types the JSON serializer can handle, keyed by
/// [`MessageType`] name.
///
/// Register it as an instance; [`JsonMessageSerializer`] resolves it when it
/// is constructed by the container.
///
/// ```
/// use ferrous_flow::{JsonTypes, MessageType};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct OrderPlaced { id: u32 }
///
/// let types = JsonTypes::new().with::<OrderPlaced>();
/// assert!(types.contains(&MessageType::of::<OrderPlaced>()));
/// ```
#[derive(Default)]
pub struct JsonTypes {
    codecs: HashMap<MessageType, JsonCodec>,
}

impl JsonTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self) -> &mut Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.codecs.insert(
            MessageType::of::<T>(),
            JsonCodec {
                encode: encode::<T>,
                decode: decode::<T>,
            },
        );
        self
    }

    pub fn with<T>(mut self) -> Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.register::<T>();
        self
    }

    pub fn contains(&self, message_type: &MessageType) -> bool {
        self.codecs.contains_key(message_type)
    }

    fn codec(&self, message_type: &MessageType) -> Result<&JsonCodec, MiddlewareError> {
        self.codecs
            .get(message_type)
            .ok_or_else(|| MiddlewareError::UnknownMessageType(message_type.to_string()))
    }
}

impl fmt::Debug for JsonTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.codecs.keys().map(MessageType::name)).finish()
    }
}

/// [`MessageSerializer`] producing JSON.
#[derive(Debug, Clone)]
pub struct JsonMessageSerializer {
    types: Arc<JsonTypes>,
}

impl JsonMessageSerializer {
    pub fn new(types: Arc<JsonTypes>) -> Self {
        Self { types }
    }
}

impl Construct for JsonMessageSerializer {
    fn construct(resolver: &dyn ResolverCore) -> DiResult<Self> {
        Ok(Self::new(resolver.resolve::<JsonTypes>()?))
    }
}

impl MessageSerializer for JsonMessageSerializer {
    fn serialize(
        &self,
        message: &(dyn Any + Send + Sync),
        message_type: &MessageType,
    ) -> Result<Vec<u8>, MiddlewareError> {
        let codec = self.types.codec(message_type)?;
        (codec.encode)(message).map_err(|source| MiddlewareError::Serialize {
            message_type: message_type.to_string(),
            source,
        })
    }

    fn deserialize(
        &self,
        bytes: &[u8],
        message_type: &MessageType,
    ) -> Result<Arc<dyn Any + Send + Sync>, MiddlewareError> {
        let codec = self.types.codec(message_type)?;
        (codec.decode)(bytes).map_err(|source| MiddlewareError::Deserialize {
            message_type: message_type.to_string(),
            source,
        })
    }
}
