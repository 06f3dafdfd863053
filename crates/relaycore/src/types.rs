//! Registry of serializable trigger input types.
//!
//! Started triggers may be persisted and restarted with the same input after
//! a process restart. Every trigger input type is registered here under a
//! tag when its binding is created, so recorded inputs can be decoded back
//! into the concrete type.

use crate::error::SerializationError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

type Decoder = fn(serde_json::Value) -> Result<Box<dyn Any + Send>, serde_json::Error>;

struct TypeEntry {
    type_id: TypeId,
    type_name: &'static str,
    decode: Decoder,
}

/// An input captured so it can be replayed later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedInput {
    pub tag: String,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct TypeRegistry {
    entries: RwLock<HashMap<String, TypeEntry>>,
}

fn decode_boxed<T>(value: serde_json::Value) -> Result<Box<dyn Any + Send>, serde_json::Error>
where
    T: DeserializeOwned + Send + 'static,
{
    let typed: T = serde_json::from_value(value)?;
    Ok(Box::new(typed))
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under its type name.
    pub fn register<T>(&self) -> Result<String, SerializationError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let tag = std::any::type_name::<T>();
        self.register_as::<T>(tag)?;
        Ok(tag.to_string())
    }

    /// Register `T` under an explicit tag. Registering the same type twice is
    /// a no-op; reusing a tag for another type is an error.
    pub fn register_as<T>(&self, tag: &str) -> Result<(), SerializationError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(tag) {
            if existing.type_id == TypeId::of::<T>() {
                return Ok(());
            }
            return Err(SerializationError::Conflict {
                tag: tag.to_string(),
                existing: existing.type_name,
                requested: std::any::type_name::<T>(),
            });
        }

        tracing::debug!("Registering serializable type {} as '{}'", std::any::type_name::<T>(), tag);
        entries.insert(
            tag.to_string(),
            TypeEntry {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                decode: decode_boxed::<T>,
            },
        );
        Ok(())
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(tag)
    }

    pub fn tags(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Capture a typed input. `T` must have been registered.
    pub fn record<T>(&self, input: &T) -> Result<RecordedInput, SerializationError>
    where
        T: Serialize + 'static,
    {
        let tag = self.tag_of(TypeId::of::<T>()).ok_or_else(|| {
            SerializationError::UnknownTag(std::any::type_name::<T>().to_string())
        })?;
        let payload = serde_json::to_value(input).map_err(|e| SerializationError::Encode {
            tag: tag.clone(),
            reason: e.to_string(),
        })?;
        Ok(RecordedInput {
            tag,
            payload,
            recorded_at: Utc::now(),
        })
    }

    /// Capture an input given as JSON, checking it decodes under `tag`.
    pub fn record_json(
        &self,
        tag: &str,
        payload: serde_json::Value,
    ) -> Result<RecordedInput, SerializationError> {
        self.decode(tag, payload.clone())?;
        Ok(RecordedInput {
            tag: tag.to_string(),
            payload,
            recorded_at: Utc::now(),
        })
    }

    /// Decode a recorded input back into its concrete (boxed) type.
    pub fn replay(&self, recorded: &RecordedInput) -> Result<Box<dyn Any + Send>, SerializationError> {
        self.decode(&recorded.tag, recorded.payload.clone())
    }

    /// Like [`replay`](Self::replay) but returns the concrete type.
    pub fn replay_as<T: 'static>(&self, recorded: &RecordedInput) -> Result<T, SerializationError> {
        let boxed = self.replay(recorded)?;
        boxed
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| SerializationError::Decode {
                tag: recorded.tag.clone(),
                reason: format!("recorded value is not a {}", std::any::type_name::<T>()),
            })
    }

    fn decode(&self, tag: &str, payload: serde_json::Value) -> Result<Box<dyn Any + Send>, SerializationError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .get(tag)
            .ok_or_else(|| SerializationError::UnknownTag(tag.to_string()))?;
        (entry.decode)(payload).map_err(|e| SerializationError::Decode {
            tag: tag.to_string(),
            reason: e.to_string(),
        })
    }

    fn tag_of(&self, type_id: TypeId) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(_, entry)| entry.type_id == type_id)
            .map(|(tag, _)| tag.clone())
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry").field("tags", &self.tags()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Channel {
        name: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Calendar {
        id: u32,
    }

    #[test]
    fn record_and_replay() {
        let types = TypeRegistry::new();
        let tag = types.register::<Channel>().unwrap();
        assert!(types.is_registered(&tag));

        let recorded = types
            .record(&Channel {
                name: "general".into(),
            })
            .unwrap();
        let json = serde_json::to_string(&recorded).unwrap();
        let restored: RecordedInput = serde_json::from_str(&json).unwrap();

        let channel: Channel = types.replay_as(&restored).unwrap();
        assert_eq!(channel.name, "general");
    }

    #[test]
    fn same_type_registers_twice() {
        let types = TypeRegistry::new();
        types.register::<Channel>().unwrap();
        types.register::<Channel>().unwrap();
        assert_eq!(types.tags().len(), 1);
    }

    #[test]
    fn conflicting_tag_is_rejected() {
        let types = TypeRegistry::new();
        types.register_as::<Channel>("input").unwrap();
        let err = types.register_as::<Calendar>("input").unwrap_err();
        assert!(matches!(err, SerializationError::Conflict { .. }));
    }

    #[test]
    fn unregistered_types_cannot_be_recorded() {
        let types = TypeRegistry::new();
        let err = types.record(&Calendar { id: 1 }).unwrap_err();
        assert!(matches!(err, SerializationError::UnknownTag(_)));
    }

    #[test]
    fn record_json_checks_shape() {
        let types = TypeRegistry::new();
        types.register_as::<Calendar>("calendar").unwrap();
        assert!(types.record_json("calendar", serde_json::json!({ "id": 3 })).is_ok());
        let err = types
            .record_json("calendar", serde_json::json!({ "id": "three" }))
            .unwrap_err();
        assert!(matches!(err, SerializationError::Decode { .. }));
    }
}
