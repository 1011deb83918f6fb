//! The calling convention shared by local and remote resource proxies.
//!
//! Server code calls a resource in-process through a local proxy; client code
//! calls the same resource over HTTP through a remote proxy. Both implement
//! `ResourceProxy`, so code written against the trait runs unchanged on either
//! side.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::value::Value;

/// Boxed error returned by resource method bodies and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a typed proxy call.
#[derive(Debug, thiserror::Error)]
pub enum TypedCallError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Call(E),

    #[error("failed to encode input: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode output: {0}")]
    Decode(#[source] serde_json::Error),
}

/// `resource[action](input?) -> Output`, independent of where the resource lives.
#[async_trait]
pub trait ResourceProxy: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Name of the proxied resource.
    fn resource(&self) -> &str;

    /// Call `action` with optional input.
    ///
    /// Input is validated against the action's schema before it leaves the
    /// proxy; actions with the blank schema ignore it.
    async fn call(&self, action: &str, input: Option<Value>) -> Result<Value, Self::Error>;

    /// Typed variant of [`ResourceProxy::call`].
    async fn call_as<I, R>(&self, action: &str, input: &I) -> Result<R, TypedCallError<Self::Error>>
    where
        Self: Sized,
        I: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let input = Value::from_serialize(input).map_err(TypedCallError::Encode)?;
        let output = self
            .call(action, Some(input))
            .await
            .map_err(TypedCallError::Call)?;
        output.deserialize_into().map_err(TypedCallError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, thiserror::Error)]
    #[error("echo failed")]
    struct EchoError;

    struct Echo;

    #[async_trait]
    impl ResourceProxy for Echo {
        type Error = EchoError;

        fn resource(&self) -> &str {
            "echo"
        }

        async fn call(&self, _action: &str, input: Option<Value>) -> Result<Value, Self::Error> {
            input.ok_or(EchoError)
        }
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Note {
        text: String,
    }

    #[tokio::test]
    async fn typed_call_roundtrips() {
        let note = Note {
            text: "hi".to_string(),
        };
        let back: Note = Echo.call_as("say", &note).await.unwrap();
        assert_eq!(back, note);
    }

    #[tokio::test]
    async fn typed_call_reports_decode_errors() {
        let result: Result<u64, _> = Echo.call_as("say", &"text").await;
        assert!(matches!(result, Err(TypedCallError::Decode(_))));
    }
}
