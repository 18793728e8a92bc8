//! # Element Codecs
//!
//! The queue stores raw bytes; a [`Serializer`] turns elements into bytes on
//! the way in and back on the way out. Codecs run outside the queue lock and
//! may be invoked from several threads at once, so implementations must be
//! `Send + Sync`.
//!
//! [`JsonSerializer`] is the default codec; [`BytesSerializer`] and
//! [`StringSerializer`] cover the raw-payload cases without a serde round
//! trip.

use std::marker::PhantomData;

use eyre::{Result, WrapErr};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Byte codec for queue elements.
pub trait Serializer: Send + Sync {
    type Item;

    fn encode(&self, item: &Self::Item) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Item>;
}

/// Identity codec for raw byte payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesSerializer;

impl Serializer for BytesSerializer {
    type Item = Vec<u8>;

    fn encode(&self, item: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(item.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 string codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerializer;

impl Serializer for StringSerializer {
    type Item = String;

    fn encode(&self, item: &String) -> Result<Vec<u8>> {
        Ok(item.clone().into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).wrap_err("queued bytes are not valid UTF-8")
    }
}

/// Default codec: any `serde` type as JSON.
pub struct JsonSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonSerializer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonSerializer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonSerializer")
    }
}

impl<T: Serialize + DeserializeOwned> Serializer for JsonSerializer<T> {
    type Item = T;

    fn encode(&self, item: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(item).wrap_err("failed to encode element as JSON")
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).wrap_err("failed to decode element from JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_codec_is_identity() {
        let codec = BytesSerializer;
        let payload = vec![0u8, 255, 7, 42];

        let encoded = codec.encode(&payload).unwrap();

        assert_eq!(encoded, payload);
        assert_eq!(codec.decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn string_codec_round_trips_utf8() {
        let codec = StringSerializer;

        let encoded = codec.encode(&"grüße".to_string()).unwrap();

        assert_eq!(codec.decode(&encoded).unwrap(), "grüße");
    }

    #[test]
    fn string_codec_rejects_invalid_utf8() {
        let codec = StringSerializer;

        assert!(codec.decode(&[0xFF, 0xFE]).is_err());
    }

    #[test]
    fn json_codec_round_trips_structs() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Job {
            id: u64,
            name: String,
        }
        let codec = JsonSerializer::<Job>::new();
        let job = Job {
            id: 9,
            name: "compact".into(),
        };

        let encoded = codec.encode(&job).unwrap();

        assert_eq!(codec.decode(&encoded).unwrap(), job);
    }

    #[test]
    fn json_codec_rejects_garbage() {
        let codec = JsonSerializer::<u32>::new();

        assert!(codec.decode(b"{not json").is_err());
    }
}
