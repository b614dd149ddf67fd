use crate::item::ExpiringItem;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializes cache entries for the persisted tier.
///
/// Failures are silent by contract: a corrupt stored entry must degrade to
/// a cache miss, never to a caller-visible error, so both directions return
/// `Option` instead of `Result`.
pub trait Codec<V>: Send + Sync {
  fn encode(&self, item: &ExpiringItem<V>) -> Option<Vec<u8>>;
  fn decode(&self, bytes: &[u8]) -> Option<ExpiringItem<V>>;
}

/// The production codec: human-readable JSON via `serde_json`.
///
/// The wire shape is `{ value, creationTime, lastAccessTime,
/// expirationPolicy }` with the policy as a tagged union, so files written
/// by earlier deployments of the same format stay readable.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
  pub fn new() -> Self {
    Self
  }
}

impl<V> Codec<V> for JsonCodec
where
  V: Serialize + DeserializeOwned + Send + Sync,
{
  fn encode(&self, item: &ExpiringItem<V>) -> Option<Vec<u8>> {
    serde_json::to_vec(item).ok()
  }

  fn decode(&self, bytes: &[u8]) -> Option<ExpiringItem<V>> {
    serde_json::from_slice(bytes).ok()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::item::ExpirationPolicy;
  use std::time::SystemTime;

  #[test]
  fn malformed_bytes_decode_to_none() {
    let codec = JsonCodec::new();
    let decoded: Option<ExpiringItem<String>> = codec.decode(b"{not json");
    assert!(decoded.is_none());

    let decoded: Option<ExpiringItem<String>> = codec.decode(b"{\"value\":1}");
    assert!(decoded.is_none(), "missing fields must not decode");
  }

  #[test]
  fn encode_decode_preserves_item() {
    let codec = JsonCodec::new();
    let item = ExpiringItem::new(
      vec![1u8, 2, 3],
      ExpirationPolicy::Never,
      SystemTime::UNIX_EPOCH,
    );

    let bytes = codec.encode(&item).unwrap();
    let back = codec.decode(&bytes).unwrap();
    assert_eq!(back, item);
  }
}
