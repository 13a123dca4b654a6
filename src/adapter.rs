//! Adapter contract — pure transforms from `IntentPacket` to a consumer's
//! own representation (§6). `DictAdapter` is the reference implementation,
//! producing the canonical serde-serializable dict form.

use serde_json::Value;

use crate::packet::IntentPacket;

/// Transforms a packet into some target representation `T`.
pub trait Adapter<T> {
    fn name(&self) -> &str;

    fn transform(&self, packet: &IntentPacket) -> T;

    /// Default batch variant: repeated single-packet transforms.
    fn batch_transform(&self, packets: &[IntentPacket]) -> Vec<T> {
        packets.iter().map(|p| self.transform(p)).collect()
    }
}

/// Converts a packet to its canonical dict form (§6) as a `serde_json::Value`.
#[derive(Debug, Clone, Default)]
pub struct DictAdapter;

impl DictAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Adapter<Value> for DictAdapter {
    fn name(&self) -> &str {
        "dict"
    }

    fn transform(&self, packet: &IntentPacket) -> Value {
        serde_json::to_value(packet).expect("IntentPacket always serializes")
    }
}

/// Wraps a plain closure as an `Adapter<T>`.
pub struct CallbackAdapter<T, F>
where
    F: Fn(&IntentPacket) -> T,
{
    name: String,
    callback: F,
}

impl<T, F> CallbackAdapter<T, F>
where
    F: Fn(&IntentPacket) -> T,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<T, F> Adapter<T> for CallbackAdapter<T, F>
where
    F: Fn(&IntentPacket) -> T,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, packet: &IntentPacket) -> T {
        (self.callback)(packet)
    }
}
