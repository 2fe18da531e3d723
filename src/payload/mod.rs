//! Payload generation (spec.md §4.1).
//!
//! `PayloadGenerator` is invoked once per request on the hot path, so
//! implementations must be cheap: the constant variant just clones a
//! buffer captured at startup.

pub mod file;
pub mod process;

/// Produces the bytes for a given request id.
///
/// Callers must treat the returned buffer as read-only for the duration
/// of the send. There is no error mode — payload acquisition happens
/// once at startup (see [`file::FilePayloadProvider`] and
/// [`process::ProcessPayloadProvider`]); by the time a `PayloadGenerator`
/// is handed to a [`crate::worker::Worker`], it cannot fail.
pub trait PayloadGenerator: Send + Sync {
    fn generate(&self, request_id: u64) -> Vec<u8>;
}

/// Ignores the request id and always returns the same bytes.
#[derive(Debug, Clone)]
pub struct ConstantPayloadGenerator {
    payload: Vec<u8>,
}

impl ConstantPayloadGenerator {
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }
}

impl PayloadGenerator for ConstantPayloadGenerator {
    fn generate(&self, _request_id: u64) -> Vec<u8> {
        self.payload.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_generator_ignores_request_id() {
        let generator = ConstantPayloadGenerator::new(b"hello".to_vec());
        assert_eq!(generator.generate(1), b"hello");
        assert_eq!(generator.generate(999), b"hello");
    }
}
