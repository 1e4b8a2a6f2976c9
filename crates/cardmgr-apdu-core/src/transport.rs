//! Transport-level abstraction for talking to a card/reader.

use bytes::Bytes;
use std::fmt;

use crate::error::Error;

/// Raw byte-level connection to a card. Implementors send a command APDU
/// and return the raw response bytes (payload + status word), with no
/// framing or security applied.
pub trait CardTransport: fmt::Debug + Send + Sync {
    /// Send `command` and return the raw response.
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Error>;

    /// Reset the transport (warm reset where supported).
    fn reset(&mut self) -> Result<(), Error>;
}

#[cfg(test)]
pub use mock::MockTransport;

#[cfg(test)]
mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Fixed-response transport used by processor/session tests, grounded
    /// on `TestMockTransport` in the teacher's secure_channel.rs tests.
    #[derive(Debug)]
    pub struct MockTransport {
        responses: Mutex<Vec<Bytes>>,
        sent: Mutex<Vec<Bytes>>,
    }

    impl MockTransport {
        /// A transport that always returns the same response.
        pub fn with_response(response: Bytes) -> Self {
            Self {
                responses: Mutex::new(vec![response]),
                sent: Mutex::new(Vec::new()),
            }
        }

        /// A transport that returns `responses` in order, one per call.
        pub fn with_responses(responses: Vec<Bytes>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                sent: Mutex::new(Vec::new()),
            }
        }

        /// Commands sent so far, in order.
        pub fn sent(&self) -> Vec<Bytes> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl CardTransport for MockTransport {
        fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Error> {
            self.sent
                .lock()
                .unwrap()
                .push(Bytes::copy_from_slice(command));
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                Ok(responses.pop().unwrap())
            } else {
                Ok(responses.last().cloned().unwrap_or_default())
            }
        }

        fn reset(&mut self) -> Result<(), Error> {
            Ok(())
        }
    }
}
