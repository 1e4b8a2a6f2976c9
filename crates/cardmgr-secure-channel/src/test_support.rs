//! Fixed-response transport for handshake/wrap tests, grounded on
//! `crates/globalplatform/src/secure_channel.rs`'s `TestMockTransport`.
#![cfg(test)]

use std::sync::Mutex;

use bytes::Bytes;
use cardmgr_apdu_core::{CardTransport, Error};

#[derive(Debug)]
pub(crate) struct MockTransport {
    responses: Mutex<Vec<Bytes>>,
    sent: Mutex<Vec<Bytes>>,
}

impl MockTransport {
    pub(crate) fn with_response(response: impl Into<Bytes>) -> Self {
        Self {
            responses: Mutex::new(vec![response.into()]),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_responses(responses: Vec<Bytes>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn sent(&self) -> Vec<Bytes> {
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
