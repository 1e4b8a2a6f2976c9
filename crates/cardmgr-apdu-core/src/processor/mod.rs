//! Command processor pipeline: transformations applied to a [`Command`]
//! before it reaches the transport (secure messaging, response chaining).

pub mod secure;

use std::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::command::Command;
use crate::error::Error;
use crate::processor::secure::SecurityLevel;
use crate::response::{Response, StatusWord};
use crate::transport::CardTransport;

/// A stage in the command processing pipeline.
pub trait CommandProcessor: fmt::Debug + Send + Sync {
    /// Transform and send `command` through `transport`, returning the
    /// (possibly further transformed) response.
    fn process_command(
        &mut self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> Result<Response, Error> {
        trace!(?command, "processing command");
        let result = self.do_process_command(command, transport);
        match &result {
            Ok(response) => trace!(?response, "processed response"),
            Err(err) => debug!(?err, "command processing failed"),
        }
        result
    }

    /// Processor-specific implementation.
    fn do_process_command(
        &mut self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> Result<Response, Error>;

    /// Whether this processor is currently active and should be applied.
    fn is_active(&self) -> bool {
        true
    }

    /// Security level this processor applies. `SecurityLevel::NONE` unless
    /// overridden (secure channel processors report the level their
    /// established channel actually provides).
    fn security_level(&self) -> SecurityLevel {
        SecurityLevel::NONE
    }
}

/// No-op processor: serializes the command and transmits it unmodified.
#[derive(Debug, Clone, Default)]
pub struct IdentityProcessor;

impl CommandProcessor for IdentityProcessor {
    fn do_process_command(
        &mut self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> Result<Response, Error> {
        let raw = transport.transmit_raw(&command.to_bytes())?;
        Response::from_bytes(&raw)
    }
}

/// Automatically follows `61xx` "more data" status words with GET RESPONSE
/// (`00 C0 00 00 Le`), accumulating payload until a final status word.
#[derive(Debug, Clone)]
pub struct GetResponseProcessor {
    max_chains: usize,
}

impl GetResponseProcessor {
    /// Build a processor bounded to at most `max_chains` GET RESPONSE calls.
    pub const fn new(max_chains: usize) -> Self {
        Self { max_chains }
    }
}

impl Default for GetResponseProcessor {
    fn default() -> Self {
        Self::new(10)
    }
}

impl CommandProcessor for GetResponseProcessor {
    fn do_process_command(
        &mut self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> Result<Response, Error> {
        let raw = transport.transmit_raw(&command.to_bytes())?;
        let mut response = Response::from_bytes(&raw)?;
        let mut buffer = response.payload().to_vec();
        let mut chains = 0;

        while response.status().has_more_data() {
            if chains >= self.max_chains {
                return Err(Error::ChainLimitExceeded);
            }
            let get_response = Command::new_with_le(0x00, 0xC0, 0x00, 0x00, response.status().sw2);
            let raw = transport.transmit_raw(&get_response.to_bytes())?;
            response = Response::from_bytes(&raw)?;
            buffer.extend_from_slice(response.payload());
            chains += 1;
        }

        let mut full = buffer;
        let status = response.status();
        full.push(status.sw1);
        full.push(status.sw2);
        Response::from_bytes(&full)
    }
}

/// Pipeline of processors applied most-recently-added-first, mirroring the
/// teacher's `CardExecutor` processor stack.
#[derive(Debug, Default)]
pub struct ProcessorPipeline {
    processors: Vec<Box<dyn CommandProcessor>>,
}

impl ProcessorPipeline {
    /// Empty pipeline.
    pub const fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    /// Push a processor onto the stack.
    pub fn push(&mut self, processor: Box<dyn CommandProcessor>) {
        self.processors.push(processor);
    }

    /// Drop all processors.
    pub fn clear(&mut self) {
        self.processors.clear();
    }

    /// Run `command` through the most recently pushed active processor, or
    /// directly through `transport` if none are active.
    pub fn process(
        &mut self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> Result<Response, Error> {
        for processor in self.processors.iter_mut().rev() {
            if processor.is_active() {
                return processor.process_command(command, transport);
            }
        }
        let raw = transport.transmit_raw(&command.to_bytes())?;
        Response::from_bytes(&raw)
    }

    /// Security level of the topmost active processor, i.e. the level a
    /// command sent through [`ProcessorPipeline::process`] right now would
    /// actually get. `SecurityLevel::NONE` if no processor is active.
    pub fn security_level(&self) -> SecurityLevel {
        self.processors
            .iter()
            .rev()
            .find(|processor| processor.is_active())
            .map_or(SecurityLevel::NONE, |processor| processor.security_level())
    }
}

pub(crate) fn status_from_bytes(data: &[u8]) -> Option<StatusWord> {
    if data.len() < 2 {
        return None;
    }
    Some(StatusWord::new(data[data.len() - 2], data[data.len() - 1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use bytes::Bytes;

    #[test]
    fn identity_processor_passes_through() {
        let mut transport = MockTransport::with_response(Bytes::from_static(&[0x90, 0x00]));
        let mut processor = IdentityProcessor;
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);
        let resp = processor.process_command(&cmd, &mut transport).unwrap();
        assert!(resp.is_success());
    }

    #[test]
    fn get_response_follows_chain() {
        let mut transport = MockTransport::with_responses(vec![
            Bytes::from_static(&[0x61, 0x05]),
            Bytes::from_static(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x90, 0x00]),
        ]);
        let mut processor = GetResponseProcessor::default();
        let cmd = Command::new(0x00, 0xB0, 0x00, 0x00);
        let resp = processor.process_command(&cmd, &mut transport).unwrap();
        assert_eq!(resp.payload().as_ref(), &[0x01, 0x02, 0x03, 0x04, 0x05]);
        assert!(resp.is_success());
    }
}
