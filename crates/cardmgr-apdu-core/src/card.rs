//! [`CardExecutor`]: combines a [`CardTransport`] with a processor pipeline
//! to execute typed [`ApduCommand`]s.

use std::fmt;

use bytes::Bytes;

use crate::command::{ApduCommand, Command};
use crate::error::{Error, Result};
use crate::processor::secure::{SecureChannel, SecureChannelProvider, SecurityLevel};
use crate::processor::{CommandProcessor, ProcessorPipeline};
use crate::response::Response;
use crate::transport::CardTransport;

/// Transmits raw and typed APDU commands, optionally through a processor
/// pipeline (GET RESPONSE chaining, secure channel wrapping).
pub trait Executor: fmt::Debug {
    /// Transmit raw command bytes and return the raw response.
    fn transmit(&mut self, command: &[u8]) -> Result<Bytes>;

    /// Execute a typed command, returning its parsed success response.
    fn execute<C: ApduCommand>(&mut self, command: &C) -> Result<C::Success> {
        let raw = self.transmit(&command.to_command().to_bytes())?;
        command.parse_response(raw)
    }

    /// Highest security level currently active.
    fn security_level(&self) -> SecurityLevel;

    /// Reset the transport and clear all processor state.
    fn reset(&mut self) -> Result<()>;
}

/// Combines a [`CardTransport`] with a [`ProcessorPipeline`].
#[derive(Debug)]
pub struct CardExecutor<T: CardTransport> {
    transport: T,
    pipeline: ProcessorPipeline,
    last_response: Option<Bytes>,
}

impl<T: CardTransport> CardExecutor<T> {
    /// Wrap `transport` with an empty processor pipeline.
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            pipeline: ProcessorPipeline::new(),
            last_response: None,
        }
    }

    /// Wrap `transport` with the standard GET RESPONSE chaining processor
    /// already installed.
    pub fn new_with_defaults(transport: T) -> Self {
        let mut executor = Self::new(transport);
        executor.add_processor(Box::new(crate::processor::GetResponseProcessor::default()));
        executor
    }

    /// Borrow the underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the executor, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Push a processor onto the pipeline (most recently added runs first).
    pub fn add_processor(&mut self, processor: Box<dyn CommandProcessor>) {
        self.pipeline.push(processor);
    }

    /// Last raw response received, if any.
    pub const fn last_response(&self) -> Option<&Bytes> {
        self.last_response.as_ref()
    }

    /// Run a secure channel handshake via `provider` and install the
    /// resulting channel as the active processor.
    pub fn open_secure_channel(&mut self, provider: &dyn SecureChannelProvider) -> Result<()> {
        let channel = provider.create_secure_channel(&mut self.transport)?;
        self.add_processor(channel);
        Ok(())
    }
}

impl<T: CardTransport> Executor for CardExecutor<T> {
    fn transmit(&mut self, command: &[u8]) -> Result<Bytes> {
        let command = Command::from_bytes(command)?;
        let response: Response = self.pipeline.process(&command, &mut self.transport)?;
        let raw: Bytes = {
            let mut buf = response.payload().to_vec();
            buf.push(response.status().sw1);
            buf.push(response.status().sw2);
            Bytes::from(buf)
        };
        self.last_response = Some(raw.clone());
        Ok(raw)
    }

    fn security_level(&self) -> SecurityLevel {
        self.pipeline.security_level()
    }

    fn reset(&mut self) -> Result<()> {
        self.transport.reset()?;
        self.pipeline.clear();
        self.last_response = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn transmits_through_empty_pipeline() {
        let transport = MockTransport::with_response(Bytes::from_static(&[0x90, 0x00]));
        let mut executor = CardExecutor::new(transport);
        let resp = executor.transmit(&[0x00, 0xA4, 0x04, 0x00]).unwrap();
        assert_eq!(resp.as_ref(), &[0x90, 0x00]);
    }
}
