//! Protocol-agnostic secure channel type implementing the `cardmgr-apdu-core`
//! processor and lifecycle traits, grounded on
//! `crates/globalplatform/src/secure_channel.rs`'s `GPSecureChannel`.

use cardmgr_apdu_core::processor::secure::{SecureChannel, SecurityLevel as CoreSecurityLevel};
use cardmgr_apdu_core::{CardTransport, Command, CommandProcessor, Response};

use crate::scp02_channel::Scp02Channel;
use crate::scp03_channel::Scp03Channel;

/// An established SCP02 or SCP03 channel, ready to be pushed onto a
/// [`cardmgr_apdu_core::processor::ProcessorPipeline`].
#[derive(Debug)]
pub enum SecureChannelSession {
    /// SCP02 channel.
    Scp02(Scp02Channel),
    /// SCP03 channel.
    Scp03(Scp03Channel),
}

impl CommandProcessor for SecureChannelSession {
    fn do_process_command(
        &mut self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> cardmgr_apdu_core::Result<Response> {
        match self {
            Self::Scp02(channel) => channel.process_command(command, transport),
            Self::Scp03(channel) => channel.process_command(command, transport),
        }
    }

    fn is_active(&self) -> bool {
        SecureChannel::is_established(self)
    }

    fn security_level(&self) -> CoreSecurityLevel {
        SecureChannel::security_level(self)
    }
}

impl SecureChannel for SecureChannelSession {
    fn is_established(&self) -> bool {
        match self {
            Self::Scp02(channel) => channel.is_established(),
            Self::Scp03(channel) => channel.is_established(),
        }
    }

    fn close(&mut self) -> cardmgr_apdu_core::Result<()> {
        match self {
            Self::Scp02(channel) => channel.close(),
            Self::Scp03(channel) => channel.close(),
        }
        Ok(())
    }

    fn reestablish(&mut self) -> cardmgr_apdu_core::Result<()> {
        // Re-running the handshake needs a transport handle this trait
        // doesn't carry; callers re-open via `SecureChannelProvider` instead.
        Err(cardmgr_apdu_core::Error::Processor(
            "reestablish a secure channel via SecureChannelProvider::create_secure_channel"
                .to_string(),
        ))
    }

    fn security_level(&self) -> CoreSecurityLevel {
        match self {
            Self::Scp02(channel) => channel.security_level().to_core(),
            Self::Scp03(channel) => channel.security_level().to_core(),
        }
    }
}
