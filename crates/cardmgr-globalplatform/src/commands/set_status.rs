//! SET STATUS: life-cycle changes (lock/unlock/terminate, "CLFDB" in the
//! operator vocabulary this crate follows) and association changes
//! (extradition).

use bytes::{Bytes, BytesMut};
use cardmgr_apdu_core::{
    ApduCommand, ApduResponse, Command, Error as CoreError, Executor, Response, StatusWord,
};
use tracing::debug;

use crate::constants::{cla, ins, life_cycle, set_status_p1};
use crate::error::{Error, Result};

/// A CLFDB life-cycle operation: lock, unlock, or terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClfdbOperation {
    /// Transition to LOCKED.
    Lock,
    /// Transition back to SELECTABLE.
    Unlock,
    /// Transition to TERMINATED. Irreversible.
    Terminate,
}

impl ClfdbOperation {
    /// The life-cycle byte SET STATUS carries for this operation
    /// (spec.md §4.5's CLFDB mapping).
    pub const fn life_cycle_byte(self) -> u8 {
        match self {
            Self::Lock => life_cycle::LOCKED,
            Self::Unlock => life_cycle::SELECTABLE,
            Self::Terminate => life_cycle::TERMINATED,
        }
    }
}

/// Scope of the object a CLFDB operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClfdbScope {
    /// The card itself (Issuer Security Domain / card manager).
    Card,
    /// An application or Security Domain.
    Application,
}

impl ClfdbScope {
    const fn p1(self) -> u8 {
        match self {
            Self::Card => set_status_p1::CARD,
            Self::Application => set_status_p1::APPLICATION,
        }
    }
}

/// `SET STATUS` (CLA=0x80, INS=0xF0) performing a CLFDB life-cycle change on
/// `target_aid`.
#[derive(Debug, Clone)]
pub struct Clfdb {
    scope: ClfdbScope,
    target_aid: Bytes,
    operation: ClfdbOperation,
}

impl Clfdb {
    /// Build a CLFDB command against `target_aid` in `scope`.
    pub fn new(scope: ClfdbScope, target_aid: impl Into<Bytes>, operation: ClfdbOperation) -> Self {
        Self {
            scope,
            target_aid: target_aid.into(),
            operation,
        }
    }

    fn build_data(&self) -> Bytes {
        let mut data = BytesMut::with_capacity(self.target_aid.len());
        data.extend_from_slice(&self.target_aid);
        data.freeze()
    }
}

impl ApduCommand for Clfdb {
    type Success = SetStatusResponse;

    fn class(&self) -> u8 {
        cla::GP
    }

    fn instruction(&self) -> u8 {
        ins::SET_STATUS
    }

    fn p1(&self) -> u8 {
        self.scope.p1()
    }

    fn p2(&self) -> u8 {
        self.operation.life_cycle_byte()
    }

    fn data(&self) -> Option<&[u8]> {
        None
    }

    fn to_command(&self) -> Command {
        Command::new_with_data(self.class(), self.instruction(), self.p1(), self.p2(), self.build_data())
    }

    fn parse_response(&self, raw: Bytes) -> core::result::Result<Self::Success, CoreError> {
        SetStatusResponse::from_bytes(&raw)
    }
}

/// `SET STATUS` (P1=0x60) changing `object_aid`'s association to
/// `target_sd_aid` (extradition).
#[derive(Debug, Clone)]
pub struct Extradite {
    object_aid: Bytes,
    target_sd_aid: Bytes,
}

impl Extradite {
    /// Build an extradition command moving `object_aid` under
    /// `target_sd_aid`.
    pub fn new(object_aid: impl Into<Bytes>, target_sd_aid: impl Into<Bytes>) -> Self {
        Self {
            object_aid: object_aid.into(),
            target_sd_aid: target_sd_aid.into(),
        }
    }

    fn build_data(&self) -> Bytes {
        let mut data = BytesMut::new();
        data.extend_from_slice(&[self.object_aid.len() as u8]);
        data.extend_from_slice(&self.object_aid);
        data.extend_from_slice(&[self.target_sd_aid.len() as u8]);
        data.extend_from_slice(&self.target_sd_aid);
        data.freeze()
    }
}

impl ApduCommand for Extradite {
    type Success = SetStatusResponse;

    fn class(&self) -> u8 {
        cla::GP
    }

    fn instruction(&self) -> u8 {
        ins::SET_STATUS
    }

    fn p1(&self) -> u8 {
        set_status_p1::EXTRADITION
    }

    fn p2(&self) -> u8 {
        0x00
    }

    fn data(&self) -> Option<&[u8]> {
        None
    }

    fn to_command(&self) -> Command {
        Command::new_with_data(self.class(), self.instruction(), self.p1(), self.p2(), self.build_data())
    }

    fn parse_response(&self, raw: Bytes) -> core::result::Result<Self::Success, CoreError> {
        SetStatusResponse::from_bytes(&raw)
    }
}

/// Response shared by [`Clfdb`] and [`Extradite`].
#[derive(Debug, Clone, Copy)]
pub struct SetStatusResponse {
    status: StatusWord,
}

impl SetStatusResponse {
    /// `true` for a `9000` status word.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Status word returned by the card.
    pub const fn status(&self) -> StatusWord {
        self.status
    }
}

impl ApduResponse for SetStatusResponse {
    fn from_bytes(data: &[u8]) -> core::result::Result<Self, CoreError> {
        let response = Response::from_bytes(data)?;
        Ok(Self {
            status: response.status(),
        })
    }
}

/// Perform a CLFDB life-cycle transition on `target_aid` (spec.md §4.5's
/// `perform_clfdb`), raising on any non-`9000` status.
pub fn perform_clfdb<E: Executor>(
    executor: &mut E,
    scope: ClfdbScope,
    target_aid: impl Into<Bytes>,
    operation: ClfdbOperation,
) -> Result<()> {
    let target_aid = target_aid.into();
    debug!(
        aid = %hex::encode(&target_aid),
        ?scope,
        ?operation,
        "performing CLFDB transition"
    );
    let response = executor
        .execute(&Clfdb::new(scope, target_aid, operation))
        .map_err(Error::Apdu)?;
    if !response.is_success() {
        return Err(Error::UnexpectedStatus(response.status()));
    }
    Ok(())
}

/// Re-associate `object_aid` under `target_sd_aid` (spec.md §4.5's
/// `extradite`), raising on any non-`9000` status.
pub fn extradite<E: Executor>(
    executor: &mut E,
    object_aid: impl Into<Bytes>,
    target_sd_aid: impl Into<Bytes>,
) -> Result<()> {
    let object_aid = object_aid.into();
    let target_sd_aid = target_sd_aid.into();
    debug!(
        object = %hex::encode(&object_aid),
        target_sd = %hex::encode(&target_sd_aid),
        "extraditing object"
    );
    let response = executor
        .execute(&Extradite::new(object_aid, target_sd_aid))
        .map_err(Error::Apdu)?;
    if !response.is_success() {
        return Err(Error::UnexpectedStatus(response.status()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn encodes_lock() {
        let aid = hex!("A000000003000001");
        let cmd = Clfdb::new(ClfdbScope::Application, aid.to_vec(), ClfdbOperation::Lock);
        let raw = cmd.to_command().to_bytes();
        assert_eq!(raw.as_ref(), hex!("80F0408708A000000003000001"));
    }

    #[test]
    fn life_cycle_byte_mapping() {
        assert_eq!(ClfdbOperation::Lock.life_cycle_byte(), 0x87);
        assert_eq!(ClfdbOperation::Unlock.life_cycle_byte(), 0x07);
        assert_eq!(ClfdbOperation::Terminate.life_cycle_byte(), 0xFF);
    }

    #[test]
    fn encodes_extradition() {
        let object_aid = hex!("A000000003000001");
        let target_sd = hex!("A000000151000000");
        let cmd = Extradite::new(object_aid.to_vec(), target_sd.to_vec());
        let data = cmd.build_data();
        let mut expected = vec![0x08];
        expected.extend_from_slice(&object_aid);
        expected.push(0x08);
        expected.extend_from_slice(&target_sd);
        assert_eq!(data.as_ref(), expected.as_slice());
    }
}
