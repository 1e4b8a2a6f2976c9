//! [`PcscTransport`]: a [`CardTransport`] backed by the `pcsc` crate.
//!
//! Grounded on `crates/pcsc/src/transport.rs`'s `PcscTransport` (connect,
//! transmit, reset, disconnect-on-drop), simplified to the single
//! `CardTransport` trait this workspace defines (no no_std/wasm split,
//! no transaction management — spec.md §4.3 only requires exclusive,
//! blocking `transmit`).

use std::ffi::CString;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use cardmgr_apdu_core::transport::CardTransport;
use cardmgr_apdu_core::Error as CoreError;
use pcsc::{Card, Context, Disposition, Protocols, ReaderState, Scope, ShareMode, State};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Live connection to one reader's logical channel, opened by
/// [`PcscCardManager::connect`].
pub struct PcscTransport {
    context: Context,
    card: Option<Card>,
    reader_name: String,
    atr: Vec<u8>,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader_name", &self.reader_name)
            .finish()
    }
}

impl PcscTransport {
    fn open(context: Context, reader_name: &str) -> Result<Self> {
        let reader_cstr =
            CString::new(reader_name).map_err(|_| Error::ReaderNotFound(reader_name.to_string()))?;

        let card = match context.connect(&reader_cstr, ShareMode::Shared, Protocols::ANY) {
            Ok(card) => card,
            Err(pcsc::Error::NoSmartcard) => return Err(Error::NoCard(reader_name.to_string())),
            Err(e) => return Err(e.into()),
        };

        let atr = card
            .get_attribute_owned(pcsc::Attribute::AtrString)
            .unwrap_or_default();

        debug!(reader = reader_name, atr = %hex::encode(&atr), "connected to card");

        Ok(Self {
            context,
            card: Some(card),
            reader_name: reader_name.to_string(),
            atr,
        })
    }

    fn card_mut(&mut self) -> Result<&mut Card> {
        self.card
            .as_mut()
            .ok_or_else(|| Error::NoCard(self.reader_name.clone()))
    }

    /// Answer-To-Reset of the connected card.
    pub fn atr(&self) -> &[u8] {
        &self.atr
    }

    /// Name of the reader this transport is bound to.
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }
}

impl CardTransport for PcscTransport {
    fn transmit_raw(&mut self, command: &[u8]) -> core::result::Result<Bytes, CoreError> {
        trace!(command = %hex::encode(command), "transmit");
        let mut response_buffer = [0u8; 258];
        let card = self.card_mut().map_err(CoreError::from)?;
        match card.transmit(command, &mut response_buffer) {
            Ok(response) => Ok(Bytes::copy_from_slice(response)),
            Err(e) => Err(Error::from(e).into()),
        }
    }

    fn reset(&mut self) -> core::result::Result<(), CoreError> {
        let card = self.card_mut().map_err(CoreError::from)?;
        card.reconnect(ShareMode::Shared, Protocols::ANY, Disposition::ResetCard)
            .map_err(|e| CoreError::from(Error::from(e)))
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        if let Some(card) = self.card.take() {
            let _ = card.disconnect(Disposition::LeaveCard);
        }
    }
}

/// Enumerates readers and opens [`PcscTransport`]s, matching spec.md §6's
/// `list_readers()` / `connect(reader_name, timeout_ms)` interface.
pub struct PcscCardManager {
    context: Context,
}

impl fmt::Debug for PcscCardManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscCardManager").finish()
    }
}

impl PcscCardManager {
    /// Establish a fresh PC/SC context scoped to the current user session.
    pub fn new() -> Result<Self> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// Names of all readers currently attached.
    pub fn list_readers(&self) -> Result<Vec<String>> {
        let readers = self.context.list_readers_owned()?;
        Ok(readers
            .into_iter()
            .map(|r| r.to_string_lossy().into_owned())
            .collect())
    }

    /// Connect to `reader_name`, blocking up to `timeout_ms` for a card to
    /// be inserted if one is not already present.
    pub fn connect(&self, reader_name: &str, timeout_ms: u64) -> Result<PcscTransport> {
        let reader_cstr =
            CString::new(reader_name).map_err(|_| Error::ReaderNotFound(reader_name.to_string()))?;

        let mut state = vec![ReaderState::new(reader_cstr.as_c_str(), State::UNAWARE)];
        let timeout = if timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(timeout_ms))
        };

        loop {
            self.context
                .get_status_change(timeout, &mut state)
                .map_err(|e| match e {
                    pcsc::Error::Timeout => Error::Timeout {
                        reader: reader_name.to_string(),
                        timeout_ms,
                    },
                    other => other.into(),
                })?;

            let event_state = state[0].event_state();
            if event_state.contains(State::PRESENT) && !event_state.contains(State::EMPTY) {
                return PcscTransport::open(self.context.clone(), reader_name);
            }
            if timeout.is_some() {
                return Err(Error::Timeout {
                    reader: reader_name.to_string(),
                    timeout_ms,
                });
            }
            state[0].sync_current_state();
        }
    }
}
