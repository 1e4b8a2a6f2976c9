//! Exit code classification (spec.md §6): 0 success, 1 user error, 2
//! card/protocol error, 3 transport error.

use cardmgr_session::Error as SessionError;

/// Exit code a failed command should terminate the process with.
pub const USER_ERROR: i32 = 1;
/// Card/protocol error exit code.
pub const CARD_ERROR: i32 = 2;
/// Transport error exit code.
pub const TRANSPORT_ERROR: i32 = 3;

/// Classify a session-layer error into one of spec.md §6's exit codes.
pub fn classify(error: &SessionError) -> i32 {
    match error {
        SessionError::NotConnected
        | SessionError::NotAuthenticated
        | SessionError::InvalidHex(_)
        | SessionError::InvalidConfigValue { .. }
        | SessionError::ConfigIo(_)
        | SessionError::ConfigParse(_)
        | SessionError::Store(_) => USER_ERROR,

        SessionError::GlobalPlatform(_) | SessionError::SecureChannel(_) | SessionError::Crypto(_) | SessionError::Ota(_) => {
            CARD_ERROR
        }

        SessionError::Apdu(apdu_error) => classify_apdu(apdu_error),
        SessionError::Pcsc(_) => TRANSPORT_ERROR,
    }
}

fn classify_apdu(error: &cardmgr_apdu_core::Error) -> i32 {
    match error {
        cardmgr_apdu_core::Error::Transport(_) => TRANSPORT_ERROR,
        _ => CARD_ERROR,
    }
}
