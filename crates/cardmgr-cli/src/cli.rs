//! Argument parsing: the command surface of spec.md §6, realized with
//! `clap` derive macros the way the teacher's CLI crates do.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line front end for cardmgr. Presentation only: every operation
/// below is a thin call into `cardmgr-session`/`cardmgr-store`.
#[derive(Parser, Debug)]
#[command(name = "cardmgr", version, about = "GlobalPlatform card management agent")]
pub struct Cli {
    /// Path to the SQLite store file (overrides config file and environment).
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Path to a TOML configuration file (see cardmgr-session::Config).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// PC/SC reader name; auto-detected by "first reader with a card" if omitted.
    #[arg(long, short, global = true)]
    pub reader: Option<String>,

    /// Emit debug-level logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Protocol argument mirroring `cardmgr_store::Protocol`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolArg {
    /// SCP02.
    Scp02,
    /// SCP03.
    Scp03,
}

/// CLFDB operation argument for the live `clfdb` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClfdbOperationArg {
    /// Lock (life-cycle byte 0x87).
    Lock,
    /// Unlock (life-cycle byte 0x07).
    Unlock,
    /// Terminate (life-cycle byte 0xFF). Irreversible.
    Terminate,
}

/// Scope of a `clfdb` target (GlobalPlatform SET STATUS P1).
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClfdbScopeArg {
    /// The card itself (Issuer Security Domain / card manager), P1=0x80.
    Card,
    /// An application or non-ISD Security Domain, P1=0x40.
    Application,
}

/// OTA CLFDB operation argument, including the OTA-only `MakeSelectable`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaOperationArg {
    /// LOCK.
    Lock,
    /// UNLOCK.
    Unlock,
    /// TERMINATE.
    Terminate,
    /// MAKE_SELECTABLE.
    MakeSelectable,
}

/// Security-domain kind to create.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdKindArg {
    /// Supplementary Security Domain.
    Ssd,
    /// Authorized Management Security Domain.
    Amsd,
    /// Delegated Management Security Domain.
    Dmsd,
}

/// OTA message status argument.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaStatusArg {
    /// PENDING.
    Pending,
    /// SENT.
    Sent,
    /// DELIVERED.
    Delivered,
    /// FAILED.
    Failed,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every PC/SC reader attached to this host.
    ListReaders,

    /// Connect to a reader and select the Card Manager, reporting the ATR
    /// and Card Data, then disconnect.
    Connect {
        /// Reader name (overrides the global `--reader`).
        reader: Option<String>,
    },

    /// Acknowledge that no card connection persists across CLI invocations.
    Disconnect,

    // --- Keyset store ---
    /// List keysets, optionally filtered.
    ListKeysets {
        /// Restrict to one value set.
        #[arg(long)]
        value_set: Option<String>,
        /// Restrict to one protocol.
        #[arg(long, value_enum)]
        protocol: Option<ProtocolArg>,
        /// Include soft-deleted keysets.
        #[arg(long)]
        include_inactive: bool,
    },

    /// Add a keyset to the store.
    AddKeyset {
        /// Keyset name, unique within `--value-set`.
        name: String,
        /// Value set grouping label.
        #[arg(long, default_value = "production")]
        value_set: String,
        /// Secure channel protocol.
        #[arg(long, value_enum)]
        protocol: ProtocolArg,
        /// ENC key, hex (32 or 48 hex characters).
        #[arg(long)]
        enc_key: String,
        /// MAC key, hex.
        #[arg(long)]
        mac_key: String,
        /// DEK key, hex.
        #[arg(long)]
        dek_key: String,
        /// Key version (0-255).
        #[arg(long, default_value_t = 0)]
        key_version: u8,
        /// Default security level (1, 2 or 3).
        #[arg(long, default_value_t = 1)]
        security_level: u8,
        /// Free-form description.
        #[arg(long)]
        description: Option<String>,
    },

    /// Soft-delete a keyset.
    DeleteKeyset {
        /// Keyset name.
        name: String,
        /// Value set the keyset belongs to.
        value_set: String,
    },

    /// Export every active keyset in a value set to a YAML file.
    ExportKeysets {
        /// Value set to export.
        value_set: String,
        /// Destination file.
        file: PathBuf,
    },

    /// Import keysets from a YAML file into a value set.
    ImportKeysets {
        /// Source file.
        file: PathBuf,
        /// Value set to import into.
        value_set: String,
    },

    /// List distinct active value set names.
    ListValueSets,

    // --- Secure channel ---
    /// Establish a secure channel using a stored keyset.
    EstablishSecureChannel {
        /// Keyset name.
        keyset: String,
        /// Value set the keyset belongs to.
        #[arg(long, default_value = "production")]
        value_set: String,
        /// Security level (1, 2 or 3); defaults to the keyset's own default.
        #[arg(long)]
        security_level: Option<u8>,
    },

    /// Tear down the active secure channel (re-selects the Card Manager).
    CloseSecureChannel,

    // --- GlobalPlatform ---
    /// List ordinary applications on the card.
    ListApplications {
        /// Keyset to authenticate with before listing.
        #[arg(long)]
        keyset: String,
        /// Value set the keyset belongs to.
        #[arg(long, default_value = "production")]
        value_set: String,
        /// Security level to request.
        #[arg(long)]
        security_level: Option<u8>,
    },

    /// List Security Domains on the card (ISD, SSDs, DMSDs).
    ListSecurityDomains {
        /// Keyset to authenticate with before listing.
        #[arg(long)]
        keyset: String,
        /// Value set the keyset belongs to.
        #[arg(long, default_value = "production")]
        value_set: String,
        /// Security level to request.
        #[arg(long)]
        security_level: Option<u8>,
    },

    /// Read reader/ATR/Card Data info. Does not require a secure channel.
    CardInfo,

    /// Alias for card-info plus whether a secure channel could be opened
    /// with the given keyset.
    Status {
        /// Keyset to probe authentication with, if any.
        #[arg(long)]
        keyset: Option<String>,
        /// Value set the keyset belongs to.
        #[arg(long, default_value = "production")]
        value_set: String,
    },

    /// Create a Security Domain on the card.
    CreateSecurityDomain {
        /// AID, hex (5-16 bytes).
        aid: String,
        /// Kind of Security Domain to create.
        #[arg(long, value_enum, default_value = "ssd")]
        r#type: SdKindArg,
        /// Explicit privileges byte, hex, overriding `--type`'s default.
        #[arg(long)]
        privileges: Option<String>,
        /// Keyset to authenticate with.
        #[arg(long)]
        keyset: String,
        /// Value set the keyset belongs to.
        #[arg(long, default_value = "production")]
        value_set: String,
        /// Security level to request.
        #[arg(long)]
        security_level: Option<u8>,
    },

    /// Perform a live CLFDB life-cycle transition on the connected card.
    Clfdb {
        /// Target AID, hex.
        aid: String,
        /// Operation to perform.
        #[arg(long, value_enum)]
        operation: ClfdbOperationArg,
        /// Scope of the target (card manager vs. application/SD).
        #[arg(long, value_enum, default_value = "application")]
        scope: ClfdbScopeArg,
        /// Keyset to authenticate with.
        #[arg(long)]
        keyset: String,
        /// Value set the keyset belongs to.
        #[arg(long, default_value = "production")]
        value_set: String,
        /// Security level to request.
        #[arg(long)]
        security_level: Option<u8>,
    },

    /// Re-associate an object under a new parent Security Domain.
    Extradite {
        /// Object AID, hex.
        object_aid: String,
        /// Target Security Domain AID, hex.
        target_sd_aid: String,
        /// Keyset to authenticate with.
        #[arg(long)]
        keyset: String,
        /// Value set the keyset belongs to.
        #[arg(long, default_value = "production")]
        value_set: String,
        /// Security level to request.
        #[arg(long)]
        security_level: Option<u8>,
    },

    // --- OTA ---
    /// Build and persist an OTA CLFDB envelope. Store-only, no card I/O.
    OtaClfdb {
        /// Target AID, hex.
        aid: String,
        /// Life-cycle operation to encode.
        operation: OtaOperationArg,
        /// OTA template name.
        #[arg(long)]
        template: String,
        /// Keyset whose keys secure the envelope.
        #[arg(long)]
        keyset: String,
        /// Value set the keyset belongs to.
        #[arg(long, default_value = "production")]
        value_set: String,
    },

    /// Build and persist an OTA envelope around a caller-supplied APDU.
    /// Store-only, no card I/O.
    OtaCustom {
        /// Target AID, hex.
        aid: String,
        /// Raw APDU bytes, hex.
        apdu_hex: String,
        /// OTA template name (supplies SPI/KIc/KID/TAR/counter).
        #[arg(long)]
        template: String,
        /// Keyset whose keys secure the envelope.
        #[arg(long)]
        keyset: String,
        /// Value set the keyset belongs to.
        #[arg(long, default_value = "production")]
        value_set: String,
    },

    /// List generated OTA messages.
    OtaList {
        /// Restrict to one delivery status.
        #[arg(long, value_enum)]
        status: Option<OtaStatusArg>,
        /// Restrict to one target AID, hex.
        #[arg(long)]
        target_aid: Option<String>,
    },

    /// List OTA templates.
    OtaTemplates {
        /// Restrict to one template type (e.g. "CLFDB").
        #[arg(long)]
        r#type: Option<String>,
    },
}
