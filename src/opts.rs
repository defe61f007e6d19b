use std::path::PathBuf;

use smart_default::SmartDefault;

use crate::constant::{CAPABILITIES_ALWAYS_ENABLED, CapabilityFlags};
use crate::error::{Error, Result};
use crate::materialize::MaterializeOptions;

/// A configuration for connection
///
/// ```rs
/// let opts = Opts {
///     user: "app".to_string(),
///     password: Some("secret".to_string()),
///     default_fetch_size: 100,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, SmartDefault)]
pub struct Opts {
    /// The client capabilities are `CAPABILITIES_ALWAYS_ENABLED | (opts.capabilities & CAPABILITIES_CONFIGURABLE)`.
    /// The final negotiated capabilities are `SERVER_CAPABILITIES & CLIENT_CAPABILITIES`.
    #[default(CAPABILITIES_ALWAYS_ENABLED)]
    pub capabilities: CapabilityFlags,

    /// Database name to use
    pub db: Option<String>,

    /// Username for authentication (can be empty for anonymous connections)
    pub user: String,

    pub password: Option<String>,

    /// The transport is already encrypted; passwords may be sent in clear
    pub tls: bool,

    /// PEM file holding the server RSA public key for sha256 password exchange.
    /// When unset the key is requested from the server.
    pub server_rsa_public_key_file: Option<PathBuf>,

    /// Rows fetched per batch by forward-only result sets; 0 reads the whole result
    pub default_fetch_size: usize,

    /// BIT(1) and TINYINT(1) read as booleans
    #[default = true]
    pub tiny_int1_is_bit: bool,

    /// YEAR read as a date
    #[default = true]
    pub year_is_date_type: bool,

    /// Session time zone offset from UTC in seconds
    pub session_time_offset_secs: i32,

    /// Announced in the handshake response
    #[default = 0x0100_0000]
    pub max_packet_size: u32,

    /// SQL command to execute after connection is established
    pub init_command: Option<String>,
}

impl Opts {
    pub fn materialize_options(&self) -> MaterializeOptions {
        MaterializeOptions {
            tiny_int1_is_bit: self.tiny_int1_is_bit,
            year_is_date_type: self.year_is_date_type,
            session_time_offset_secs: self.session_time_offset_secs,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_packet_size == 0 {
            return Err(Error::BadConfigError(
                "max_packet_size must be positive".to_string(),
            ));
        }
        // MySQL rejects offsets outside -13:59..+14:00
        if !(-14 * 3600..=14 * 3600).contains(&self.session_time_offset_secs) {
            return Err(Error::BadConfigError(format!(
                "session_time_offset_secs {} is outside -14h..+14h",
                self.session_time_offset_secs
            )));
        }
        Ok(())
    }
}
