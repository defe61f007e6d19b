use std::path::PathBuf;

use tracing::debug;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::Opts;
use crate::constant::{
    CAPABILITIES_ALWAYS_ENABLED, CAPABILITIES_CONFIGURABLE, CapabilityFlags, ServerStatusFlags,
};
use crate::error::{Error, Result};
use crate::protocol::connection::auth::{
    AuthStep, CACHING_SHA2_KEY_REQUEST, SHA256_PASSWORD_KEY_REQUEST, Sha256PasswordAuth,
    auth_caching_sha2_password, auth_mysql_native_password,
};
use crate::protocol::primitive::*;
use crate::protocol::response::{ErrPayloadBytes, OkPayload, OkPayloadBytes};

/// utf8mb4_general_ci
const CLIENT_CHARSET: u8 = 45;

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct HandshakeFixedFields {
    connection_id: U32LE,
    auth_data_part1: [u8; 8],
    filler: u8,
    capability_flags_lower: U16LE,
    charset: u8,
    status_flags: U16LE,
    capability_flags_upper: U16LE,
    auth_data_len: u8,
}

#[derive(Debug, Clone)]
pub struct InitialHandshake {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub auth_plugin_data: Vec<u8>,
    pub capability_flags: CapabilityFlags,
    pub charset: u8,
    pub status_flags: ServerStatusFlags,
    pub auth_plugin_name: String,
}

/// Read initial handshake packet from server
pub fn read_initial_handshake(payload: &[u8]) -> Result<InitialHandshake> {
    let (protocol_version, data) = read_int_1(payload)?;

    if protocol_version == 0xFF {
        return Err(ErrPayloadBytes(payload).into());
    }

    let (server_version, data) = read_string_null(data)?;

    let (fixed, rest) =
        HandshakeFixedFields::ref_from_prefix(data).map_err(|_| Error::InvalidPacket)?;

    let cap_bits = (u32::from(fixed.capability_flags_upper.get()) << 16)
        | u32::from(fixed.capability_flags_lower.get());
    let capability_flags = CapabilityFlags::from_bits_truncate(cap_bits);

    let (_reserved, data) = read_string_fix(rest, 10)?;

    let auth_data_2_len = usize::from(fixed.auth_data_len).saturating_sub(9).max(12);
    let (auth_data_2, data) = read_string_fix(data, auth_data_2_len)?;
    let (_reserved, data) = read_int_1(data)?;

    let mut auth_plugin_data = Vec::with_capacity(8 + auth_data_2.len());
    auth_plugin_data.extend_from_slice(&fixed.auth_data_part1);
    auth_plugin_data.extend_from_slice(auth_data_2);

    let auth_plugin_name = match read_string_null(data) {
        Ok((name, _rest)) => name,
        // some servers omit the terminating NUL
        Err(_) => data,
    };

    Ok(InitialHandshake {
        protocol_version,
        server_version: String::from_utf8_lossy(server_version).into_owned(),
        connection_id: fixed.connection_id.get(),
        auth_plugin_data,
        capability_flags,
        charset: fixed.charset,
        status_flags: ServerStatusFlags::from_bits_truncate(fixed.status_flags.get()),
        auth_plugin_name: String::from_utf8_lossy(auth_plugin_name).into_owned(),
    })
}

/// Handshake response packet sent by client (HandshakeResponse41)
#[derive(Debug, Clone)]
pub struct HandshakeResponse41<'a> {
    pub capability_flags: CapabilityFlags,
    pub max_packet_size: u32,
    pub charset: u8,
    pub username: &'a str,
    pub auth_response: &'a [u8],
    pub database: Option<&'a str>,
    pub auth_plugin_name: Option<&'a str>,
}

/// Write handshake response packet (HandshakeResponse41)
pub fn write_handshake_response(out: &mut Vec<u8>, response: &HandshakeResponse41<'_>) -> Result<()> {
    write_int_4(out, response.capability_flags.bits());
    write_int_4(out, response.max_packet_size);
    write_int_1(out, response.charset);
    // reserved
    out.extend_from_slice(&[0u8; 23]);
    write_string_null(out, response.username);

    if response
        .capability_flags
        .contains(CapabilityFlags::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA)
    {
        write_bytes_lenenc(out, response.auth_response);
    } else {
        let len = u8::try_from(response.auth_response.len()).map_err(|_| {
            Error::InvalidParameter("auth response longer than 255 bytes".to_string())
        })?;
        write_int_1(out, len);
        out.extend_from_slice(response.auth_response);
    }

    if let Some(db) = response.database
        && response
            .capability_flags
            .contains(CapabilityFlags::CLIENT_CONNECT_WITH_DB)
    {
        write_string_null(out, db);
    }

    if let Some(plugin) = response.auth_plugin_name
        && response
            .capability_flags
            .contains(CapabilityFlags::CLIENT_PLUGIN_AUTH)
    {
        write_string_null(out, plugin);
    }
    Ok(())
}

/// Auth switch request from server
#[derive(Debug, Clone)]
pub struct AuthSwitchRequest<'a> {
    pub plugin_name: &'a [u8],
    pub plugin_data: &'a [u8],
}

/// Read auth switch request (0xFE with length >= 9)
pub fn read_auth_switch_request(payload: &[u8]) -> Result<AuthSwitchRequest<'_>> {
    let (header, data) = read_int_1(payload)?;
    if header != 0xFE {
        return Err(Error::InvalidPacket);
    }

    let (plugin_name, data) = read_string_null(data)?;
    Ok(AuthSwitchRequest {
        plugin_name,
        plugin_data: data.strip_suffix(&[0]).unwrap_or(data),
    })
}

/// caching_sha2_password answer to the scrambled password (`0x01` + status)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachingSha2PasswordFastAuthResult {
    Success,
    FullAuthRequired,
}

/// Read the `0x01 0x03` / `0x01 0x04` frame of caching_sha2_password
pub fn read_caching_sha2_password_fast_auth_result(
    payload: &[u8],
) -> Result<CachingSha2PasswordFastAuthResult> {
    match payload {
        [0x01, 0x03] => Ok(CachingSha2PasswordFastAuthResult::Success),
        [0x01, 0x04] => Ok(CachingSha2PasswordFastAuthResult::FullAuthRequired),
        _ => Err(Error::InvalidPacket),
    }
}

/// Configuration for handshake
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    pub username: String,
    pub password: String,
    pub database: Option<String>,
    pub capabilities: CapabilityFlags,
    pub tls: bool,
    pub server_rsa_public_key_file: Option<PathBuf>,
    pub max_packet_size: u32,
}

impl From<&Opts> for HandshakeConfig {
    fn from(opts: &Opts) -> Self {
        Self {
            username: opts.user.clone(),
            password: opts.password.clone().unwrap_or_default(),
            database: opts.db.clone(),
            capabilities: opts.capabilities,
            tls: opts.tls,
            server_rsa_public_key_file: opts.server_rsa_public_key_file.clone(),
            max_packet_size: opts.max_packet_size,
        }
    }
}

/// Result of driving the handshake state machine
#[derive(Debug)]
pub enum HandshakeResult {
    /// Write this frame (next sequence id), then read the next frame
    Write(Vec<u8>),
    /// Read the next frame without writing
    Read,
    /// Handshake complete, connection established
    Connected {
        capability_flags: CapabilityFlags,
        initial_handshake: Box<InitialHandshake>,
        ok: OkPayload,
    },
}

#[derive(Debug)]
enum HandshakeState {
    /// Waiting for initial handshake from server
    Start,
    /// Sent an auth response computed by `plugin`, waiting for the result
    WaitingAuthResult { plugin: String, seed: Vec<u8> },
    /// Sent a key request, waiting for the server public key
    WaitingPublicKey { auth: Sha256PasswordAuth },
    /// Sent the final auth data, only OK or ERR may follow
    WaitingFinalAuthResult,
    Connected,
}

/// State machine for MySQL handshake
///
/// Pure parsing and packet generation without I/O. Feed every frame read
/// from the server to [`Handshake::drive`] and act on the result.
#[derive(Debug)]
pub struct Handshake {
    config: HandshakeConfig,
    state: HandshakeState,
    initial_handshake: Option<InitialHandshake>,
    capability_flags: CapabilityFlags,
}

impl Handshake {
    pub fn new(config: HandshakeConfig) -> Self {
        Self {
            config,
            state: HandshakeState::Start,
            initial_handshake: None,
            capability_flags: CapabilityFlags::empty(),
        }
    }

    /// Drive the state machine with the next payload
    #[tracing::instrument(skip_all)]
    pub fn drive(&mut self, payload: &[u8]) -> Result<HandshakeResult> {
        match std::mem::replace(&mut self.state, HandshakeState::Connected) {
            HandshakeState::Start => self.on_initial_handshake(payload),
            HandshakeState::WaitingAuthResult { plugin, seed } => {
                self.on_auth_result(payload, plugin, seed)
            }
            HandshakeState::WaitingPublicKey { auth } => {
                let cipher = auth.resume(payload)?;
                self.state = HandshakeState::WaitingFinalAuthResult;
                Ok(HandshakeResult::Write(cipher))
            }
            HandshakeState::WaitingFinalAuthResult => match payload.first() {
                Some(0x00) => self.connected(payload),
                Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
                _ => Err(Error::InvalidPacket),
            },
            HandshakeState::Connected => Err(Error::LibraryBug(crate::error::eyre!(
                "handshake driven after completion"
            ))),
        }
    }

    fn on_initial_handshake(&mut self, payload: &[u8]) -> Result<HandshakeResult> {
        let handshake = read_initial_handshake(payload)?;

        let mut client_caps =
            CAPABILITIES_ALWAYS_ENABLED | (self.config.capabilities & CAPABILITIES_CONFIGURABLE);
        if self.config.database.is_some() {
            client_caps |= CapabilityFlags::CLIENT_CONNECT_WITH_DB;
        }
        // the channel is secured outside the protocol; never request an upgrade
        client_caps -= CapabilityFlags::CLIENT_SSL;
        self.capability_flags = client_caps & handshake.capability_flags;
        debug!(
            server_version = %handshake.server_version,
            plugin = %handshake.auth_plugin_name,
            connection_id = handshake.connection_id,
            "initial handshake"
        );

        let plugin = handshake.auth_plugin_name.clone();
        let seed = handshake.auth_plugin_data.clone();
        let auth_response = self.plugin_response(&plugin, &seed)?;

        let mut out = Vec::new();
        write_handshake_response(
            &mut out,
            &HandshakeResponse41 {
                capability_flags: self.capability_flags,
                max_packet_size: self.config.max_packet_size,
                charset: CLIENT_CHARSET,
                username: &self.config.username,
                auth_response: &auth_response,
                database: self.config.database.as_deref(),
                auth_plugin_name: Some(plugin.as_str()),
            },
        )?;
        self.initial_handshake = Some(handshake);
        Ok(HandshakeResult::Write(out))
    }

    /// First auth data for `plugin`, and the state that follows sending it
    fn plugin_response(&mut self, plugin: &str, seed: &[u8]) -> Result<Vec<u8>> {
        let password = &self.config.password;
        let (response, next) = match plugin {
            "mysql_native_password" => (
                auth_mysql_native_password(password, seed).to_vec(),
                self.waiting_auth_result(plugin, seed),
            ),
            "caching_sha2_password" => (
                auth_caching_sha2_password(password, seed).to_vec(),
                self.waiting_auth_result(plugin, seed),
            ),
            "sha256_password" => {
                let auth = self.sha256_auth(seed, SHA256_PASSWORD_KEY_REQUEST);
                match auth.start()? {
                    AuthStep::Send(data) => (data, self.waiting_auth_result(plugin, seed)),
                    AuthStep::SendAndRead(data) => (data, HandshakeState::WaitingPublicKey { auth }),
                }
            }
            plugin => return Err(Error::UnsupportedAuthPlugin(plugin.to_string())),
        };
        self.state = next;
        Ok(response)
    }

    fn waiting_auth_result(&self, plugin: &str, seed: &[u8]) -> HandshakeState {
        HandshakeState::WaitingAuthResult {
            plugin: plugin.to_string(),
            seed: seed.to_vec(),
        }
    }

    fn sha256_auth(&self, seed: &[u8], key_request: u8) -> Sha256PasswordAuth {
        Sha256PasswordAuth::new(
            self.config.password.clone(),
            seed,
            self.config.tls,
            self.config.server_rsa_public_key_file.clone(),
            key_request,
        )
    }

    fn on_auth_result(
        &mut self,
        payload: &[u8],
        plugin: String,
        seed: Vec<u8>,
    ) -> Result<HandshakeResult> {
        match payload.first() {
            Some(0x00) => self.connected(payload),
            Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
            Some(0xFE) => {
                let switch = read_auth_switch_request(payload)?;
                let plugin = String::from_utf8_lossy(switch.plugin_name).into_owned();
                debug!(%plugin, "auth switch");
                let response = self.plugin_response(&plugin, switch.plugin_data)?;
                Ok(HandshakeResult::Write(response))
            }
            Some(0x01) if plugin == "caching_sha2_password" => {
                match read_caching_sha2_password_fast_auth_result(payload)? {
                    CachingSha2PasswordFastAuthResult::Success => {
                        self.state = HandshakeState::WaitingFinalAuthResult;
                        Ok(HandshakeResult::Read)
                    }
                    CachingSha2PasswordFastAuthResult::FullAuthRequired => {
                        debug!("caching_sha2_password full authentication");
                        let auth = self.sha256_auth(&seed, CACHING_SHA2_KEY_REQUEST);
                        match auth.start()? {
                            AuthStep::Send(data) => {
                                self.state = HandshakeState::WaitingFinalAuthResult;
                                Ok(HandshakeResult::Write(data))
                            }
                            AuthStep::SendAndRead(data) => {
                                self.state = HandshakeState::WaitingPublicKey { auth };
                                Ok(HandshakeResult::Write(data))
                            }
                        }
                    }
                }
            }
            _ => Err(Error::InvalidPacket),
        }
    }

    fn connected(&mut self, payload: &[u8]) -> Result<HandshakeResult> {
        let ok = OkPayload::try_from(OkPayloadBytes(payload))?;
        let initial_handshake = self.initial_handshake.take().ok_or_else(|| {
            Error::LibraryBug(crate::error::eyre!("connected before initial handshake"))
        })?;
        self.state = HandshakeState::Connected;
        Ok(HandshakeResult::Connected {
            capability_flags: self.capability_flags,
            initial_handshake: Box::new(initial_handshake),
            ok,
        })
    }
}
