pub mod auth;
mod handshake;
pub mod redirect;

pub use auth::{AuthStep, Sha256PasswordAuth};
pub use handshake::{
    AuthSwitchRequest, CachingSha2PasswordFastAuthResult, Handshake, HandshakeConfig,
    HandshakeResponse41, HandshakeResult, InitialHandshake, read_auth_switch_request,
    read_caching_sha2_password_fast_auth_result, read_initial_handshake, write_handshake_response,
};
pub use redirect::{RedirectionCache, RedirectionInfo};
