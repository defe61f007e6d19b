//! Connection establishment against a scripted server

mod common;

use pretty_assertions::assert_eq;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey};

use common::{Script, err, init_tracing, ok};
use zero_mysql_cursor::constant::{CapabilityFlags, ServerStatusFlags};
use zero_mysql_cursor::error::{Error, ErrorKind};
use zero_mysql_cursor::protocol::connection::RedirectionCache;
use zero_mysql_cursor::sync::Conn;
use zero_mysql_cursor::Opts;

const SEED: &[u8; 20] = b"abcdefghij0123456789";

fn initial_handshake(plugin: &str) -> Vec<u8> {
    let caps = CapabilityFlags::all().bits();
    let mut out = vec![10];
    out.extend_from_slice(b"8.4.0\0");
    out.extend_from_slice(&7u32.to_le_bytes());
    out.extend_from_slice(&SEED[..8]);
    out.push(0);
    out.extend_from_slice(&(caps as u16).to_le_bytes());
    out.push(45);
    out.extend_from_slice(&ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT.bits().to_le_bytes());
    out.extend_from_slice(&((caps >> 16) as u16).to_le_bytes());
    out.push(21);
    out.extend_from_slice(&[0; 10]);
    out.extend_from_slice(&SEED[8..]);
    out.push(0);
    out.extend_from_slice(plugin.as_bytes());
    out.push(0);
    out
}

fn ok_with_info(info: &str) -> Vec<u8> {
    let mut out = ok(0, 0, ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT);
    out.extend_from_slice(info.as_bytes());
    out
}

fn opts(password: &str) -> Opts {
    Opts {
        user: "app".to_string(),
        password: Some(password.to_string()),
        db: Some("shop".to_string()),
        ..Default::default()
    }
}

#[test]
fn connect_with_native_password() {
    init_tracing();
    let script = Script::new();
    script.push(initial_handshake("mysql_native_password"));
    script.push(ok_with_info(""));

    let conn = Conn::connect(script.transport(), &opts("secret")).unwrap();
    assert_eq!(conn.server_version(), "8.4.0");
    assert_eq!(conn.connection_id(), 7);
    assert!(conn.redirection().is_none());
    assert!(
        conn.status_flags()
            .contains(ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT)
    );
    assert!(
        conn.capability_flags()
            .contains(CapabilityFlags::CLIENT_CONNECT_WITH_DB)
    );

    let writes = script.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, 1);
}

#[test]
fn connect_runs_init_command() {
    let script = Script::new();
    script.push(initial_handshake("mysql_native_password"));
    script.push(ok_with_info(""));
    script.push(ok(0, 0, ServerStatusFlags::empty()));

    let conn = Conn::connect(
        script.transport(),
        &Opts {
            init_command: Some("SET NAMES utf8mb4".to_string()),
            ..opts("secret")
        },
    )
    .unwrap();
    assert_eq!(script.writes()[1], (0, b"\x03SET NAMES utf8mb4".to_vec()));
    assert_eq!(script.unread(), 0);
    drop(conn);
}

#[test]
fn connect_keeps_redirection_hint() {
    let script = Script::new();
    script.push(initial_handshake("mysql_native_password"));
    script.push(ok_with_info("Location: mariadb://replica.local:3310/user=ro"));

    let conn = Conn::connect(script.transport(), &opts("secret")).unwrap();
    let redirection = conn.redirection().unwrap();
    assert_eq!(redirection.host, "replica.local");
    assert_eq!(redirection.port, 3310);
    assert_eq!(redirection.user.as_deref(), Some("ro"));
    assert!(redirection.is_valid());
}

#[test]
fn redirection_hint_is_cached_by_the_caller() {
    let script = Script::new();
    script.push(initial_handshake("mysql_native_password"));
    script.push(ok_with_info("Location: mysql://[fd00::7]:3307/user=ro"));

    let conn = Conn::connect(script.transport(), &opts("secret")).unwrap();
    let mut cache = RedirectionCache::new(Some(8));
    assert!(cache.get("app", "primary.local", 3306).is_none());
    if let Some(hint) = conn.redirection() {
        cache.put("app", "primary.local", 3306, hint.clone());
    }

    let hint = cache.get("app", "primary.local", 3306).unwrap();
    assert_eq!(hint.host, "fd00::7");
    assert_eq!(hint.port, 3307);
    assert_eq!(hint.user.as_deref(), Some("ro"));
    assert!(cache.get("app", "replica.local", 3306).is_none());
}

#[test]
fn connect_rejects_bad_redirection_hint() {
    let script = Script::new();
    script.push(initial_handshake("mysql_native_password"));
    script.push(ok_with_info("Location: mysql://replica:notaport"));

    let err = Conn::connect(script.transport(), &opts("secret")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn caching_sha2_full_auth_with_server_key() {
    init_tracing();
    let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
    let pem = private
        .to_public_key()
        .to_public_key_pem(LineEnding::CRLF)
        .unwrap();
    let mut key_frame = vec![0x01];
    key_frame.extend_from_slice(pem.as_bytes());

    let script = Script::new();
    script.push(initial_handshake("caching_sha2_password"));
    script.push(vec![0x01, 0x04]);
    script.push(key_frame);
    script.push(ok_with_info(""));

    Conn::connect(script.transport(), &opts("secret")).unwrap();

    let writes = script.writes();
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[1], (3, vec![0x02]));
    let xored = private
        .decrypt(Oaep::new::<sha1::Sha1>(), &writes[2].1)
        .unwrap();
    let plain: Vec<u8> = xored
        .iter()
        .zip(SEED.iter().cycle())
        .map(|(x, s)| x ^ s)
        .collect();
    assert_eq!(plain, b"secret\0".to_vec());
}

#[test]
fn caching_sha2_fast_auth() {
    let script = Script::new();
    script.push(initial_handshake("caching_sha2_password"));
    script.push(vec![0x01, 0x03]);
    script.push(ok_with_info(""));

    Conn::connect(script.transport(), &opts("secret")).unwrap();
    assert_eq!(script.writes().len(), 1);
    assert_eq!(script.unread(), 0);
}

#[test]
fn key_request_answered_with_auth_switch() {
    let script = Script::new();
    script.push(initial_handshake("sha256_password"));
    script.push(vec![0xFE]);

    match Conn::connect(script.transport(), &opts("secret")) {
        Err(Error::AuthError(msg)) => {
            assert!(msg.contains("AuthSwitchRequest"), "{msg}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn access_denied() {
    let script = Script::new();
    script.push(initial_handshake("mysql_native_password"));
    script.push(err(1045, "28000", "Access denied for user 'app'"));

    let err = Conn::connect(script.transport(), &opts("wrong")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerReported);
    assert_eq!(err.error_code(), Some(1045));
    assert_eq!(err.sql_state(), Some("28000"));
}

#[test]
fn invalid_options_fail_before_io() {
    let script = Script::new();
    script.push(initial_handshake("mysql_native_password"));

    let err = Conn::connect(
        script.transport(),
        &Opts {
            max_packet_size: 0,
            ..opts("secret")
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(script.unread(), 1);
}
