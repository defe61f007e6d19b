use pretty_assertions::assert_eq;

use crate::Opts;
use crate::constant::CAPABILITIES_ALWAYS_ENABLED;
use crate::error::Error;
use crate::materialize::MaterializeOptions;

#[test]
fn default_opts() {
    let opts = Opts::default();
    assert_eq!(opts.capabilities, CAPABILITIES_ALWAYS_ENABLED);
    assert!(opts.db.is_none());
    assert!(opts.user.is_empty());
    assert!(opts.password.is_none());
    assert!(!opts.tls);
    assert!(opts.server_rsa_public_key_file.is_none());
    assert_eq!(opts.default_fetch_size, 0);
    assert!(opts.tiny_int1_is_bit);
    assert!(opts.year_is_date_type);
    assert_eq!(opts.session_time_offset_secs, 0);
    assert_eq!(opts.max_packet_size, 16 * 1024 * 1024);
    assert!(opts.init_command.is_none());
    assert!(opts.validate().is_ok());
}

#[test]
fn materialize_options_follow_opts() {
    let opts = Opts {
        tiny_int1_is_bit: false,
        session_time_offset_secs: -18_000,
        ..Default::default()
    };
    assert_eq!(
        opts.materialize_options(),
        MaterializeOptions {
            tiny_int1_is_bit: false,
            year_is_date_type: true,
            session_time_offset_secs: -18_000,
        }
    );
    assert_eq!(
        Opts::default().materialize_options(),
        MaterializeOptions::default()
    );
}

#[test]
fn invalid_opts() {
    let opts = Opts {
        max_packet_size: 0,
        ..Default::default()
    };
    assert!(matches!(opts.validate(), Err(Error::BadConfigError(_))));

    let opts = Opts {
        session_time_offset_secs: 15 * 3600,
        ..Default::default()
    };
    assert!(matches!(opts.validate(), Err(Error::BadConfigError(_))));
}
