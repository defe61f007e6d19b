use crate::constant::{
    BinaryWidth, CAPABILITIES_ALWAYS_DISABLED, CAPABILITIES_ALWAYS_ENABLED,
    CAPABILITIES_CONFIGURABLE, CapabilityFlags, ColumnType,
};

#[test]
fn capability_flags_classification() {
    const ALL_FLAGS: u32 = 0xFFFFFFFF;

    let always_enabled = CAPABILITIES_ALWAYS_ENABLED;
    let configurable = CAPABILITIES_CONFIGURABLE;
    let always_disabled = CAPABILITIES_ALWAYS_DISABLED;

    assert!(always_enabled.intersection(configurable).is_empty());
    assert!(always_enabled.intersection(always_disabled).is_empty());
    assert!(configurable.intersection(always_disabled).is_empty());

    let union = always_enabled | configurable | always_disabled;
    assert_eq!(
        union.bits(),
        ALL_FLAGS,
        "Missing flags: 0x{:08X}",
        ALL_FLAGS & !union.bits()
    );

    assert!(always_enabled.contains(CapabilityFlags::CLIENT_PROTOCOL_41));
    assert!(always_enabled.contains(CapabilityFlags::CLIENT_PLUGIN_AUTH));
    assert!(always_enabled.contains(CapabilityFlags::CLIENT_MULTI_RESULTS));
    // rows must end with a classic EOF frame
    assert!(always_disabled.contains(CapabilityFlags::CLIENT_DEPRECATE_EOF));
    assert!(always_disabled.contains(CapabilityFlags::CLIENT_INTERACTIVE));
}

#[test]
fn column_type_roundtrips_through_u8() {
    for byte in 0..=u8::MAX {
        if let Some(column_type) = ColumnType::from_u8(byte) {
            assert_eq!(column_type as u8, byte);
        }
    }
    assert_eq!(ColumnType::from_u8(0x15), None);
    assert_eq!(ColumnType::from_u8(0xf4), None);
}

#[test]
fn binary_widths() {
    assert_eq!(
        ColumnType::MYSQL_TYPE_LONGLONG.binary_width(),
        BinaryWidth::Fixed(8)
    );
    assert_eq!(
        ColumnType::MYSQL_TYPE_DOUBLE.binary_width(),
        BinaryWidth::Fixed(8)
    );
    assert_eq!(
        ColumnType::MYSQL_TYPE_INT24.binary_width(),
        BinaryWidth::Fixed(4)
    );
    assert_eq!(
        ColumnType::MYSQL_TYPE_FLOAT.binary_width(),
        BinaryWidth::Fixed(4)
    );
    assert_eq!(
        ColumnType::MYSQL_TYPE_YEAR.binary_width(),
        BinaryWidth::Fixed(2)
    );
    assert_eq!(
        ColumnType::MYSQL_TYPE_TINY.binary_width(),
        BinaryWidth::Fixed(1)
    );
    assert_eq!(
        ColumnType::MYSQL_TYPE_DATETIME.binary_width(),
        BinaryWidth::LengthEncoded
    );
    assert_eq!(
        ColumnType::MYSQL_TYPE_NEWDECIMAL.binary_width(),
        BinaryWidth::LengthEncoded
    );
    assert_eq!(
        ColumnType::MYSQL_TYPE_NULL.binary_width(),
        BinaryWidth::Absent
    );
}
