use crate::constant::{
    CapabilityFlags, ColumnType, CommandByte, FieldFlags, Refresh, StatusFlags, LONG_DATA_CHUNK,
    MAX_PACKET_SIZE, MAX_PAYLOAD_LEN,
};

#[test]
fn command_bytes_match_the_wire() {
    assert_eq!(CommandByte::Quit as u8, 0x01);
    assert_eq!(CommandByte::InitDb as u8, 0x02);
    assert_eq!(CommandByte::Query as u8, 0x03);
    assert_eq!(CommandByte::FieldList as u8, 0x04);
    assert_eq!(CommandByte::Ping as u8, 0x0e);
    assert_eq!(CommandByte::ChangeUser as u8, 0x11);
    assert_eq!(CommandByte::StmtPrepare as u8, 0x16);
    assert_eq!(CommandByte::StmtExecute as u8, 0x17);
    assert_eq!(CommandByte::StmtSendLongData as u8, 0x18);
    assert_eq!(CommandByte::StmtClose as u8, 0x19);
    assert_eq!(CommandByte::StmtReset as u8, 0x1a);
}

#[test]
fn capability_bits_match_the_wire() {
    assert_eq!(CapabilityFlags::LONG_PASSWORD.bits(), 0x0001);
    assert_eq!(CapabilityFlags::LONG_FLAG.bits(), 0x0004);
    assert_eq!(CapabilityFlags::CONNECT_WITH_DB.bits(), 0x0008);
    assert_eq!(CapabilityFlags::PROTOCOL_41.bits(), 0x0200);
    assert_eq!(CapabilityFlags::TRANSACTIONS.bits(), 0x2000);
    assert_eq!(CapabilityFlags::SECURE_CONN.bits(), 0x8000);
    assert_eq!(CapabilityFlags::MULTI_STATEMENTS.bits(), 0x0001_0000);
    assert_eq!(CapabilityFlags::MULTI_RESULTS.bits(), 0x0002_0000);
}

#[test]
fn status_and_field_flag_bits() {
    assert_eq!(StatusFlags::IN_TRANS.bits(), 0x0001);
    assert_eq!(StatusFlags::AUTOCOMMIT.bits(), 0x0002);
    assert_eq!(StatusFlags::MORE_RESULTS_EXISTS.bits(), 0x0008);
    assert_eq!(StatusFlags::NO_BACKSLASH_ESCAPES.bits(), 0x0200);

    assert_eq!(FieldFlags::NOT_NULL.bits(), 0x0001);
    assert_eq!(FieldFlags::PRI_KEY.bits(), 0x0002);
    assert_eq!(FieldFlags::UNSIGNED.bits(), 0x0020);
    assert_eq!(FieldFlags::AUTO_INCREMENT.bits(), 0x0200);
}

#[test]
fn column_type_codes_roundtrip() {
    let codes: &[u8] = &[
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
        0x0e, 0x0f, 0x10, 0xf6, 0xf7, 0xf8, 0xf9, 0xfa, 0xfb, 0xfc, 0xfd, 0xfe, 0xff,
    ];
    for &code in codes {
        let ty = ColumnType::from_u8(code).unwrap();
        assert_eq!(ty as u8, code);
    }
    // The gap between BIT and NEWDECIMAL is unassigned.
    assert!(ColumnType::from_u8(0x20).is_none());
    assert!(ColumnType::from_u8(0xf5).is_none());
}

#[test]
fn packet_limits() {
    assert_eq!(MAX_PAYLOAD_LEN, 0xFF_FFFF);
    assert_eq!(MAX_PACKET_SIZE, 1 << 24);
    assert_eq!(LONG_DATA_CHUNK, MAX_PAYLOAD_LEN - 13);
}

#[test]
fn refresh_bits() {
    assert_eq!(Refresh::GRANT.bits(), 0x01);
    assert_eq!(Refresh::LOG.bits(), 0x02);
    assert_eq!(Refresh::TABLES.bits(), 0x04);
    assert_eq!((Refresh::TABLES | Refresh::STATUS).bits(), 0x14);
}
