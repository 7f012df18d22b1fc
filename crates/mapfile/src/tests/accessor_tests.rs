use super::helpers::{file_path, open_with_content};
use crate::MapFileError;
use std::fs;

// -------------------- Typed reads --------------------

#[test]
fn read_original_file_content() {
    let (_dir, mf) = open_with_content(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);

    assert_eq!(mf.read_u8(0).unwrap(), 0x01);
    assert_eq!(mf.read_u8(7).unwrap(), 0x08);
    assert_eq!(mf.read_u16(0).unwrap(), 0x0201);
    assert_eq!(mf.read_u32(0).unwrap(), 0x0403_0201);
    assert_eq!(mf.read_u64(0).unwrap(), 0x0807_0605_0403_0201);
}

#[test]
fn reads_are_little_endian() {
    let (_dir, mf) = open_with_content(&[0x44, 0x33, 0x22, 0x11]);
    assert_eq!(mf.read_u32(0).unwrap(), 0x1122_3344);
}

#[test]
fn read_at_unaligned_offset() {
    let (_dir, mf) = open_with_content(&[0x00, 0xAA, 0xBB, 0xCC, 0xDD, 0x00]);
    assert_eq!(mf.read_u32(1).unwrap(), 0xDDCC_BBAA);
}

// -------------------- Read bounds --------------------

#[test]
fn read_past_end_is_out_of_range() {
    let (_dir, mf) = open_with_content(&[0u8; 10]);

    assert!(matches!(
        mf.read_u8(10),
        Err(MapFileError::OutOfRange { offset: 10, .. })
    ));
    // The full width must fit, not just the start offset.
    assert!(matches!(mf.read_u16(9), Err(MapFileError::OutOfRange { .. })));
    assert!(matches!(mf.read_u32(7), Err(MapFileError::OutOfRange { .. })));
    assert!(matches!(mf.read_u64(3), Err(MapFileError::OutOfRange { .. })));
}

#[test]
fn read_at_last_valid_offsets() {
    let (_dir, mf) = open_with_content(&[0xFFu8; 16]);

    assert_eq!(mf.read_u8(15).unwrap(), 0xFF);
    assert_eq!(mf.read_u16(14).unwrap(), 0xFFFF);
    assert_eq!(mf.read_u32(12).unwrap(), u32::MAX);
    assert_eq!(mf.read_u64(8).unwrap(), u64::MAX);
}

#[test]
fn huge_offset_does_not_wrap() {
    let (_dir, mf) = open_with_content(&[0u8; 10]);
    assert!(matches!(
        mf.read_u64(u64::MAX - 2),
        Err(MapFileError::OutOfRange { .. })
    ));
}

// -------------------- Typed writes --------------------

#[test]
fn write_then_read_roundtrip() {
    let (_dir, mf) = open_with_content(&[0u8; 32]);

    mf.write_u8(0, 0xAB).unwrap();
    mf.write_u16(2, 0xBEEF).unwrap();
    mf.write_u32(4, 0x1122_3344).unwrap();
    mf.write_u64(8, 0xDEAD_BEEF_CAFE_F00D).unwrap();

    assert_eq!(mf.read_u8(0).unwrap(), 0xAB);
    assert_eq!(mf.read_u16(2).unwrap(), 0xBEEF);
    assert_eq!(mf.read_u32(4).unwrap(), 0x1122_3344);
    assert_eq!(mf.read_u64(8).unwrap(), 0xDEAD_BEEF_CAFE_F00D);
}

#[test]
fn writes_reach_the_backing_file() {
    let (dir, mf) = open_with_content(&[0u8; 8]);
    mf.write_u32(4, 0x1122_3344).unwrap();
    mf.close().unwrap();

    let data = fs::read(file_path(&dir)).unwrap();
    assert_eq!(&data[4..8], &[0x44, 0x33, 0x22, 0x11]);
}

#[test]
fn write_bytes_overwrites_range() {
    let (_dir, mf) = open_with_content(&[0u8; 8]);
    mf.write_bytes(2, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

    assert_eq!(mf.read_u8(1).unwrap(), 0x00);
    assert_eq!(mf.read_u8(2).unwrap(), 0xDE);
    assert_eq!(mf.read_u8(5).unwrap(), 0xEF);
    assert_eq!(mf.read_u8(6).unwrap(), 0x00);
}

#[test]
fn write_past_end_is_out_of_range() {
    let (_dir, mf) = open_with_content(&[0u8; 10]);

    assert!(matches!(
        mf.write_u8(10, 0xFF),
        Err(MapFileError::OutOfRange { .. })
    ));
    assert!(matches!(
        mf.write_u32(8, 1),
        Err(MapFileError::OutOfRange { .. })
    ));
    assert!(matches!(
        mf.write_bytes(9, &[1, 2]),
        Err(MapFileError::OutOfRange { .. })
    ));
}

#[test]
fn writes_never_extend_the_file() {
    let (_dir, mf) = open_with_content(&[0u8; 10]);
    // Writing the last byte is fine; one past it must fail, and the length
    // must not change either way.
    mf.write_u8(9, 1).unwrap();
    assert!(mf.write_u8(10, 1).is_err());
    assert_eq!(mf.len().unwrap(), 10);
}

// -------------------- Views --------------------

#[test]
fn view_borrows_mapped_bytes() {
    let (_dir, mf) = open_with_content(&[1, 2, 3, 4, 5, 6]);

    let view = mf.as_view(2, 3).unwrap();
    assert_eq!(&*view, &[3, 4, 5]);
    assert_eq!(view.as_ref(), &[3, 4, 5]);
}

#[test]
fn view_range_is_validated() {
    let (_dir, mf) = open_with_content(&[0u8; 6]);
    assert!(matches!(
        mf.as_view(4, 3),
        Err(MapFileError::OutOfRange { .. })
    ));
}

#[test]
fn concurrent_views_coexist() {
    let (_dir, mf) = open_with_content(&[9u8; 6]);
    let a = mf.as_view(0, 2).unwrap();
    let b = mf.as_view(2, 4).unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 4);
}

// -------------------- to_vec --------------------

#[test]
fn to_vec_copies_mapped_content() {
    let (_dir, mf) = open_with_content(&[1, 2, 3, 4]);
    assert_eq!(mf.to_vec().unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn to_vec_includes_pending_bytes() {
    let (_dir, mf) = open_with_content(&[1, 2, 3, 4]);
    mf.append_bytes(&[5, 6]).unwrap();

    // Full logical content, even though the tail is not yet flushed.
    assert_eq!(mf.to_vec().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(mf.mapped_len().unwrap(), 4);
}

// -------------------- remove_range --------------------

#[test]
fn remove_range_is_unsupported() {
    let (_dir, mf) = open_with_content(&[0u8; 10]);
    assert!(matches!(
        mf.remove_range(0, 10),
        Err(MapFileError::Unsupported)
    ));
    assert!(matches!(
        mf.remove_range(3, 2),
        Err(MapFileError::Unsupported)
    ));
    // Nothing changed.
    assert_eq!(mf.len().unwrap(), 10);
}
