use super::*;

// ============================================================================
// Flexible vertex format
// ============================================================================

#[test]
fn test_fvf_position_only() {
    assert_eq!(Fvf(Fvf::XYZ).vertex_size(), 12);
    assert_eq!(Fvf(Fvf::XYZRHW).vertex_size(), 16);
    assert_eq!(Fvf(Fvf::XYZW).vertex_size(), 16);
}

#[test]
fn test_fvf_blend_weights() {
    assert_eq!(Fvf(Fvf::XYZB1).vertex_size(), 16);
    assert_eq!(Fvf(Fvf::XYZB3).vertex_size(), 24);
    assert_eq!(Fvf(Fvf::XYZB5).vertex_size(), 32);
}

#[test]
fn test_fvf_components() {
    let fvf = Fvf(Fvf::XYZ | Fvf::NORMAL | Fvf::DIFFUSE | Fvf::SPECULAR | Fvf::PSIZE);
    assert_eq!(fvf.vertex_size(), 12 + 12 + 4 + 4 + 4);
}

#[test]
fn test_fvf_texture_coordinates_default_to_two_floats() {
    let fvf = Fvf(Fvf::XYZ | Fvf::tex_count(2));
    assert_eq!(fvf.texture_count(), 2);
    assert_eq!(fvf.vertex_size(), 12 + 8 + 8);
}

#[test]
fn test_fvf_texture_coordinate_sizes() {
    let fvf = Fvf(
        Fvf::XYZ
            | Fvf::tex_count(4)
            | Fvf::tex_coord_size(0, 1)
            | Fvf::tex_coord_size(1, 2)
            | Fvf::tex_coord_size(2, 3)
            | Fvf::tex_coord_size(3, 4),
    );
    assert_eq!(fvf.vertex_size(), 12 + 4 + 8 + 12 + 16);
}

#[test]
fn test_fvf_empty_is_zero_sized() {
    assert_eq!(Fvf::default().vertex_size(), 0);
}

// ============================================================================
// Formats and flags
// ============================================================================

#[test]
fn test_buffer_format_codes() {
    for format in [BufferFormat::Unknown, BufferFormat::VertexData, BufferFormat::Index16, BufferFormat::Index32] {
        assert_eq!(BufferFormat::from_code(format.code()), format);
    }
    assert_eq!(BufferFormat::from_code(21), BufferFormat::Other(21));
    assert_eq!(BufferFormat::Other(21).code(), 21);
}

#[test]
fn test_buffer_format_index_size() {
    assert_eq!(BufferFormat::Index16.index_size(), Some(2));
    assert_eq!(BufferFormat::Index32.index_size(), Some(4));
    assert_eq!(BufferFormat::VertexData.index_size(), None);
}

#[test]
fn test_buffer_format_display() {
    assert_eq!(BufferFormat::Index16.to_string(), "INDEX16");
    assert_eq!(BufferFormat::Other(0x15).to_string(), "0x15");
}

#[test]
fn test_lock_flags_retain_unknown_bits() {
    let flags = LockFlags::from_bits_retain(LockFlags::DISCARD.bits() | 0x4000);
    assert!(flags.contains(LockFlags::DISCARD));
    assert_eq!(flags.unknown_bits(), 0x4000);
    assert_eq!(LockFlags::READONLY.unknown_bits(), 0);
}

#[test]
fn test_usage_values() {
    assert_eq!(Usage::WRITEONLY.bits(), 0x8);
    assert_eq!(Usage::DYNAMIC.bits(), 0x200);
    assert!((Usage::DYNAMIC | Usage::WRITEONLY).contains(Usage::DYNAMIC));
}
