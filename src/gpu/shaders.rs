//! Embedded kernel sources (WGSL).

/// Entry point of [`FLIP_VERTICAL`].
pub const FLIP_VERTICAL_ENTRY: &str = "img_turn";

/// Workgroup size declared by [`FLIP_VERTICAL`].
pub const FLIP_VERTICAL_WORKGROUP: [u32; 2] = [8, 8];

/// Vertical flip: texel (x, y) of the input is stored at (x, h - 1 - y).
///
/// Texels are fetched with `textureLoad` at integer coordinates, so there is
/// no filtering and no out-of-range access. Work items past the image edge
/// return early; dispatch rounds up to whole workgroups.
pub const FLIP_VERTICAL: &str = r#"
@group(0) @binding(0) var input_image: texture_2d<u32>;
@group(0) @binding(1) var output_image: texture_storage_2d<rgba8uint, write>;

@compute @workgroup_size(8, 8)
fn img_turn(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(input_image);
    if (gid.x >= dims.x || gid.y >= dims.y) {
        return;
    }

    let p = textureLoad(input_image, vec2<u32>(gid.x, gid.y), 0);
    textureStore(output_image, vec2<u32>(gid.x, dims.y - gid.y - 1u), p);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_declares_entry_and_bindings() {
        assert!(FLIP_VERTICAL.contains(&format!("fn {}(", FLIP_VERTICAL_ENTRY)));
        assert!(FLIP_VERTICAL.contains("@binding(0)"));
        assert!(FLIP_VERTICAL.contains("@binding(1)"));
        assert!(FLIP_VERTICAL.contains("rgba8uint"));
        assert!(FLIP_VERTICAL.contains("@workgroup_size(8, 8)"));
    }
}
