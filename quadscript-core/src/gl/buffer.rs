use std::slice;

use glow::HasContext;

/// Overwrites the head of the bound buffer with `data` as raw bytes.
///
/// # Safety
/// `f32` is plain old data with no padding; viewing the slice as bytes is
/// sound for any length.
pub(super) fn buffer_sub_data_f32(gl: &glow::Context, target: u32, data: &[f32]) {
    unsafe {
        let bytes = slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data));
        gl.buffer_sub_data_u8_slice(target, 0, bytes);
    }
}
