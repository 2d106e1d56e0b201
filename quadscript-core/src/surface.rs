//! The seam between the script bridge and the graphics stack.
//!
//! Script-exposed functions draw through this trait rather than a
//! concrete renderer, so the bridge can be exercised end to end against a
//! recording implementation. The production implementation couples the
//! renderer with the content archive and always draws into the hardware
//! render viewport.

use crate::{error::Error, gl::geometry::Rgba, gl::texture::TextureHandle};

/// Drawing and asset operations available to scripts.
pub trait DrawSurface {
    /// Draws a filled quad.
    fn draw_quad(&mut self, x: f32, y: f32, w: f32, h: f32, rotation: f32, color: Rgba);

    /// Draws a caller-shaped quad from model-space `points` translated by
    /// `(x, y)`.
    fn draw_custom_quad(&mut self, points: &[[f32; 2]], x: f32, y: f32, rotation: f32, color: Rgba);

    /// Draws a loaded texture, modulated by `tint`.
    #[allow(clippy::too_many_arguments)]
    fn draw_texture(
        &mut self,
        handle: TextureHandle,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        rotation: f32,
        tint: Rgba,
    );

    /// Draws `text` with the built-in 8×8 font.
    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Rgba);

    /// Loads a named image asset; returns the handle and its dimensions.
    ///
    /// # Errors
    /// Fails when the asset is missing or does not decode.
    fn load_image(&mut self, name: &str) -> Result<(TextureHandle, u32, u32), Error>;

    /// Releases a loaded texture; returns whether anything was freed.
    fn free_texture(&mut self, handle: TextureHandle) -> bool;
}
