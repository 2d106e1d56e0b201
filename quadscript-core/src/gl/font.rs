//! Font atlas construction and text layout.
//!
//! The 95 printable ASCII glyphs (32..=126) of the classic 8×8 bitmap
//! font are packed horizontally into a single-row 760×8 luminance
//! texture. The red channel carries glyph coverage and becomes alpha in
//! the text shader. Glyph rows run top to bottom; bit 0 of a row is the
//! leftmost pixel.

use font8x8::legacy::BASIC_LEGACY;
use glow::HasContext;

use crate::error::Error;

/// Glyph cell width in pixels.
pub(crate) const GLYPH_WIDTH: u32 = 8;
/// Glyph cell height in pixels.
pub(crate) const GLYPH_HEIGHT: u32 = 8;
/// Number of printable ASCII glyphs in the atlas.
pub(crate) const GLYPH_COUNT: u32 = 95;
/// Atlas width in pixels: all glyphs in one row.
pub(crate) const ATLAS_WIDTH: u32 = GLYPH_COUNT * GLYPH_WIDTH;
/// Atlas height in pixels.
pub(crate) const ATLAS_HEIGHT: u32 = GLYPH_HEIGHT;

const FIRST_GLYPH: char = ' ';
const LAST_GLYPH: char = '~';

/// Index of `c` in the atlas row, or `None` outside the printable range.
pub(crate) fn glyph_index(c: char) -> Option<u32> {
    (FIRST_GLYPH..=LAST_GLYPH)
        .contains(&c)
        .then(|| c as u32 - FIRST_GLYPH as u32)
}

/// Expands the glyph table into one byte per pixel, row-major over the
/// full atlas.
pub(crate) fn build_atlas_pixels() -> Vec<u8> {
    let mut pixels = vec![0u8; (ATLAS_WIDTH * ATLAS_HEIGHT) as usize];
    for index in 0..GLYPH_COUNT {
        let glyph = &BASIC_LEGACY[(index + FIRST_GLYPH as u32) as usize];
        for (y, row) in glyph.iter().enumerate() {
            for x in 0..GLYPH_WIDTH {
                if row >> x & 1 != 0 {
                    let tex_x = index * GLYPH_WIDTH + x;
                    pixels[(y as u32 * ATLAS_WIDTH + tex_x) as usize] = 255;
                }
            }
        }
    }
    pixels
}

/// One glyph's placement: pixel-space x of its left edge and the atlas u
/// range it samples. The atlas is a single row, so v always spans 0..1.
pub(crate) struct GlyphQuad {
    pub(crate) x: f32,
    pub(crate) u0: f32,
    pub(crate) u1: f32,
}

/// Lays out `text` left to right from `x`. The pen position is the
/// character's index over *all* characters of the string: out-of-range
/// characters yield no quad but still occupy a cell.
pub(crate) fn layout(x: f32, text: &str) -> impl Iterator<Item = GlyphQuad> + '_ {
    text.chars().enumerate().filter_map(move |(i, c)| {
        glyph_index(c).map(|index| GlyphQuad {
            x: x + (i as u32 * GLYPH_WIDTH) as f32,
            u0: (index * GLYPH_WIDTH) as f32 / ATLAS_WIDTH as f32,
            u1: ((index + 1) * GLYPH_WIDTH) as f32 / ATLAS_WIDTH as f32,
        })
    })
}

/// The font atlas texture.
pub(crate) struct FontAtlas {
    pub(crate) texture: glow::Texture,
}

impl FontAtlas {
    /// Uploads the expanded glyph table as an R8 texture with point
    /// sampling and edge clamping.
    pub(crate) fn create(gl: &glow::Context) -> Result<Self, Error> {
        let pixels = build_atlas_pixels();

        let texture = unsafe { gl.create_texture() }.map_err(Error::texture_creation_failed)?;
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::R8 as i32,
                ATLAS_WIDTH as i32,
                ATLAS_HEIGHT as i32,
                0,
                glow::RED,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(&pixels)),
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::NEAREST as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::NEAREST as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
        }

        log::info!("font atlas created ({ATLAS_WIDTH}x{ATLAS_HEIGHT})");
        Ok(Self { texture })
    }

    pub(crate) fn delete(&self, gl: &glow::Context) {
        unsafe { gl.delete_texture(self.texture) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_coverage(pixels: &[u8], index: u32) -> usize {
        let mut lit = 0;
        for y in 0..GLYPH_HEIGHT {
            for x in 0..GLYPH_WIDTH {
                let tex_x = index * GLYPH_WIDTH + x;
                if pixels[(y * ATLAS_WIDTH + tex_x) as usize] != 0 {
                    lit += 1;
                }
            }
        }
        lit
    }

    #[test]
    fn printable_range_maps_onto_atlas() {
        assert_eq!(glyph_index(' '), Some(0));
        assert_eq!(glyph_index('~'), Some(94));
        assert_eq!(glyph_index('A'), Some(33));
        assert_eq!(glyph_index('\t'), None);
        assert_eq!(glyph_index('\u{7f}'), None);
        assert_eq!(glyph_index('é'), None);
    }

    #[test]
    fn atlas_has_expected_dimensions() {
        let pixels = build_atlas_pixels();
        assert_eq!(pixels.len(), (760 * 8) as usize);
    }

    #[test]
    fn space_is_blank_and_letters_are_not() {
        let pixels = build_atlas_pixels();
        assert_eq!(cell_coverage(&pixels, 0), 0); // ' '
        assert!(cell_coverage(&pixels, 33) > 0); // 'A'
        assert!(cell_coverage(&pixels, 94) > 0); // '~'
    }

    #[test]
    fn layout_advances_by_character_index() {
        let quads: Vec<_> = layout(16.0, "ab").collect();
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].x, 16.0);
        assert_eq!(quads[1].x, 24.0);
    }

    #[test]
    fn layout_skips_unprintable_but_keeps_the_cell() {
        // The control character produces no quad, yet the following glyph
        // still lands in the third cell.
        let quads: Vec<_> = layout(0.0, "a\u{1}b").collect();
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].x, 0.0);
        assert_eq!(quads[1].x, 16.0);
    }

    #[test]
    fn layout_of_empty_text_is_empty() {
        assert_eq!(layout(0.0, "").count(), 0);
    }

    #[test]
    fn uv_ranges_stay_inside_the_atlas() {
        for quad in layout(0.0, " !Az~") {
            assert!(quad.u0 >= 0.0 && quad.u1 <= 1.0 && quad.u0 < quad.u1);
        }
    }
}
