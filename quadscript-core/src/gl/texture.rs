//! Script-loaded image textures and their handle arena.
//!
//! Handles handed to the script layer are generation-tagged: freeing a
//! slot bumps its generation, so a stale handle can never silently alias
//! a texture loaded later into the same slot. Double-free and
//! use-after-free become detected, cleanly rejected errors.

use glow::HasContext;

use crate::error::Error;

/// Generation-tagged reference to a loaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureHandle {
    index: u32,
    generation: u32,
}

impl TextureHandle {
    /// Packs the handle into the integer the script layer sees. The
    /// packed value is always positive; scripts may treat zero or nil as
    /// "no texture".
    #[must_use]
    pub fn to_bits(self) -> i64 {
        (i64::from(self.generation) << 32) | (i64::from(self.index) + 1)
    }

    /// Recovers a handle from its packed form. Zero and negative values
    /// are never valid.
    #[must_use]
    pub fn from_bits(bits: i64) -> Option<Self> {
        if bits <= 0 {
            return None;
        }
        let index = (bits & 0xFFFF_FFFF) as u32;
        if index == 0 {
            return None;
        }
        Some(Self {
            index: index - 1,
            generation: (bits >> 32) as u32,
        })
    }
}

/// Slot-reuse arena tracking liveness per generation.
///
/// Bookkeeping only — the renderer stores its GL textures in it, but the
/// arena itself never touches the GPU.
#[derive(Debug, Default)]
pub(crate) struct TextureArena<T> {
    slots: Vec<Slot<T>>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    entry: Option<T>,
}

impl<T> TextureArena<T> {
    pub(crate) fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Stores `value`, reusing the first free slot.
    pub(crate) fn insert(&mut self, value: T) -> TextureHandle {
        if let Some(index) = self.slots.iter().position(|slot| slot.entry.is_none()) {
            let slot = &mut self.slots[index];
            slot.entry = Some(value);
            TextureHandle {
                index: index as u32,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                entry: Some(value),
            });
            TextureHandle {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    /// The value behind `handle`, unless the handle has gone stale.
    pub(crate) fn get(&self, handle: TextureHandle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    /// Removes the value behind `handle`. The slot's generation bumps, so
    /// the handle (and any copy of it) is permanently stale afterwards.
    pub(crate) fn remove(&mut self, handle: TextureHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation || slot.entry.is_none() {
            return None;
        }
        slot.generation += 1;
        slot.entry.take()
    }

    /// Empties the arena, staling every outstanding handle.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.slots.iter_mut().filter_map(|slot| {
            if slot.entry.is_some() {
                slot.generation += 1;
            }
            slot.entry.take()
        })
    }
}

/// A script-loaded RGBA8 texture.
pub(crate) struct ImageTexture {
    pub(crate) texture: glow::Texture,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl ImageTexture {
    /// Uploads straight-alpha RGBA8 pixels with linear sampling and edge
    /// clamping.
    pub(crate) fn create(
        gl: &glow::Context,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Self, Error> {
        let texture = unsafe { gl.create_texture() }.map_err(Error::texture_creation_failed)?;
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
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
        Ok(Self {
            texture,
            width,
            height,
        })
    }

    pub(crate) fn delete(&self, gl: &glow::Context) {
        unsafe { gl.delete_texture(self.texture) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let mut arena: TextureArena<u32> = TextureArena::new();
        let handle = arena.insert(7);
        assert_eq!(arena.get(handle), Some(&7));
    }

    #[test]
    fn remove_stales_the_handle() {
        let mut arena: TextureArena<u32> = TextureArena::new();
        let handle = arena.insert(7);
        assert_eq!(arena.remove(handle), Some(7));
        assert_eq!(arena.get(handle), None);
        // double free is rejected, not UB
        assert_eq!(arena.remove(handle), None);
    }

    #[test]
    fn slot_reuse_does_not_resurrect_old_handles() {
        let mut arena: TextureArena<u32> = TextureArena::new();
        let first = arena.insert(1);
        arena.remove(first);

        let second = arena.insert(2);
        assert_ne!(first, second);
        assert_eq!(arena.get(first), None);
        assert_eq!(arena.get(second), Some(&2));
    }

    #[test]
    fn packed_bits_round_trip_and_stay_positive() {
        let mut arena: TextureArena<u32> = TextureArena::new();
        for value in 0..4 {
            let handle = arena.insert(value);
            let bits = handle.to_bits();
            assert!(bits > 0);
            assert_eq!(TextureHandle::from_bits(bits), Some(handle));
        }
    }

    #[test]
    fn invalid_bits_are_rejected() {
        assert_eq!(TextureHandle::from_bits(0), None);
        assert_eq!(TextureHandle::from_bits(-1), None);
        // generation bits set but zero index part
        assert_eq!(TextureHandle::from_bits(1 << 32), None);
    }

    #[test]
    fn drain_empties_and_stales() {
        let mut arena: TextureArena<u32> = TextureArena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let drained: Vec<_> = arena.drain().collect();
        assert_eq!(drained, vec![1, 2]);
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), None);
    }
}
