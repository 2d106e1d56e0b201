//! The render state manager.
//!
//! Owns every GPU object — programs, the shared dynamic vertex buffer,
//! one vertex layout per program, the font atlas, and script-loaded
//! textures — and exposes the draw primitives the script bridge and the
//! host adapter call into.
//!
//! Lifecycle is a two-state machine: `Uninitialized → Initialized →
//! Uninitialized`. Initializing twice is a logged no-op returning
//! success; deinit is idempotent. Draw calls while uninitialized are
//! silent no-ops, because transient per-frame calls may race host
//! context teardown.

use std::num::NonZeroU32;

use glow::HasContext;

use crate::{
    error::Error,
    gl::{
        buffer::buffer_sub_data_f32,
        font::{self, FontAtlas, GLYPH_HEIGHT, GLYPH_WIDTH},
        geometry::{self, Rgba, Viewport},
        program::ShaderProgram,
        texture::{ImageTexture, TextureArena, TextureHandle},
    },
    host::{GetFramebufferFn, GetProcAddressFn},
};

/// Hardware render target width in pixels.
pub const RENDER_WIDTH: u32 = 512;
/// Hardware render target height in pixels.
pub const RENDER_HEIGHT: u32 = 512;

/// Capacity of the shared vertex buffer: the largest single draw call is
/// a quad of up to 6 vertices carrying up to 4 floats each.
const VERTEX_BUFFER_FLOATS: usize = 6 * 4;

const SOLID_VERT: &str = include_str!("../shaders/solid.vert");
const SOLID_FRAG: &str = include_str!("../shaders/solid.frag");
const QUAD_VERT: &str = include_str!("../shaders/quad.vert");
const TEXT_FRAG: &str = include_str!("../shaders/text.frag");
const IMAGE_FRAG: &str = include_str!("../shaders/image.frag");

/// Full-texture UV rectangle in strip order.
const UV_FULL: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

/// The render state manager. See the module docs for the lifecycle.
pub struct Renderer {
    gpu: Option<GpuResources>,
    /// Sticky framebuffer fallback: once the host accessor yields an
    /// unusable target, the default framebuffer is used without
    /// re-querying. Survives context resets.
    use_default_fbo: bool,
    get_current_framebuffer: Option<GetFramebufferFn>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// An uninitialized renderer; call [`Renderer::init`] once the host
    /// GL context exists.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gpu: None,
            use_default_fbo: false,
            get_current_framebuffer: None,
        }
    }

    /// Installs (or clears) the host's per-frame framebuffer accessor.
    pub fn set_framebuffer_accessor(&mut self, accessor: Option<GetFramebufferFn>) {
        self.get_current_framebuffer = accessor;
    }

    /// Whether the GPU pipeline is live.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Runs the gated initialization sequence: resolve GL functions,
    /// verify the feature level, build programs, atlas, buffer and
    /// layouts, then set global blend/depth/cull state. A second call
    /// while initialized logs and returns success. On failure no partial
    /// state survives.
    ///
    /// # Errors
    /// Fails when the loader is absent, the context is below GL 3.3
    /// core, or any GPU object cannot be created.
    pub fn init(&mut self, loader: Option<&GetProcAddressFn>) -> Result<(), Error> {
        if self.gpu.is_some() {
            log::info!("renderer already initialized, skipping");
            return Ok(());
        }

        let Some(loader) = loader else {
            log::error!("no GL function loader provided, cannot initialize renderer");
            return Err(Error::gl_loader_missing());
        };

        let gl = unsafe { glow::Context::from_loader_function(|symbol| loader(symbol)) };

        let version = gl.version();
        log::info!(
            "OpenGL version: {}.{} ({})",
            version.major,
            version.minor,
            version.vendor_info
        );
        if version.is_embedded || (version.major, version.minor) < (3, 3) {
            let err = Error::gl_version_unsupported(version.major, version.minor);
            log::error!("{err}");
            return Err(err);
        }

        match GpuResources::create(gl) {
            Ok(gpu) => {
                self.gpu = Some(gpu);
                log::info!("renderer initialized");
                Ok(())
            },
            Err(err) => {
                log::error!("renderer initialization failed: {err}");
                Err(err)
            },
        }
    }

    /// Releases every GPU object. Idempotent.
    pub fn deinit(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            gpu.delete();
            log::info!("renderer deinitialized");
        }
    }

    /// Binds the frame's render target. Falls back to the default
    /// framebuffer when the accessor is absent, returns a zero handle, or
    /// the bound target fails the completeness check; the fallback is
    /// sticky across frames. Returns whether a non-default target is
    /// bound.
    pub fn bind_target_framebuffer(&mut self) -> bool {
        let Some(gpu) = self.gpu.as_ref() else {
            return false;
        };
        let gl = &gpu.gl;

        if !self.use_default_fbo
            && let Some(accessor) = self.get_current_framebuffer.as_ref()
        {
            let raw = accessor();
            if let Some(fbo) = NonZeroU32::new(raw).map(glow::NativeFramebuffer) {
                unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo)) };
                let status = unsafe { gl.check_framebuffer_status(glow::FRAMEBUFFER) };
                if status == glow::FRAMEBUFFER_COMPLETE {
                    return true;
                }
                log::warn!(
                    "framebuffer {raw} incomplete (status 0x{status:x}), \
                     falling back to default framebuffer"
                );
                self.use_default_fbo = true;
            } else {
                log::warn!("host framebuffer accessor returned 0, falling back to default");
                self.use_default_fbo = true;
            }
        }

        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
        false
    }

    /// Rebinds the default framebuffer at the end of the frame.
    pub fn unbind_framebuffer(&self) {
        if let Some(gpu) = &self.gpu {
            unsafe { gpu.gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
        }
    }

    /// Re-asserts the hardware render viewport when something changed it.
    pub fn ensure_viewport(&self) {
        let Some(gpu) = &self.gpu else { return };
        let gl = &gpu.gl;

        let mut viewport = [0i32; 4];
        unsafe { gl.get_parameter_i32_slice(glow::VIEWPORT, &mut viewport) };
        if viewport[2] != RENDER_WIDTH as i32 || viewport[3] != RENDER_HEIGHT as i32 {
            unsafe { gl.viewport(0, 0, RENDER_WIDTH as i32, RENDER_HEIGHT as i32) };
            log::info!("viewport set to {RENDER_WIDTH}x{RENDER_HEIGHT}");
        }
    }

    /// Clears the bound target to opaque black.
    pub fn clear(&self) {
        if let Some(gpu) = &self.gpu {
            unsafe {
                gpu.gl.clear_color(0.0, 0.0, 0.0, 1.0);
                gpu.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            }
        }
    }

    /// Drains the GL error queue into the log, tagged with `context`.
    pub fn check_error(&self, context: &str) {
        let Some(gpu) = &self.gpu else { return };
        loop {
            let err = unsafe { gpu.gl.get_error() };
            if err == glow::NO_ERROR {
                break;
            }
            log::error!("OpenGL error in {context}: 0x{err:x}");
        }
    }

    /// Draws a filled quad: translate to the quad center, rotate by
    /// `rotation` degrees, project orthographically over `viewport`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_solid_quad(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        rotation: f32,
        color: Rgba,
        viewport: Viewport,
    ) {
        let Some(gpu) = self.gpu.as_ref() else { return };
        let corners = geometry::axis_quad_corners(w, h);
        let ndc = geometry::transform_to_ndc(corners, x + w * 0.5, y + h * 0.5, rotation, viewport);
        gpu.draw_positions(&ndc, color);
    }

    /// Draws a caller-shaped quad: `points` are model-space positions
    /// rotated about the model origin and translated by `(x, y)`.
    /// Requires exactly 4 points, triangulated as (0,1,2) and (1,2,3);
    /// any other count logs and draws nothing.
    pub fn draw_custom_quad(
        &mut self,
        points: &[[f32; 2]],
        x: f32,
        y: f32,
        rotation: f32,
        color: Rgba,
        viewport: Viewport,
    ) {
        let Some(gpu) = self.gpu.as_ref() else { return };
        let Ok(corners) = <[[f32; 2]; 4]>::try_from(points) else {
            log::error!(
                "draw_custom_quad requires exactly 4 points, got {}",
                points.len()
            );
            return;
        };
        let ndc = geometry::transform_to_ndc(corners, x, y, rotation, viewport);
        gpu.draw_positions(&ndc, color);
    }

    /// Draws a loaded texture through the same transform pipeline as the
    /// solid quad, modulated by `tint`. Stale handles are rejected.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_texture(
        &mut self,
        handle: TextureHandle,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        rotation: f32,
        tint: Rgba,
        viewport: Viewport,
    ) {
        let Some(gpu) = self.gpu.as_ref() else { return };
        let Some(texture) = gpu.textures.get(handle) else {
            log::warn!("draw_texture: stale or unknown texture handle");
            return;
        };
        let corners = geometry::axis_quad_corners(w, h);
        let ndc = geometry::transform_to_ndc(corners, x + w * 0.5, y + h * 0.5, rotation, viewport);
        gpu.draw_textured(&gpu.image, texture.texture, &ndc, &UV_FULL, tint);
    }

    /// Draws `text` with the 8×8 font, one quad per printable character.
    /// Characters outside 32..=126 produce no quad but still advance the
    /// pen by their index, leaving an empty cell.
    pub fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Rgba, viewport: Viewport) {
        let Some(gpu) = self.gpu.as_ref() else { return };
        gpu.draw_text(x, y, text, color, viewport);
    }

    /// Decodes `bytes` and uploads an RGBA8 texture; returns the handle
    /// and the source dimensions.
    ///
    /// # Errors
    /// Fails when the renderer is uninitialized, the bytes do not decode
    /// as an image, or the GL texture cannot be created.
    pub fn load_image(
        &mut self,
        name: &str,
        bytes: &[u8],
    ) -> Result<(TextureHandle, u32, u32), Error> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Err(Error::renderer_uninitialized());
        };

        let decoded = image::load_from_memory(bytes)
            .map_err(|err| Error::image_decode_failed(name, err))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        let texture = ImageTexture::create(&gpu.gl, width, height, rgba.as_raw())?;
        let handle = gpu.textures.insert(texture);
        log::info!("loaded image '{name}' ({width}x{height})");
        Ok((handle, width, height))
    }

    /// Releases the texture behind `handle`. A stale or double-freed
    /// handle is rejected and logged; returns whether a texture was
    /// actually freed.
    pub fn free_texture(&mut self, handle: TextureHandle) -> bool {
        let Some(gpu) = self.gpu.as_mut() else {
            return false;
        };
        match gpu.textures.remove(handle) {
            Some(texture) => {
                texture.delete(&gpu.gl);
                true
            },
            None => {
                log::warn!("free_texture: stale or unknown texture handle");
                false
            },
        }
    }
}

/// GPU objects owned by an initialized renderer. Recreated from scratch
/// whenever the host recreates its GL context.
struct GpuResources {
    gl: glow::Context,
    solid: ShaderProgram,
    text: ShaderProgram,
    image: ShaderProgram,
    font: FontAtlas,
    vbo: glow::Buffer,
    vao_solid: glow::VertexArray,
    vao_textured: glow::VertexArray,
    textures: TextureArena<ImageTexture>,
}

impl GpuResources {
    /// Builds every GPU object in dependency order. Objects created
    /// before a failing step are deleted before returning.
    fn create(gl: glow::Context) -> Result<Self, Error> {
        let solid = ShaderProgram::create(&gl, SOLID_VERT, SOLID_FRAG, "solid")?;

        let text = match ShaderProgram::create(&gl, QUAD_VERT, TEXT_FRAG, "text") {
            Ok(program) => program,
            Err(err) => {
                solid.delete(&gl);
                return Err(err);
            },
        };
        let image = match ShaderProgram::create(&gl, QUAD_VERT, IMAGE_FRAG, "image") {
            Ok(program) => program,
            Err(err) => {
                text.delete(&gl);
                solid.delete(&gl);
                return Err(err);
            },
        };
        let font = match FontAtlas::create(&gl) {
            Ok(font) => font,
            Err(err) => {
                image.delete(&gl);
                text.delete(&gl);
                solid.delete(&gl);
                return Err(err);
            },
        };
        let (vbo, vao_solid, vao_textured) = match Self::create_buffers(&gl) {
            Ok(buffers) => buffers,
            Err(err) => {
                font.delete(&gl);
                image.delete(&gl);
                text.delete(&gl);
                solid.delete(&gl);
                return Err(err);
            },
        };

        // global fixed-function state for the whole lifetime
        unsafe {
            gl.enable(glow::BLEND);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
            gl.disable(glow::DEPTH_TEST);
            gl.disable(glow::CULL_FACE);
        }

        Ok(Self {
            gl,
            solid,
            text,
            image,
            font,
            vbo,
            vao_solid,
            vao_textured,
            textures: TextureArena::new(),
        })
    }

    /// One dynamic vertex buffer shared by all draw calls, with one
    /// vertex layout per program: position-only for solid draws,
    /// position+texcoord for textured and text draws.
    fn create_buffers(
        gl: &glow::Context,
    ) -> Result<(glow::Buffer, glow::VertexArray, glow::VertexArray), Error> {
        let vbo = unsafe { gl.create_buffer() }.map_err(Error::buffer_creation_failed)?;
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_size(
                glow::ARRAY_BUFFER,
                (VERTEX_BUFFER_FLOATS * size_of::<f32>()) as i32,
                glow::DYNAMIC_DRAW,
            );
        }

        let vao_solid = match unsafe { gl.create_vertex_array() } {
            Ok(vao) => vao,
            Err(detail) => {
                unsafe { gl.delete_buffer(vbo) };
                return Err(Error::vertex_array_creation_failed(detail));
            },
        };
        unsafe {
            gl.bind_vertex_array(Some(vao_solid));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, 2 * size_of::<f32>() as i32, 0);
        }

        let vao_textured = match unsafe { gl.create_vertex_array() } {
            Ok(vao) => vao,
            Err(detail) => {
                unsafe {
                    gl.bind_vertex_array(None);
                    gl.delete_vertex_array(vao_solid);
                    gl.delete_buffer(vbo);
                }
                return Err(Error::vertex_array_creation_failed(detail));
            },
        };
        unsafe {
            gl.bind_vertex_array(Some(vao_textured));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            let stride = 4 * size_of::<f32>() as i32;
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(
                1,
                2,
                glow::FLOAT,
                false,
                stride,
                2 * size_of::<f32>() as i32,
            );
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }

        Ok((vbo, vao_solid, vao_textured))
    }

    fn delete(mut self) {
        let gl = &self.gl;
        self.solid.delete(gl);
        self.text.delete(gl);
        self.image.delete(gl);
        self.font.delete(gl);
        for texture in self.textures.drain() {
            texture.delete(gl);
        }
        unsafe {
            gl.delete_buffer(self.vbo);
            gl.delete_vertex_array(self.vao_solid);
            gl.delete_vertex_array(self.vao_textured);
        }
    }

    /// Uploads four NDC positions and draws them as a triangle strip
    /// with the solid program.
    fn draw_positions(&self, corners: &[[f32; 2]; 4], color: Rgba) {
        let gl = &self.gl;

        let mut vertices = [0f32; 8];
        for (i, corner) in corners.iter().enumerate() {
            vertices[i * 2] = corner[0];
            vertices[i * 2 + 1] = corner[1];
        }

        self.solid.use_program(gl);
        unsafe {
            gl.bind_vertex_array(Some(self.vao_solid));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
        }
        buffer_sub_data_f32(gl, glow::ARRAY_BUFFER, &vertices);
        unsafe {
            gl.uniform_4_f32(Some(&self.solid.color_loc), color.r, color.g, color.b, color.a);
            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_vertex_array(None);
            gl.use_program(None);
        }
    }

    /// Uploads interleaved position+texcoord vertices and draws them as
    /// a triangle strip sampling `texture`.
    fn draw_textured(
        &self,
        program: &ShaderProgram,
        texture: glow::Texture,
        corners: &[[f32; 2]; 4],
        uv: &[[f32; 2]; 4],
        color: Rgba,
    ) {
        let gl = &self.gl;

        let mut vertices = [0f32; 16];
        for i in 0..4 {
            vertices[i * 4] = corners[i][0];
            vertices[i * 4 + 1] = corners[i][1];
            vertices[i * 4 + 2] = uv[i][0];
            vertices[i * 4 + 3] = uv[i][1];
        }

        program.use_program(gl);
        unsafe {
            gl.bind_vertex_array(Some(self.vao_textured));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            if let Some(sampler) = &program.sampler_loc {
                gl.uniform_1_i32(Some(sampler), 0);
            }
            gl.uniform_4_f32(Some(&program.color_loc), color.r, color.g, color.b, color.a);
        }
        buffer_sub_data_f32(gl, glow::ARRAY_BUFFER, &vertices);
        unsafe {
            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_vertex_array(None);
            gl.use_program(None);
        }
    }

    /// One draw call per printable character, sampling the font atlas.
    fn draw_text(&self, x: f32, y: f32, text: &str, color: Rgba, viewport: Viewport) {
        let gl = &self.gl;

        self.text.use_program(gl);
        unsafe {
            gl.bind_vertex_array(Some(self.vao_textured));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.font.texture));
            if let Some(sampler) = &self.text.sampler_loc {
                gl.uniform_1_i32(Some(sampler), 0);
            }
            gl.uniform_4_f32(Some(&self.text.color_loc), color.r, color.g, color.b, color.a);
        }

        for glyph in font::layout(x, text) {
            let [x0, y0] = viewport.to_ndc(glyph.x, y);
            let [x1, y1] = viewport.to_ndc(glyph.x + GLYPH_WIDTH as f32, y + GLYPH_HEIGHT as f32);
            #[rustfmt::skip]
            let vertices = [
                x0, y0, glyph.u0, 0.0, // top-left
                x1, y0, glyph.u1, 0.0, // top-right
                x0, y1, glyph.u0, 1.0, // bottom-left
                x1, y1, glyph.u1, 1.0, // bottom-right
            ];
            buffer_sub_data_f32(gl, glow::ARRAY_BUFFER, &vertices);
            unsafe { gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4) };
        }

        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_vertex_array(None);
            gl.use_program(None);
        }
    }
}
