//! Host capability interface.
//!
//! The core never talks to the host directly; the host injects
//! function-typed callbacks at construction time. Every field is optional
//! and every consumer tolerates absence — a capability arriving late (or
//! never) degrades the feature it backs, not the core.

use std::{ffi::c_void, rc::Rc};

/// Resolves GL function pointers by symbol name.
pub type GetProcAddressFn = Rc<dyn Fn(&str) -> *const c_void>;

/// Returns the raw handle of the framebuffer to render into this frame.
/// A zero handle means "use the default framebuffer".
pub type GetFramebufferFn = Rc<dyn Fn() -> u32>;

/// Presents the rendered surface; arguments are output width and height.
pub type VideoRefreshFn = Rc<dyn Fn(u32, u32)>;

/// Latches input state for the frame.
pub type InputPollFn = Rc<dyn Fn()>;

/// Queries input state as `(port, device, index, id) -> raw state`.
pub type InputStateFn = Rc<dyn Fn(u32, u32, u32, u32) -> i16>;

/// The callback set injected by the host. All fields optional.
#[derive(Default, Clone)]
pub struct HostCallbacks {
    /// GL function loader, required before the renderer can initialize.
    pub get_proc_address: Option<GetProcAddressFn>,
    /// Per-frame render target accessor.
    pub get_current_framebuffer: Option<GetFramebufferFn>,
    /// Frame presentation sink.
    pub video_refresh: Option<VideoRefreshFn>,
    /// Input latch, invoked once at the top of every frame.
    pub input_poll: Option<InputPollFn>,
    /// Input state query backing `get_input` and the fallback renderer.
    pub input_state: Option<InputStateFn>,
}

/// GPU context requirements the adapter negotiates with the host.
///
/// The host owes the core two calls against this request:
/// `Core::context_reset` once the context exists, and
/// `Core::context_destroyed` when it goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwContextRequest {
    /// Core (fixed-function-free) profile required.
    pub core_profile: bool,
    /// Minimum GL major version.
    pub version_major: u32,
    /// Minimum GL minor version.
    pub version_minor: u32,
    /// Depth buffer requested.
    pub depth: bool,
    /// Stencil buffer requested.
    pub stencil: bool,
    /// Debug context requested.
    pub debug_context: bool,
    /// Framebuffer origin is bottom-left.
    pub bottom_left_origin: bool,
    /// Whether the host may cache the context across resets.
    pub cache_context: bool,
}

impl HwContextRequest {
    /// OpenGL 3.3 core profile with depth, no stencil, debug enabled.
    pub const OPENGL_CORE_33: Self = Self {
        core_profile: true,
        version_major: 3,
        version_minor: 3,
        depth: true,
        stencil: false,
        debug_context: true,
        bottom_left_origin: true,
        cache_context: false,
    };
}

/// Static identity reported to the host.
#[derive(Debug, Clone, Copy)]
pub struct SystemInfo {
    /// Display name of this plugin.
    pub library_name: &'static str,
    /// Version string of this plugin.
    pub library_version: &'static str,
    /// Content file extensions the plugin accepts.
    pub valid_extensions: &'static str,
    /// Content must be passed by path, not preloaded into memory.
    pub need_fullpath: bool,
    /// The host must not extract archives before handing them over.
    pub block_extract: bool,
}

/// Geometry and timing reported to the host.
#[derive(Debug, Clone, Copy)]
pub struct AvInfo {
    /// Nominal output width in pixels.
    pub base_width: u32,
    /// Nominal output height in pixels.
    pub base_height: u32,
    /// Maximum output width in pixels.
    pub max_width: u32,
    /// Maximum output height in pixels.
    pub max_height: u32,
    /// Pixel aspect ratio of the nominal output.
    pub aspect_ratio: f32,
    /// Target frame rate.
    pub fps: f64,
    /// Nominal audio sample rate; audio is unused but the field is part
    /// of the handshake.
    pub sample_rate: f64,
}

/// Video region reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// The only region this plugin reports.
    Ntsc,
}
