//! quadscript-core: a script-driven OpenGL plugin core.
//!
//! A host application loads this core, injects its capabilities — GL
//! function loader, framebuffer accessor, presenter, input poll/state,
//! optionally a structured logger — and pumps one frame per tick. Frame
//! content is produced by a Lua script extracted from a zip content
//! archive (with a bundled fallback), drawing through a small set of
//! registered primitives backed by an OpenGL 3.3 core pipeline.
//!
//! ```no_run
//! use quadscript_core::Core;
//!
//! let mut core = Core::new();
//! core.init();
//! // inject capabilities, then once the GL context exists:
//! core.context_reset();
//! core.load_content(None); // bundled default script
//! loop {
//!     core.run_frame();
//! }
//! ```

pub mod assets;
pub mod core;
pub mod error;
pub mod gl;
pub mod host;
pub mod input;
pub mod logging;
pub mod script;
pub mod surface;

pub use assets::{AssetSource, ContentArchive, SCRIPT_ENTRY};
pub use error::Error;
pub use gl::geometry::{Rgba, Viewport};
pub use gl::renderer::{RENDER_HEIGHT, RENDER_WIDTH, Renderer};
pub use gl::texture::TextureHandle;
pub use host::{
    AvInfo, GetFramebufferFn, GetProcAddressFn, HostCallbacks, HwContextRequest, InputPollFn,
    InputStateFn, Region, SystemInfo, VideoRefreshFn,
};
pub use logging::HostLogFn;
pub use script::{ScriptBridge, ScriptSource};
pub use surface::DrawSurface;

pub use crate::core::Core;
