//! The host adapter.
//!
//! Translates host lifecycle calls — capability injection, content
//! loading, the per-frame pump, shutdown — into operations on the
//! renderer, the script bridge, and the content archive. One `Core` owns
//! one of each; there is no process-wide state beyond the log facade.

use std::{cell::RefCell, path::Path, rc::Rc};

use crate::{
    assets::{AssetSource, ContentArchive, SCRIPT_ENTRY},
    error::Error,
    gl::{
        geometry::{Rgba, Viewport},
        renderer::{RENDER_HEIGHT, RENDER_WIDTH, Renderer},
        texture::TextureHandle,
    },
    host::{
        AvInfo, GetFramebufferFn, GetProcAddressFn, HostCallbacks, HwContextRequest, InputPollFn,
        InputStateFn, Region, SystemInfo, VideoRefreshFn,
    },
    input, logging,
    script::{ScriptBridge, ScriptSource},
    surface::DrawSurface,
};

/// Nominal output width in pixels.
const BASE_WIDTH: u32 = 320;
/// Nominal output height in pixels.
const BASE_HEIGHT: u32 = 240;

/// Fixed per-frame animation clock advance (60 fps).
const FRAME_DELTA: f32 = 1.0 / 60.0;

/// Bundled fallback script, used when content is absent or fails.
const DEFAULT_SCRIPT: &str = include_str!("scripts/default.lua");
const DEFAULT_SCRIPT_NAME: &str = "default.lua";

/// Scripting-facing drawing surface: the renderer plus the content
/// archive backing `load_image`. Scripts always draw into the hardware
/// render viewport.
struct GraphicsContext {
    renderer: Rc<RefCell<Renderer>>,
    archive: Rc<RefCell<ContentArchive>>,
}

impl GraphicsContext {
    fn viewport() -> Viewport {
        Viewport::new(RENDER_WIDTH as f32, RENDER_HEIGHT as f32)
    }
}

impl DrawSurface for GraphicsContext {
    fn draw_quad(&mut self, x: f32, y: f32, w: f32, h: f32, rotation: f32, color: Rgba) {
        self.renderer
            .borrow_mut()
            .draw_solid_quad(x, y, w, h, rotation, color, Self::viewport());
    }

    fn draw_custom_quad(
        &mut self,
        points: &[[f32; 2]],
        x: f32,
        y: f32,
        rotation: f32,
        color: Rgba,
    ) {
        self.renderer
            .borrow_mut()
            .draw_custom_quad(points, x, y, rotation, color, Self::viewport());
    }

    fn draw_texture(
        &mut self,
        handle: TextureHandle,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        rotation: f32,
        tint: Rgba,
    ) {
        self.renderer
            .borrow_mut()
            .draw_texture(handle, x, y, w, h, rotation, tint, Self::viewport());
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Rgba) {
        self.renderer
            .borrow_mut()
            .draw_text(x, y, text, color, Self::viewport());
    }

    fn load_image(&mut self, name: &str) -> Result<(TextureHandle, u32, u32), Error> {
        let bytes = self.archive.borrow().extract(name)?;
        self.renderer.borrow_mut().load_image(name, &bytes)
    }

    fn free_texture(&mut self, handle: TextureHandle) -> bool {
        self.renderer.borrow_mut().free_texture(handle)
    }
}

/// The plugin core.
pub struct Core {
    callbacks: HostCallbacks,
    renderer: Rc<RefCell<Renderer>>,
    archive: Rc<RefCell<ContentArchive>>,
    script: ScriptBridge,
    /// Bytes of the last successfully loaded script, kept so a late
    /// input collaborator can recreate the same instance.
    current_script: Option<(Vec<u8>, String)>,
    animation_time: f32,
    initialized: bool,
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

impl Core {
    /// A core with no capabilities injected yet. Installs the unified
    /// logger as a side effect.
    #[must_use]
    pub fn new() -> Self {
        logging::install();
        Self {
            callbacks: HostCallbacks::default(),
            renderer: Rc::new(RefCell::new(Renderer::new())),
            archive: Rc::new(RefCell::new(ContentArchive::new())),
            script: ScriptBridge::new(),
            current_script: None,
            animation_time: 0.0,
            initialized: false,
        }
    }

    // ── capability injection ────────────────────────────────────────

    /// Installs the GL function loader used at context reset.
    pub fn set_proc_address_loader(&mut self, loader: GetProcAddressFn) {
        self.callbacks.get_proc_address = Some(loader);
    }

    /// Installs the per-frame framebuffer accessor.
    pub fn set_framebuffer_accessor(&mut self, accessor: GetFramebufferFn) {
        self.callbacks.get_current_framebuffer = Some(accessor.clone());
        self.renderer
            .borrow_mut()
            .set_framebuffer_accessor(Some(accessor));
    }

    /// Installs the frame presentation sink.
    pub fn set_video_refresh(&mut self, sink: VideoRefreshFn) {
        self.callbacks.video_refresh = Some(sink);
        log::info!("video refresh callback set");
    }

    /// Installs the input latch.
    pub fn set_input_poll(&mut self, poll: InputPollFn) {
        self.callbacks.input_poll = Some(poll);
        log::info!("input poll callback set");
    }

    /// Installs the input state query. When a script instance already
    /// exists it is torn down and recreated from the retained source, so
    /// its registered functions close over the live collaborator.
    pub fn set_input_state(&mut self, query: InputStateFn) {
        self.callbacks.input_state = Some(query);
        log::info!("input state callback set");

        if self.script.is_active() {
            self.script.shutdown();
            if let Err(err) = self.reload_current_script() {
                log::warn!("failed to reinitialize script after input callback set: {err}");
            } else {
                log::info!("script reinitialized with input state callback");
            }
        }
    }

    /// Hands the host's structured logger to the unified log path; pass
    /// `None` to fall back to the file-plus-stderr sink.
    pub fn set_log_sink(&mut self, sink: Option<logging::HostLogFn>) {
        logging::set_host_sink(sink);
    }

    // ── lifecycle ───────────────────────────────────────────────────

    /// Marks the core live.
    pub fn init(&mut self) {
        self.initialized = true;
        log::info!("core initialized");
    }

    /// Tears down the script and the renderer. Idempotent; must run on
    /// every exit path so no GPU state leaks.
    pub fn deinit(&mut self) {
        self.renderer.borrow_mut().deinit();
        self.script.shutdown();
        self.initialized = false;
        log::info!("core deinitialized");
    }

    /// GPU context requirements the host must satisfy. The host owes a
    /// `context_reset` once the context exists and a `context_destroyed`
    /// when it goes away.
    #[must_use]
    pub fn hw_context_request(&self) -> HwContextRequest {
        HwContextRequest::OPENGL_CORE_33
    }

    /// Context-created hook: (re)initializes the render state manager.
    pub fn context_reset(&mut self) {
        let mut renderer = self.renderer.borrow_mut();
        renderer.set_framebuffer_accessor(self.callbacks.get_current_framebuffer.clone());
        if let Err(err) = renderer.init(self.callbacks.get_proc_address.as_ref()) {
            log::error!("GL initialization failed: {err}");
        }
    }

    /// Context-destroyed hook: releases every GPU object.
    pub fn context_destroyed(&mut self) {
        self.renderer.borrow_mut().deinit();
    }

    // ── content ─────────────────────────────────────────────────────

    /// Loads content from a zip archive at `path`, or the bundled
    /// default script when `None`. Always reports success to the host:
    /// a failing script is logged and the fallback renderer takes over.
    pub fn load_content(&mut self, path: Option<&Path>) -> bool {
        match path {
            Some(path) => {
                self.archive.borrow_mut().set_path(Some(path));
                log::info!("content archive: {}", path.display());

                let script = self.archive.borrow().extract_script();
                match script {
                    Ok(bytes) => {
                        if let Err(err) = self.load_script(bytes, SCRIPT_ENTRY) {
                            log::warn!("failed to initialize script from archive: {err}");
                            self.load_default_script();
                        }
                    },
                    Err(err) => {
                        log::warn!("failed to extract script from archive: {err}");
                        self.load_default_script();
                    },
                }
            },
            None => {
                log::info!("no content provided, using default script");
                self.archive.borrow_mut().set_path(None);
                self.load_default_script();
            },
        }

        log::info!("content loaded");
        true
    }

    /// Multi-archive variant: the first archive that yields a loadable
    /// script wins; asset extraction is served from the first path
    /// regardless. Falls back to the bundled default script.
    pub fn load_content_special(&mut self, paths: &[std::path::PathBuf]) -> bool {
        let mut loaded = false;
        for path in paths {
            if !self.archive.borrow().has_content() {
                self.archive.borrow_mut().set_path(Some(path));
                log::info!("content archive: {}", path.display());
            }
            if loaded {
                continue;
            }

            let mut probe = ContentArchive::new();
            probe.set_path(Some(path));
            match probe.extract_script() {
                Ok(bytes) => match self.load_script(bytes, SCRIPT_ENTRY) {
                    Ok(()) => loaded = true,
                    Err(err) => {
                        log::warn!(
                            "failed to initialize script from {}: {err}",
                            path.display()
                        );
                    },
                },
                Err(err) => {
                    log::warn!("failed to extract script from {}: {err}", path.display());
                },
            }
        }

        if !loaded {
            log::info!("no valid script loaded, using default script");
            self.archive.borrow_mut().set_path(None);
            self.load_default_script();
        }

        log::info!("content loaded");
        true
    }

    /// Unloads content: tears down the script instance and clears the
    /// archive path.
    pub fn unload_content(&mut self) {
        self.script.shutdown();
        self.archive.borrow_mut().set_path(None);
        self.current_script = None;
        log::info!("content unloaded");
    }

    /// Host-driven reset request; state is rebuilt per frame, so this
    /// only logs.
    pub fn reset(&mut self) {
        log::info!("core reset");
    }

    fn load_script(&mut self, bytes: Vec<u8>, name: &str) -> Result<(), Error> {
        let was_active = self.script.is_active();
        let surface: Rc<RefCell<dyn DrawSurface>> = Rc::new(RefCell::new(GraphicsContext {
            renderer: Rc::clone(&self.renderer),
            archive: Rc::clone(&self.archive),
        }));
        self.script.load(
            ScriptSource::Buffer {
                bytes: &bytes,
                name,
            },
            surface,
            self.callbacks.input_state.clone(),
        )?;
        // a no-op load (instance already live) must not replace the
        // retained source backing input-collaborator reinitialization
        if !was_active {
            self.current_script = Some((bytes, name.to_string()));
        }
        Ok(())
    }

    fn load_default_script(&mut self) {
        if let Err(err) = self.load_script(DEFAULT_SCRIPT.as_bytes().to_vec(), DEFAULT_SCRIPT_NAME)
        {
            log::warn!("failed to initialize default script: {err}");
        }
    }

    fn reload_current_script(&mut self) -> Result<(), Error> {
        match self.current_script.take() {
            Some((bytes, name)) => self.load_script(bytes, &name),
            None => {
                self.load_default_script();
                Ok(())
            },
        }
    }

    // ── per-frame pump ──────────────────────────────────────────────

    /// Runs one frame: poll input, bind and clear the render target,
    /// advance the animation clock, let the script (or the fallback
    /// renderer) draw, unbind, present. Skips cleanly while the core or
    /// the GPU pipeline is down.
    pub fn run_frame(&mut self) {
        if !self.initialized {
            log::error!("core not initialized");
            return;
        }
        if !self.renderer.borrow().is_initialized() {
            log::error!("renderer not initialized, skipping frame");
            return;
        }

        if let Some(poll) = &self.callbacks.input_poll {
            poll();
        }

        {
            let mut renderer = self.renderer.borrow_mut();
            renderer.bind_target_framebuffer();
            renderer.check_error("framebuffer binding");
            renderer.ensure_viewport();
            renderer.clear();
        }

        self.animation_time += FRAME_DELTA;

        if self.script.is_active() {
            self.script.update(self.animation_time);
        } else {
            self.draw_fallback_quad();
        }

        {
            let renderer = self.renderer.borrow();
            renderer.unbind_framebuffer();
            renderer.check_error("unbind framebuffer");
        }

        if let Some(present) = &self.callbacks.video_refresh {
            present(RENDER_WIDTH, RENDER_HEIGHT);
        }
    }

    /// Pulsing quad drawn when no script is active; its color encodes
    /// the currently pressed A/B buttons.
    fn draw_fallback_quad(&mut self) {
        let (mut r, mut g, mut b) = (0.0, 0.5, 0.0);
        if let Some(query) = &self.callbacks.input_state {
            if query(0, input::DEVICE_JOYPAD, 0, input::JOYPAD_A) != 0 {
                g = 0.0;
                b = 1.0;
            }
            if query(0, input::DEVICE_JOYPAD, 0, input::JOYPAD_B) != 0 {
                r = 1.0;
                g = 0.0;
            }
        }

        let scale = 0.8 + 0.2 * (self.animation_time * 2.0).sin();
        let width = RENDER_WIDTH as f32 * scale;
        let height = RENDER_HEIGHT as f32 * scale;
        let x = (RENDER_WIDTH as f32 - width) * 0.5;
        let y = (RENDER_HEIGHT as f32 - height) * 0.5;

        let mut renderer = self.renderer.borrow_mut();
        renderer.draw_solid_quad(
            x,
            y,
            width,
            height,
            0.0,
            Rgba::new(r, g, b, 1.0),
            Viewport::new(RENDER_WIDTH as f32, RENDER_HEIGHT as f32),
        );
        renderer.check_error("draw_solid_quad");
    }

    // ── host-facing info and ABI-completeness stubs ─────────────────

    /// Static identity reported to the host.
    #[must_use]
    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            library_name: "quadscript",
            library_version: env!("CARGO_PKG_VERSION"),
            valid_extensions: "zip",
            need_fullpath: true,
            block_extract: true,
        }
    }

    /// Geometry and timing reported to the host.
    #[must_use]
    pub fn av_info(&self) -> AvInfo {
        AvInfo {
            base_width: BASE_WIDTH,
            base_height: BASE_HEIGHT,
            max_width: RENDER_WIDTH,
            max_height: RENDER_HEIGHT,
            aspect_ratio: BASE_WIDTH as f32 / BASE_HEIGHT as f32,
            fps: 60.0,
            sample_rate: 48_000.0,
        }
    }

    /// Fixed region report.
    #[must_use]
    pub fn region(&self) -> Region {
        Region::Ntsc
    }

    /// Save states are unsupported: always zero.
    #[must_use]
    pub fn serialize_size(&self) -> usize {
        0
    }

    /// Save states are unsupported: always fails.
    pub fn serialize(&self, _buffer: &mut [u8]) -> bool {
        false
    }

    /// Save states are unsupported: always fails.
    pub fn unserialize(&mut self, _data: &[u8]) -> bool {
        false
    }

    /// Cheats are unsupported.
    pub fn cheat_reset(&mut self) {}

    /// Cheats are unsupported.
    pub fn cheat_set(&mut self, _index: u32, _enabled: bool, _code: &str) {}

    /// No memory regions are exposed.
    #[must_use]
    pub fn memory_data(&self, _id: u32) -> Option<&[u8]> {
        None
    }

    /// No memory regions are exposed.
    #[must_use]
    pub fn memory_size(&self, _id: u32) -> usize {
        0
    }

    /// Controller assignment is accepted and logged; only raw button
    /// polling is implemented.
    pub fn set_controller_port_device(&mut self, port: u32, device: u32) {
        log::info!("controller port device set: port={port}, device={device}");
    }

    /// Script bridge observability for tests.
    #[cfg(test)]
    pub(crate) fn script(&self) -> &ScriptBridge {
        &self.script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::tests::write_archive;

    #[test]
    fn no_content_loads_the_bundled_default_script() {
        let mut core = Core::new();
        core.init();
        assert!(core.load_content(None));
        assert!(core.script().is_active());
    }

    #[test]
    fn archive_script_is_preferred_over_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_archive(
            dir.path(),
            &[(SCRIPT_ENTRY, b"marker = 7\nfunction update(t) end")],
        );

        let mut core = Core::new();
        core.init();
        assert!(core.load_content(Some(&path)));
        assert!(core.script().is_active());
        assert_eq!(core.script().eval_number("marker"), Some(7.0));
    }

    #[test]
    fn archive_without_script_falls_back_to_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_archive(dir.path(), &[("readme.txt", b"no script here")]);

        let mut core = Core::new();
        core.init();
        assert!(core.load_content(Some(&path)));
        assert!(core.script().is_active());
        // the default script, not the archive, is live
        assert_eq!(core.script().eval_number("marker"), None);
    }

    #[test]
    fn broken_archive_script_falls_back_to_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_archive(dir.path(), &[(SCRIPT_ENTRY, b"this is not lua (")]);

        let mut core = Core::new();
        core.init();
        assert!(core.load_content(Some(&path)));
        assert!(core.script().is_active());
    }

    #[test]
    fn late_input_collaborator_recreates_the_script_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_archive(
            dir.path(),
            &[(
                SCRIPT_ENTRY,
                b"loads = (loads or 0) + 1\nfunction update(t) ticks = (ticks or 0) + 1 end"
                    as &[u8],
            )],
        );

        let mut core = Core::new();
        core.init();
        core.load_content(Some(&path));
        assert_eq!(core.script().eval_number("loads"), Some(1.0));

        core.set_input_state(Rc::new(|_, _, _, _| 0));

        // a fresh instance: the body ran once in the new interpreter and
        // the old instance's globals are gone
        assert!(core.script().is_active());
        assert_eq!(core.script().eval_number("loads"), Some(1.0));
        assert_eq!(core.script().eval_number("ticks"), None);
    }

    #[test]
    fn run_frame_without_gpu_pipeline_is_skipped_cleanly() {
        let mut core = Core::new();
        core.init();
        core.load_content(None);
        // no GL context, no renderer init; the frame must not panic and
        // must not touch the script
        core.run_frame();
        core.run_frame();
    }

    #[test]
    fn load_content_special_uses_the_first_loadable_script() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let broken = write_archive(dir_a.path(), &[(SCRIPT_ENTRY, b"(((")]);
        let good = write_archive(
            dir_b.path(),
            &[(SCRIPT_ENTRY, b"marker = 2\nfunction update(t) end")],
        );

        let mut core = Core::new();
        core.init();
        assert!(core.load_content_special(&[broken, good]));
        assert!(core.script().is_active());
        assert_eq!(core.script().eval_number("marker"), Some(2.0));
    }

    #[test]
    fn unload_content_tears_the_script_down() {
        let mut core = Core::new();
        core.init();
        core.load_content(None);
        assert!(core.script().is_active());

        core.unload_content();
        assert!(!core.script().is_active());
    }

    #[test]
    fn deinit_is_idempotent() {
        let mut core = Core::new();
        core.init();
        core.load_content(None);
        core.deinit();
        core.deinit();
        assert!(!core.script().is_active());
    }

    #[test]
    fn stub_surface_reports_nothing() {
        let core = Core::new();
        assert_eq!(core.serialize_size(), 0);
        assert!(!core.serialize(&mut []));
        assert_eq!(core.memory_size(0), 0);
        assert!(core.memory_data(0).is_none());
        assert_eq!(core.region(), Region::Ntsc);

        let av = core.av_info();
        assert_eq!((av.base_width, av.base_height), (320, 240));
        assert_eq!((av.max_width, av.max_height), (512, 512));
        assert_eq!(av.fps, 60.0);
    }

    #[test]
    fn hw_context_request_asks_for_gl33_core() {
        let core = Core::new();
        let request = core.hw_context_request();
        assert!(request.core_profile);
        assert_eq!((request.version_major, request.version_minor), (3, 3));
        assert!(request.depth);
        assert!(!request.stencil);
        assert!(request.debug_context);
    }
}
