//! Minimal native host driving the quadscript core.
//!
//! Stands in for a real plugin host: creates an OpenGL 3.3 core profile
//! window with glutin + winit, injects the host capabilities the core
//! expects (GL loader, input state, presenter), and pumps one frame per
//! redraw. Pass a zip archive with a `script.lua` entry as the first
//! argument, or run without arguments for the bundled default scene.
//!
//! Run with:
//! ```sh
//! cargo run -p host-shell -- content.zip
//! ```

use std::{cell::RefCell, ffi::CString, num::NonZeroU32, path::PathBuf, rc::Rc};

use glutin::display::GlDisplay;
use glutin::surface::GlSurface;
use quadscript_core::{Core, input};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowId,
};

fn main() {
    let content = std::env::args().nth(1).map(PathBuf::from);

    let event_loop = EventLoop::new().expect("failed to create event loop");
    let mut app = App {
        content,
        state: None,
    };
    event_loop.run_app(&mut app).expect("event loop failed");
}

struct App {
    content: Option<PathBuf>,
    state: Option<AppState>,
}

struct AppState {
    win: GlWindow,
    core: Core,
    buttons: Rc<RefCell<[bool; 16]>>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let win = GlWindow::new(event_loop, "quadscript - host shell", (512, 512));
        let buttons = Rc::new(RefCell::new([false; 16]));

        let mut core = Core::new();
        core.init();

        let display = win.gl_display.clone();
        core.set_proc_address_loader(Rc::new(move |symbol: &str| {
            let Ok(symbol) = CString::new(symbol) else {
                return std::ptr::null();
            };
            display.get_proc_address(&symbol)
        }));

        // rendering goes straight to the window's default framebuffer
        core.set_framebuffer_accessor(Rc::new(|| 0));

        let pressed = Rc::clone(&buttons);
        core.set_input_state(Rc::new(move |_port, device, _index, id| {
            if device != input::DEVICE_JOYPAD {
                return 0;
            }
            i16::from(*pressed.borrow().get(id as usize).unwrap_or(&false))
        }));

        core.context_reset();
        core.load_content(self.content.as_deref());

        self.state = Some(AppState { win, core, buttons });
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                state.core.context_destroyed();
                state.core.deinit();
                self.state = None;
                event_loop.exit();
            },
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: key_state,
                        ..
                    },
                ..
            } => {
                if let Some(id) = map_key(&logical_key) {
                    state.buttons.borrow_mut()[id as usize] =
                        key_state == ElementState::Pressed;
                }
            },
            WindowEvent::RedrawRequested => {
                state.core.run_frame();
                state.win.swap_buffers();
            },
            _ => {},
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.as_ref() {
            state.win.window.request_redraw();
        }
    }
}

/// Keyboard-to-joypad mapping: Z/X for B/A, arrows for the d-pad,
/// Enter/Backspace for Start/Select.
fn map_key(key: &Key) -> Option<u32> {
    match key {
        Key::Character(ch) => match ch.as_str() {
            "z" | "Z" => Some(input::JOYPAD_B),
            "x" | "X" => Some(input::JOYPAD_A),
            "a" | "A" => Some(input::JOYPAD_Y),
            "s" | "S" => Some(input::JOYPAD_X),
            _ => None,
        },
        Key::Named(NamedKey::ArrowUp) => Some(input::JOYPAD_UP),
        Key::Named(NamedKey::ArrowDown) => Some(input::JOYPAD_DOWN),
        Key::Named(NamedKey::ArrowLeft) => Some(input::JOYPAD_LEFT),
        Key::Named(NamedKey::ArrowRight) => Some(input::JOYPAD_RIGHT),
        Key::Named(NamedKey::Enter) => Some(input::JOYPAD_START),
        Key::Named(NamedKey::Backspace) => Some(input::JOYPAD_SELECT),
        _ => None,
    }
}

// ── glutin / winit boilerplate ───────────────────────────────────────

use glutin::{
    config::{ConfigTemplateBuilder, GlConfig},
    context::{
        ContextApi, ContextAttributesBuilder, NotCurrentGlContext, PossiblyCurrentContext, Version,
    },
    display::{Display, GetGlDisplay},
    surface::{Surface, SwapInterval, WindowSurface},
};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasWindowHandle;
use winit::{
    dpi::LogicalSize,
    window::{Window, WindowAttributes},
};

struct GlWindow {
    window: Window,
    gl_display: Display,
    gl_context: PossiblyCurrentContext,
    gl_surface: Surface<WindowSurface>,
}

impl GlWindow {
    fn new(event_loop: &ActiveEventLoop, title: &str, size: (u32, u32)) -> Self {
        let window_attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(LogicalSize::new(size.0, size.1));

        let config_template = ConfigTemplateBuilder::new().with_alpha_size(8);

        let (window, gl_config) =
            DisplayBuilder::new()
                .with_window_attributes(Some(window_attrs))
                .build(event_loop, config_template, |configs| {
                    configs
                        .reduce(|accum, config| {
                            if config.num_samples() > accum.num_samples() { config } else { accum }
                        })
                        .unwrap()
                })
                .expect("failed to build display");

        let window = window.expect("failed to create window");
        let gl_display = gl_config.display();

        let context_attrs = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(
                window
                    .window_handle()
                    .expect("failed to get window handle")
                    .into(),
            ));

        let not_current_context = unsafe { gl_display.create_context(&gl_config, &context_attrs) }
            .expect("failed to create GL context");

        let inner = window.inner_size();
        let surface_attrs = glutin::surface::SurfaceAttributesBuilder::<WindowSurface>::new()
            .build(
                window
                    .window_handle()
                    .expect("failed to get window handle")
                    .into(),
                NonZeroU32::new(inner.width).unwrap(),
                NonZeroU32::new(inner.height).unwrap(),
            );

        let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attrs) }
            .expect("failed to create GL surface");

        let gl_context = not_current_context
            .make_current(&gl_surface)
            .expect("failed to make GL context current");

        let _ = gl_surface
            .set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::new(1).unwrap()));

        Self {
            window,
            gl_display,
            gl_context,
            gl_surface,
        }
    }

    fn swap_buffers(&self) {
        self.gl_surface
            .swap_buffers(&self.gl_context)
            .expect("failed to swap buffers");
    }
}
