//! The scripting bridge.
//!
//! Owns the embedded Lua interpreter, installs the host-exposed drawing
//! and input functions, and drives the script's per-frame `update` entry
//! point. At most one interpreter is live at a time; loading while one is
//! live is a no-op returning success.

mod api;

use std::{cell::RefCell, path::Path, rc::Rc};

use mlua::Lua;

use crate::{error::Error, host::InputStateFn, surface::DrawSurface};

/// The per-frame entry point every script must define.
const ENTRY_POINT: &str = "update";

/// Script text to execute, from an in-memory buffer or a file on disk.
pub enum ScriptSource<'a> {
    /// Script bytes with a chunk name for diagnostics.
    Buffer {
        /// Raw script text.
        bytes: &'a [u8],
        /// Chunk name shown in interpreter diagnostics.
        name: &'a str,
    },
    /// Script file read at load time.
    File(&'a Path),
}

/// Interpreter lifecycle and per-frame dispatch.
#[derive(Default)]
pub struct ScriptBridge {
    lua: Option<Lua>,
}

impl ScriptBridge {
    /// A bridge with no live interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self { lua: None }
    }

    /// Whether a script instance is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lua.is_some()
    }

    /// Loads a script. When an instance is already live this returns
    /// success without reloading — the prior instance's state is
    /// untouched. Otherwise a fresh interpreter is created, the host
    /// functions are installed, the body is executed, and the `update`
    /// entry point is verified. The instance is torn down on any failure;
    /// no partially initialized instance persists.
    ///
    /// # Errors
    /// Fails on unreadable files, syntax or runtime errors in the script
    /// body, and scripts that do not define `update`.
    pub fn load(
        &mut self,
        source: ScriptSource<'_>,
        surface: Rc<RefCell<dyn DrawSurface>>,
        input_state: Option<InputStateFn>,
    ) -> Result<(), Error> {
        if self.lua.is_some() {
            log::info!("script already initialized, skipping");
            return Ok(());
        }

        let lua = Lua::new();
        match Self::boot(&lua, source, &surface, input_state) {
            Ok(()) => {
                self.lua = Some(lua);
                log::info!("script loaded");
                Ok(())
            },
            Err(err) => {
                log::error!("script load failed: {err}");
                Err(err)
            },
        }
    }

    fn boot(
        lua: &Lua,
        source: ScriptSource<'_>,
        surface: &Rc<RefCell<dyn DrawSurface>>,
        input_state: Option<InputStateFn>,
    ) -> Result<(), Error> {
        api::register(lua, surface, input_state).map_err(Error::script_binding)?;

        let file_bytes;
        let (bytes, name): (&[u8], String) = match source {
            ScriptSource::Buffer { bytes, name } => (bytes, name.to_string()),
            ScriptSource::File(path) => {
                file_bytes =
                    std::fs::read(path).map_err(|err| Error::script_unreadable(path, err))?;
                (file_bytes.as_slice(), path.display().to_string())
            },
        };

        lua.load(bytes)
            .set_name(name)
            .exec()
            .map_err(Error::script_run)?;

        lua.globals()
            .get::<mlua::Function>(ENTRY_POINT)
            .map_err(|_| Error::script_missing_entry_point(ENTRY_POINT))?;

        Ok(())
    }

    /// Invokes the script's `update` with the elapsed time. A runtime
    /// error is logged and non-fatal: the instance stays live and the
    /// next frame's update is attempted again. No-op without a live
    /// instance.
    pub fn update(&mut self, elapsed: f32) {
        let Some(lua) = &self.lua else { return };

        let update = match lua.globals().get::<mlua::Function>(ENTRY_POINT) {
            Ok(function) => function,
            Err(_) => {
                log::warn!("script no longer defines '{ENTRY_POINT}'");
                return;
            },
        };

        if let Err(err) = update.call::<()>(elapsed) {
            log::error!("script update error: {err}");
        }
    }

    /// Tears down the interpreter. Idempotent.
    pub fn shutdown(&mut self) {
        if self.lua.take().is_some() {
            log::info!("script deinitialized");
        }
    }

    /// Evaluates `expr` in the live instance; test observability only.
    #[cfg(test)]
    pub(crate) fn eval_number(&self, expr: &str) -> Option<f64> {
        self.lua.as_ref()?.load(expr).eval::<f64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{geometry::Rgba, texture::TextureHandle};

    #[derive(Debug, PartialEq)]
    enum Call {
        Quad {
            x: f32,
            y: f32,
            w: f32,
            h: f32,
            rotation: f32,
            color: Rgba,
        },
        CustomQuad {
            points: Vec<[f32; 2]>,
        },
        Texture {
            handle: TextureHandle,
        },
        Text {
            x: f32,
            text: String,
        },
        Free {
            handle: TextureHandle,
        },
    }

    /// Records every draw call; `load_image` fails unless primed.
    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<Call>,
        image: Option<(TextureHandle, u32, u32)>,
    }

    impl DrawSurface for RecordingSurface {
        fn draw_quad(&mut self, x: f32, y: f32, w: f32, h: f32, rotation: f32, color: Rgba) {
            self.calls.push(Call::Quad {
                x,
                y,
                w,
                h,
                rotation,
                color,
            });
        }

        fn draw_custom_quad(
            &mut self,
            points: &[[f32; 2]],
            _x: f32,
            _y: f32,
            _rotation: f32,
            _color: Rgba,
        ) {
            self.calls.push(Call::CustomQuad {
                points: points.to_vec(),
            });
        }

        fn draw_texture(
            &mut self,
            handle: TextureHandle,
            _x: f32,
            _y: f32,
            _w: f32,
            _h: f32,
            _rotation: f32,
            _tint: Rgba,
        ) {
            self.calls.push(Call::Texture { handle });
        }

        fn draw_text(&mut self, x: f32, _y: f32, text: &str, _color: Rgba) {
            self.calls.push(Call::Text {
                x,
                text: text.to_string(),
            });
        }

        fn load_image(&mut self, name: &str) -> Result<(TextureHandle, u32, u32), Error> {
            self.image.ok_or_else(|| Error::entry_not_found(name))
        }

        fn free_texture(&mut self, handle: TextureHandle) -> bool {
            self.calls.push(Call::Free { handle });
            true
        }
    }

    fn load(
        bridge: &mut ScriptBridge,
        script: &str,
        input_state: Option<InputStateFn>,
    ) -> (Rc<RefCell<RecordingSurface>>, Result<(), Error>) {
        let surface = Rc::new(RefCell::new(RecordingSurface::default()));
        let result = bridge.load(
            ScriptSource::Buffer {
                bytes: script.as_bytes(),
                name: "test.lua",
            },
            surface.clone(),
            input_state,
        );
        (surface, result)
    }

    #[test]
    fn script_without_update_fails_and_leaves_no_instance() {
        let mut bridge = ScriptBridge::new();
        let (_, result) = load(&mut bridge, "x = 1", None);
        assert!(matches!(result, Err(Error::Script(_))));
        assert!(!bridge.is_active());
    }

    #[test]
    fn syntax_error_fails_and_leaves_no_instance() {
        let mut bridge = ScriptBridge::new();
        let (_, result) = load(&mut bridge, "function update(", None);
        assert!(result.is_err());
        assert!(!bridge.is_active());
    }

    #[test]
    fn loading_while_active_is_a_noop_returning_success() {
        let mut bridge = ScriptBridge::new();
        let script = "loads = (loads or 0) + 1\nfunction update(t) end";
        let (_, first) = load(&mut bridge, script, None);
        assert!(first.is_ok());

        let (_, second) = load(&mut bridge, script, None);
        assert!(second.is_ok());

        // the body ran exactly once; the prior instance survived untouched
        assert_eq!(bridge.eval_number("loads"), Some(1.0));
    }

    #[test]
    fn update_produces_exactly_one_quad_draw() {
        let mut bridge = ScriptBridge::new();
        let (surface, result) = load(
            &mut bridge,
            "function update(t) draw_quad(0, 0, 100, 100, 0, 1, 0, 0, 1) end",
            None,
        );
        assert!(result.is_ok());

        bridge.update(0.016);

        let calls = &surface.borrow().calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            Call::Quad {
                x: 0.0,
                y: 0.0,
                w: 100.0,
                h: 100.0,
                rotation: 0.0,
                color: Rgba::new(1.0, 0.0, 0.0, 1.0),
            }
        );
    }

    #[test]
    fn runtime_error_in_update_is_non_fatal() {
        let mut bridge = ScriptBridge::new();
        let (surface, _) = load(
            &mut bridge,
            "ticks = 0\n\
             function update(t)\n\
                 ticks = ticks + 1\n\
                 error('boom')\n\
             end",
            None,
        );

        bridge.update(0.0);
        bridge.update(0.0);

        assert!(bridge.is_active());
        // the call kept being attempted each frame
        assert_eq!(bridge.eval_number("ticks"), Some(2.0));
        assert!(surface.borrow().calls.is_empty());
    }

    #[test]
    fn wrong_argument_types_fail_the_invocation_not_the_host() {
        let mut bridge = ScriptBridge::new();
        let (surface, _) = load(
            &mut bridge,
            "function update(t) draw_quad('not', 'numbers') end",
            None,
        );

        bridge.update(0.0);

        assert!(bridge.is_active());
        assert!(surface.borrow().calls.is_empty());
    }

    #[test]
    fn custom_quad_rejects_fewer_than_three_points() {
        let mut bridge = ScriptBridge::new();
        let (surface, _) = load(
            &mut bridge,
            "function update(t)\n\
                 draw_custom_quad({{x=0, y=0}, {x=1, y=0}}, 0, 0, 0, 1, 1, 1, 1)\n\
             end",
            None,
        );

        bridge.update(0.0);
        assert!(surface.borrow().calls.is_empty());
    }

    #[test]
    fn custom_quad_passes_four_points_through() {
        let mut bridge = ScriptBridge::new();
        let (surface, _) = load(
            &mut bridge,
            "function update(t)\n\
                 draw_custom_quad(\n\
                     {{x=0, y=0}, {x=10, y=0}, {x=0, y=10}, {x=10, y=10}},\n\
                     0, 0, 0, 1, 1, 1, 1)\n\
             end",
            None,
        );

        bridge.update(0.0);

        let calls = &surface.borrow().calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            Call::CustomQuad {
                points: vec![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]],
            }
        );
    }

    #[test]
    fn get_input_without_collaborator_returns_false() {
        let mut bridge = ScriptBridge::new();
        let (surface, _) = load(
            &mut bridge,
            "function update(t)\n\
                 if get_input(input.JOYPAD, 0, input.A) then\n\
                     draw_quad(0, 0, 1, 1, 0, 1, 1, 1, 1)\n\
                 end\n\
             end",
            None,
        );

        bridge.update(0.0);
        assert!(surface.borrow().calls.is_empty());
    }

    #[test]
    fn get_input_queries_the_collaborator() {
        let mut bridge = ScriptBridge::new();
        let pressed: InputStateFn = Rc::new(|_port, _device, _index, id| i16::from(id == 8));
        let (surface, _) = load(
            &mut bridge,
            "function update(t)\n\
                 if get_input(input.JOYPAD, 0, input.A) then\n\
                     draw_quad(0, 0, 1, 1, 0, 1, 1, 1, 1)\n\
                 end\n\
                 if get_input(input.JOYPAD, 0, input.B) then\n\
                     draw_quad(9, 9, 1, 1, 0, 1, 1, 1, 1)\n\
                 end\n\
             end",
            Some(pressed),
        );

        bridge.update(0.0);
        // A (id 8) is pressed, B (id 0) is not
        assert_eq!(surface.borrow().calls.len(), 1);
    }

    #[test]
    fn input_constants_are_read_only() {
        let mut bridge = ScriptBridge::new();
        let (_, result) = load(
            &mut bridge,
            "input.A = 99\nfunction update(t) end",
            None,
        );
        assert!(result.is_err());
        assert!(!bridge.is_active());
    }

    #[test]
    fn failed_image_load_yields_nil_to_the_script() {
        let mut bridge = ScriptBridge::new();
        let (surface, _) = load(
            &mut bridge,
            "function update(t)\n\
                 local handle = load_image('missing.png')\n\
                 if handle == nil then\n\
                     draw_text(0, 0, 'no image', 1, 1, 1, 1)\n\
                 end\n\
             end",
            None,
        );

        bridge.update(0.0);

        let calls = &surface.borrow().calls;
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], Call::Text { text, .. } if text == "no image"));
    }

    #[test]
    fn free_texture_rejects_invalid_handles() {
        let mut bridge = ScriptBridge::new();
        let (surface, _) = load(
            &mut bridge,
            "function update(t)\n\
                 if free_texture(0) or free_texture(-3) then\n\
                     draw_quad(0, 0, 1, 1, 0, 1, 1, 1, 1)\n\
                 end\n\
             end",
            None,
        );

        bridge.update(0.0);
        // neither invalid handle reached the surface, nothing was drawn
        assert!(surface.borrow().calls.is_empty());
    }

    #[test]
    fn print_is_redirected_without_erroring() {
        let mut bridge = ScriptBridge::new();
        let (_, result) = load(
            &mut bridge,
            "print('hello', 42, {})\nfunction update(t) end",
            None,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut bridge = ScriptBridge::new();
        let (_, _) = load(&mut bridge, "function update(t) end", None);
        assert!(bridge.is_active());

        bridge.shutdown();
        assert!(!bridge.is_active());
        bridge.shutdown();
        assert!(!bridge.is_active());

        // update after shutdown is a no-op, not a crash
        bridge.update(0.0);
    }

    #[test]
    fn update_receives_the_elapsed_time() {
        let mut bridge = ScriptBridge::new();
        let (_, _) = load(
            &mut bridge,
            "seen = -1\nfunction update(t) seen = t end",
            None,
        );

        bridge.update(1.5);
        assert_eq!(bridge.eval_number("seen"), Some(1.5));
    }
}
