//! Host-exposed script functions.
//!
//! Functions are registered from a fixed table of (name, handler)
//! entries. Arity and types are validated centrally by the typed
//! extraction layer: a mismatch raises a Lua error that fails the calling
//! script invocation, never the host. Failure values returned to the
//! script are neutral (`nil`, `false`), not exceptions.

use std::{cell::RefCell, rc::Rc};

use mlua::{Function, Lua, Table, Value, Variadic};

use crate::{
    gl::{geometry::Rgba, texture::TextureHandle},
    host::InputStateFn,
    input,
    surface::DrawSurface,
};

/// Upper bound on the points accepted by `draw_custom_quad`; caps the
/// per-call marshaling cost before anything reaches the renderer.
const MAX_CUSTOM_QUAD_POINTS: usize = 64;

type SharedSurface = Rc<RefCell<dyn DrawSurface>>;

/// Installs every host-exposed function plus the read-only `input`
/// constants table into the interpreter's globals.
pub(super) fn register(
    lua: &Lua,
    surface: &SharedSurface,
    input_state: Option<InputStateFn>,
) -> mlua::Result<()> {
    let globals = lua.globals();

    let entries: [(&str, Function); 8] = [
        ("draw_quad", draw_quad(lua, surface.clone())?),
        ("draw_custom_quad", draw_custom_quad(lua, surface.clone())?),
        ("draw_texture", draw_texture(lua, surface.clone())?),
        ("draw_text", draw_text(lua, surface.clone())?),
        ("load_image", load_image(lua, surface.clone())?),
        ("free_texture", free_texture(lua, surface.clone())?),
        ("get_input", get_input(lua, input_state)?),
        ("print", print_redirect(lua)?),
    ];
    for (name, function) in entries {
        globals.set(name, function)?;
    }

    globals.set("input", input_constants(lua)?)?;
    Ok(())
}

fn draw_quad(lua: &Lua, surface: SharedSurface) -> mlua::Result<Function> {
    lua.create_function(
        move |_,
              (x, y, w, h, rotation, r, g, b, a): (
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
        )| {
            surface
                .borrow_mut()
                .draw_quad(x, y, w, h, rotation, Rgba::new(r, g, b, a));
            Ok(())
        },
    )
}

fn draw_custom_quad(lua: &Lua, surface: SharedSurface) -> mlua::Result<Function> {
    lua.create_function(
        move |_,
              (points, x, y, rotation, r, g, b, a): (
            Vec<Table>,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
        )| {
            if points.len() < 3 {
                return Err(mlua::Error::RuntimeError(format!(
                    "draw_custom_quad requires at least 3 points, got {}",
                    points.len()
                )));
            }
            if points.len() > MAX_CUSTOM_QUAD_POINTS {
                return Err(mlua::Error::RuntimeError(format!(
                    "draw_custom_quad accepts at most {MAX_CUSTOM_QUAD_POINTS} points, got {}",
                    points.len()
                )));
            }

            let mut resolved = Vec::with_capacity(points.len());
            for point in &points {
                let px: f32 = point.get("x")?;
                let py: f32 = point.get("y")?;
                resolved.push([px, py]);
            }

            surface
                .borrow_mut()
                .draw_custom_quad(&resolved, x, y, rotation, Rgba::new(r, g, b, a));
            Ok(())
        },
    )
}

fn draw_texture(lua: &Lua, surface: SharedSurface) -> mlua::Result<Function> {
    lua.create_function(
        move |_,
              (bits, x, y, w, h, rotation, r, g, b, a): (
            i64,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
        )| {
            let Some(handle) = TextureHandle::from_bits(bits) else {
                log::warn!("draw_texture: invalid texture handle {bits}");
                return Ok(());
            };
            surface
                .borrow_mut()
                .draw_texture(handle, x, y, w, h, rotation, Rgba::new(r, g, b, a));
            Ok(())
        },
    )
}

fn draw_text(lua: &Lua, surface: SharedSurface) -> mlua::Result<Function> {
    lua.create_function(
        move |_, (x, y, text, r, g, b, a): (f32, f32, String, f32, f32, f32, f32)| {
            surface
                .borrow_mut()
                .draw_text(x, y, &text, Rgba::new(r, g, b, a));
            Ok(())
        },
    )
}

fn load_image(lua: &Lua, surface: SharedSurface) -> mlua::Result<Function> {
    lua.create_function(move |_, name: String| {
        match surface.borrow_mut().load_image(&name) {
            Ok((handle, width, height)) => Ok((
                Value::Integer(handle.to_bits()),
                Value::Integer(i64::from(width)),
                Value::Integer(i64::from(height)),
            )),
            Err(err) => {
                log::warn!("load_image '{name}' failed: {err}");
                Ok((Value::Nil, Value::Nil, Value::Nil))
            },
        }
    })
}

fn free_texture(lua: &Lua, surface: SharedSurface) -> mlua::Result<Function> {
    lua.create_function(move |_, bits: i64| {
        let Some(handle) = TextureHandle::from_bits(bits) else {
            log::warn!("free_texture: invalid texture handle {bits}");
            return Ok(false);
        };
        Ok(surface.borrow_mut().free_texture(handle))
    })
}

fn get_input(lua: &Lua, input_state: Option<InputStateFn>) -> mlua::Result<Function> {
    lua.create_function(move |_, (device, index, id): (u32, u32, u32)| match &input_state {
        Some(query) => Ok(query(index, device, 0, id) != 0),
        None => {
            log::warn!(
                "get_input: no input collaborator registered \
                 (device={device}, index={index}, id={id})"
            );
            Ok(false)
        },
    })
}

/// Replaces the script's default output function with the unified log.
fn print_redirect(lua: &Lua) -> mlua::Result<Function> {
    lua.create_function(|lua, values: Variadic<Value>| {
        let mut parts = Vec::with_capacity(values.len());
        for value in values.iter() {
            if let Some(text) = lua.coerce_string(value.clone())? {
                parts.push(String::from(text.to_string_lossy()));
            }
        }
        log::info!("lua: {}", parts.join("\t"));
        Ok(())
    })
}

/// The device/button constants table, made read-only through a locked
/// proxy metatable.
fn input_constants(lua: &Lua) -> mlua::Result<Table> {
    let constants = lua.create_table()?;
    for (name, value) in input::SCRIPT_CONSTANTS {
        constants.set(*name, *value)?;
    }

    let proxy = lua.create_table()?;
    let meta = lua.create_table()?;
    meta.set("__index", constants)?;
    meta.set(
        "__newindex",
        lua.create_function(|_, _args: Variadic<Value>| -> mlua::Result<()> {
            Err(mlua::Error::RuntimeError(
                "input constants are read-only".to_string(),
            ))
        })?,
    )?;
    meta.set("__metatable", "locked")?;
    proxy.set_metatable(Some(meta));
    Ok(proxy)
}
