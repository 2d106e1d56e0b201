use glow::HasContext;

use crate::error::Error;

/// A linked shader program with its cached uniform locations.
pub(crate) struct ShaderProgram {
    pub(crate) program: glow::Program,
    /// Location of the `color` uniform every program carries.
    pub(crate) color_loc: glow::UniformLocation,
    /// Location of the `tex` sampler; `None` for untextured programs.
    pub(crate) sampler_loc: Option<glow::UniformLocation>,
}

impl ShaderProgram {
    /// Compiles both stages and links them, tagging diagnostics with
    /// `label`. Partially created GL objects are deleted on every failure
    /// path; the intermediate shader objects are deleted once linked.
    pub(crate) fn create(
        gl: &glow::Context,
        vertex_source: &str,
        fragment_source: &str,
        label: &str,
    ) -> Result<Self, Error> {
        let program = unsafe { gl.create_program() }
            .map_err(|_| Error::shader_program_creation_failed(label))?;

        // compile shaders
        let vertex_shader = match compile_shader(gl, ShaderType::Vertex, vertex_source, label) {
            Ok(shader) => shader,
            Err(err) => {
                unsafe { gl.delete_program(program) };
                return Err(err);
            },
        };
        let fragment_shader = match compile_shader(gl, ShaderType::Fragment, fragment_source, label)
        {
            Ok(shader) => shader,
            Err(err) => {
                unsafe {
                    gl.delete_shader(vertex_shader);
                    gl.delete_program(program);
                }
                return Err(err);
            },
        };

        // attach shaders and link program
        unsafe {
            gl.attach_shader(program, vertex_shader);
            gl.attach_shader(program, fragment_shader);
            gl.link_program(program);
        }
        let linked = unsafe { gl.get_program_link_status(program) };

        // shader objects are not needed once linking has run
        unsafe {
            gl.delete_shader(vertex_shader);
            gl.delete_shader(fragment_shader);
        }

        if !linked {
            let info = unsafe { gl.get_program_info_log(program) };
            unsafe { gl.delete_program(program) };
            log::error!("{label} shader program linking failed: {info}");
            return Err(Error::shader_link_failed(label, info));
        }

        let Some(color_loc) = (unsafe { gl.get_uniform_location(program, "color") }) else {
            unsafe { gl.delete_program(program) };
            return Err(Error::uniform_location_failed("color"));
        };
        let sampler_loc = unsafe { gl.get_uniform_location(program, "tex") };

        log::info!("{label} shader program created");
        Ok(ShaderProgram {
            program,
            color_loc,
            sampler_loc,
        })
    }

    /// Use the shader program.
    pub(crate) fn use_program(&self, gl: &glow::Context) {
        unsafe { gl.use_program(Some(self.program)) };
    }

    /// Deletes the program, releasing the GPU resource.
    pub(crate) fn delete(&self, gl: &glow::Context) {
        unsafe { gl.delete_program(self.program) };
    }
}

fn compile_shader(
    gl: &glow::Context,
    shader_type: ShaderType,
    source: &str,
    label: &str,
) -> Result<glow::Shader, Error> {
    let shader = unsafe { gl.create_shader(shader_type.into()) }
        .map_err(|detail| Error::shader_creation_failed(label, detail))?;

    unsafe {
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
    }

    if !unsafe { gl.get_shader_compile_status(shader) } {
        let info = unsafe { gl.get_shader_info_log(shader) };
        unsafe { gl.delete_shader(shader) };
        log::error!(
            "{label} {} shader compilation failed: {info}",
            shader_type.name()
        );
        return Err(Error::shader_compile_failed(label, shader_type.name(), info));
    }

    Ok(shader)
}

/// Enum representing the type of shader.
#[derive(Clone, Copy)]
enum ShaderType {
    Vertex,
    Fragment,
}

impl ShaderType {
    fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }
}

impl From<ShaderType> for u32 {
    fn from(val: ShaderType) -> Self {
        use ShaderType::*;

        match val {
            Vertex => glow::VERTEX_SHADER,
            Fragment => glow::FRAGMENT_SHADER,
        }
    }
}
