use std::path::Path;

/// Error categories for the plugin core.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// GL context acquisition or feature-level failures.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Shader compilation, linking, or program creation errors.
    #[error("Shader error: {0}")]
    Shader(String),

    /// GL resource creation or management errors.
    #[error("Resource error: {0}")]
    Resource(String),

    /// Content archive or asset decoding errors.
    #[error("Asset error: {0}")]
    Asset(String),

    /// Script loading or execution errors.
    #[error("Script error: {0}")]
    Script(String),
}

impl Error {
    // Initialization errors

    pub(crate) fn gl_loader_missing() -> Self {
        Self::Initialization("no GL function loader provided".to_string())
    }

    pub(crate) fn gl_version_unsupported(major: u32, minor: u32) -> Self {
        Self::Initialization(format!(
            "OpenGL 3.3 core profile required, context reports {major}.{minor}"
        ))
    }

    pub(crate) fn renderer_uninitialized() -> Self {
        Self::Initialization("renderer not initialized".to_string())
    }

    // Shader errors

    pub(crate) fn shader_creation_failed(label: &str, detail: String) -> Self {
        Self::Shader(format!("{label}: shader creation failed: {detail}"))
    }

    pub(crate) fn shader_compile_failed(label: &str, stage: &str, log: String) -> Self {
        Self::Shader(format!("{label} {stage} shader compilation failed: {log}"))
    }

    pub(crate) fn shader_program_creation_failed(label: &str) -> Self {
        Self::Shader(format!("{label}: shader program creation failed"))
    }

    pub(crate) fn shader_link_failed(label: &str, log: String) -> Self {
        Self::Shader(format!("{label} shader program linking failed: {log}"))
    }

    // Resource errors

    pub(crate) fn buffer_creation_failed(detail: String) -> Self {
        Self::Resource(format!("failed to create vertex buffer: {detail}"))
    }

    pub(crate) fn vertex_array_creation_failed(detail: String) -> Self {
        Self::Resource(format!("failed to create vertex array object: {detail}"))
    }

    pub(crate) fn texture_creation_failed(detail: String) -> Self {
        Self::Resource(format!("failed to create texture: {detail}"))
    }

    pub(crate) fn uniform_location_failed(name: &str) -> Self {
        Self::Resource(format!("failed to get uniform location: {name}"))
    }

    // Asset errors

    pub(crate) fn no_content() -> Self {
        Self::Asset("no content archive loaded".to_string())
    }

    pub(crate) fn archive_unreadable(path: &Path, detail: impl std::fmt::Display) -> Self {
        Self::Asset(format!("failed to open archive {}: {detail}", path.display()))
    }

    pub(crate) fn entry_not_found(name: &str) -> Self {
        Self::Asset(format!("entry '{name}' not found in archive"))
    }

    pub(crate) fn entry_unreadable(name: &str, detail: impl std::fmt::Display) -> Self {
        Self::Asset(format!("failed to extract entry '{name}': {detail}"))
    }

    pub(crate) fn image_decode_failed(name: &str, detail: impl std::fmt::Display) -> Self {
        Self::Asset(format!("failed to decode image '{name}': {detail}"))
    }

    // Script errors

    pub(crate) fn script_unreadable(path: &Path, detail: impl std::fmt::Display) -> Self {
        Self::Script(format!("failed to read script {}: {detail}", path.display()))
    }

    pub(crate) fn script_binding(detail: impl std::fmt::Display) -> Self {
        Self::Script(format!("failed to register host functions: {detail}"))
    }

    pub(crate) fn script_run(detail: impl std::fmt::Display) -> Self {
        Self::Script(format!("script execution failed: {detail}"))
    }

    pub(crate) fn script_missing_entry_point(name: &str) -> Self {
        Self::Script(format!("script does not define a '{name}' function"))
    }
}
