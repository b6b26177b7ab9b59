//! Where the WGSL programs come from.

use std::path::PathBuf;

use crate::error::SetupError;

const COMPUTE_FILE: &str = "compute.wgsl";
const VERTEX_FILE: &str = "vertex.wgsl";
const FRAGMENT_FILE: &str = "fragment.wgsl";

/// Supplies program text once at startup.
pub trait ShaderSource {
    /// The cell-update program, without the work-group size prelude.
    fn compute_source(&self) -> Result<String, SetupError>;

    /// Vertex and fragment stages as one module.
    fn render_source(&self) -> Result<String, SetupError>;
}

/// Programs compiled into the binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedShaders;

impl ShaderSource for EmbeddedShaders {
    fn compute_source(&self) -> Result<String, SetupError> {
        Ok(include_str!("compute.wgsl").to_owned())
    }

    fn render_source(&self) -> Result<String, SetupError> {
        Ok(concat!(include_str!("vertex.wgsl"), "\n", include_str!("fragment.wgsl")).to_owned())
    }
}

/// Programs read from a directory holding `compute.wgsl`, `vertex.wgsl` and
/// `fragment.wgsl`, for iterating on shaders without rebuilding.
#[derive(Clone, Debug)]
pub struct ShaderDirectory {
    dir: PathBuf,
}

impl ShaderDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read(&self, file: &str) -> Result<String, SetupError> {
        let path = self.dir.join(file);
        log::debug!("loading shader {}", path.display());
        std::fs::read_to_string(&path).map_err(|source| SetupError::ShaderSource { path, source })
    }
}

impl ShaderSource for ShaderDirectory {
    fn compute_source(&self) -> Result<String, SetupError> {
        self.read(COMPUTE_FILE)
    }

    fn render_source(&self) -> Result<String, SetupError> {
        Ok(format!(
            "{}\n{}",
            self.read(VERTEX_FILE)?,
            self.read(FRAGMENT_FILE)?
        ))
    }
}

/// Prefix the update program with the work-group size the host dispatches with.
pub fn compute_program(source: &str, work_group_size: u32) -> String {
    format!("const WORK_GROUP_SIZE: u32 = {work_group_size}u;\n{source}")
}

/// Parse and validate WGSL so a broken program is reported as a setup error
/// rather than surfacing later as a device error.
pub fn validate_wgsl(label: &'static str, source: &str) -> Result<(), SetupError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| SetupError::ShaderCompilation {
        label,
        message: e.emit_to_string(source),
    })?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| SetupError::ShaderCompilation {
        label,
        message: e.emit_to_string(source),
    })?;
    Ok(())
}
