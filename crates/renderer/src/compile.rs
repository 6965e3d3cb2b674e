use std::borrow::Cow;

use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::ShaderStage;

/// Raised when a scene or effect program cannot be turned into a pipeline.
///
/// Parse and validation diagnostics come from naga before any GPU work is
/// submitted; `Device` covers whatever the driver rejects afterwards.
#[derive(Debug, thiserror::Error)]
pub enum ShaderBuildError {
    #[error("failed to parse `{label}` shader:\n{diagnostic}")]
    Parse { label: String, diagnostic: String },
    #[error("`{label}` shader failed validation:\n{diagnostic}")]
    Validation { label: String, diagnostic: String },
    #[error("GPU rejected `{label}` program: {message}")]
    Device { label: String, message: String },
}

/// Where the host writes each program input, if the program reads it at all.
///
/// `None` marks an input the shader never references; uploads to it are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocations {
    /// Vertex attribute slot of the clip-space position.
    pub position: Option<u32>,
    /// Byte offset of `u_time` inside the uniform block.
    pub time: Option<wgpu::BufferAddress>,
    /// Byte offset of `u_resolution` inside the uniform block.
    pub resolution: Option<wgpu::BufferAddress>,
}

impl UniformLocations {
    /// Resolves locations from the user's fragment source (before wrapping).
    pub fn resolve(fragment: &str) -> Self {
        let sanitized = sanitize_scene_fragment(fragment);
        let time = references_identifier(&sanitized, "u_time");
        // The gl_FragCoord shim reads the resolution.
        let resolution = references_identifier(&sanitized, "u_resolution")
            || references_identifier(&sanitized, "gl_FragCoord");
        Self {
            position: Some(POSITION_ATTRIBUTE),
            time: time.then_some(crate::gpu::TIME_OFFSET),
            resolution: resolution.then_some(crate::gpu::RESOLUTION_OFFSET),
        }
    }
}

pub(crate) const POSITION_ATTRIBUTE: u32 = 0;

/// Parses and validates GLSL with naga so failures carry readable diagnostics.
pub(crate) fn validate_glsl(
    label: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<(), ShaderBuildError> {
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(stage), source)
        .map_err(|errors| ShaderBuildError::Parse {
            label: label.to_string(),
            diagnostic: errors.emit_to_string(source),
        })?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| ShaderBuildError::Validation {
            label: label.to_string(),
            diagnostic: error.emit_to_string(source),
        })?;
    Ok(())
}

/// Compiles validated GLSL into a module, surfacing device errors synchronously.
pub(crate) fn compile_module(
    device: &wgpu::Device,
    label: &str,
    stage: ShaderStage,
    source: String,
) -> Result<wgpu::ShaderModule, ShaderBuildError> {
    validate_glsl(label, stage, &source)?;
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source),
            stage,
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(ShaderBuildError::Device {
            label: label.to_string(),
            message: error.to_string(),
        }),
        None => Ok(module),
    }
}

/// Compiles the position pass-through vertex stage shared by every program.
pub(crate) fn compile_vertex_shader(
    device: &wgpu::Device,
) -> Result<wgpu::ShaderModule, ShaderBuildError> {
    compile_module(
        device,
        "fullscreen quad vertex",
        ShaderStage::Vertex,
        VERTEX_SHADER_GLSL.to_string(),
    )
}

/// Validates the shared vertex stage without a device.
pub(crate) fn validate_vertex_shader() -> Result<(), ShaderBuildError> {
    validate_glsl("fullscreen quad vertex", ShaderStage::Vertex, VERTEX_SHADER_GLSL)
}

/// Wraps a scene's fragment source and compiles it.
pub(crate) fn compile_scene_fragment(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, ShaderBuildError> {
    compile_module(
        device,
        label,
        ShaderStage::Fragment,
        wrap_scene_fragment(source),
    )
}

/// Produces a self-contained GLSL 450 fragment shader from scene code.
///
/// Scene code is written the WebGL way: it reads `u_time`, `u_resolution`
/// and `gl_FragCoord` (bottom-left origin) and assigns `gl_FragColor`. We
/// strip the version/precision boilerplate and any `u_*` uniform
/// declarations, then prepend [`SCENE_HEADER`] which maps those names onto
/// the uniform block and the output variable.
pub(crate) fn wrap_scene_fragment(source: &str) -> String {
    format!(
        "{SCENE_HEADER}\n{sanitized}",
        sanitized = sanitize_scene_fragment(source)
    )
}

fn sanitize_scene_fragment(source: &str) -> String {
    let mut sanitized = String::with_capacity(source.len());
    let mut guard = GlEsGuard::default();
    let mut skipped_version = false;
    for line in source.lines() {
        let trimmed = line.trim_start();
        if !skipped_version && trimmed.starts_with("#version") {
            skipped_version = true;
            continue;
        }
        match guard.filter(trimmed) {
            GuardLine::Drop => continue,
            GuardLine::Emit(directive) => {
                sanitized.push_str(&directive);
                sanitized.push('\n');
                continue;
            }
            GuardLine::Keep => {}
        }
        if trimmed.starts_with("precision ") {
            continue;
        }
        let declares_builtin_uniform = trimmed.starts_with("uniform ")
            && (references_identifier(trimmed, "u_time")
                || references_identifier(trimmed, "u_resolution"));
        if declares_builtin_uniform {
            continue;
        }
        sanitized.push_str(line);
        sanitized.push('\n');
    }
    sanitized
}

enum GuardLine {
    Keep,
    Drop,
    Emit(String),
}

/// Tracks an `#ifdef GL_ES` block.
///
/// The GL_ES branch is dropped, nested conditionals included. An `#else`
/// branch is kept as plain code; an `#elif` branch is reopened as `#if`.
#[derive(Debug, Default)]
struct GlEsGuard {
    active: bool,
    depth: usize,
    keeping: bool,
    reopened: bool,
}

impl GlEsGuard {
    fn filter(&mut self, trimmed: &str) -> GuardLine {
        if !self.active {
            if trimmed.starts_with("#ifdef GL_ES") {
                self.active = true;
                return GuardLine::Drop;
            }
            return GuardLine::Keep;
        }
        match trimmed.strip_prefix('#').map(str::trim_start) {
            Some(directive) if directive.starts_with("if") => self.depth += 1,
            Some(directive) if directive.starts_with("endif") => {
                if self.depth == 0 {
                    let reopened = self.reopened;
                    *self = Self::default();
                    return if reopened {
                        GuardLine::Emit("#endif".to_string())
                    } else {
                        GuardLine::Drop
                    };
                }
                self.depth -= 1;
            }
            Some(directive) if self.depth == 0 && !self.keeping => {
                if let Some(condition) = directive.strip_prefix("elif") {
                    self.keeping = true;
                    self.reopened = true;
                    return GuardLine::Emit(format!("#if {}", condition.trim()));
                }
                if directive.starts_with("else") {
                    self.keeping = true;
                    return GuardLine::Drop;
                }
            }
            _ => {}
        }
        if self.keeping {
            GuardLine::Keep
        } else {
            GuardLine::Drop
        }
    }
}

/// Whole-word search, so `u_timeline` does not count as `u_time`.
fn references_identifier(source: &str, ident: &str) -> bool {
    let is_ident_char = |c: char| c.is_ascii_alphanumeric() || c == '_';
    source.match_indices(ident).any(|(start, _)| {
        let before = source[..start].chars().next_back();
        let after = source[start + ident.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

/// GLSL prologue injected ahead of every scene fragment shader.
///
/// The uniform block layout must match `FrameUniforms` in the gpu module.
const SCENE_HEADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform SceneParams {
    vec2 _u_resolution;
    float _u_time;
    float _padding0;
} params;

#define u_resolution params._u_resolution
#define u_time params._u_time

vec4 scene_frag_coord() {
    return vec4(v_uv * u_resolution, 0.0, 1.0);
}

#define gl_FragCoord scene_frag_coord()
#define gl_FragColor outColor
";

/// Vertex stage for the six-vertex fullscreen quad.
///
/// `v_uv` spans [0, 1] with the origin in the bottom-left corner.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = a_position * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    const WEBGL_SCENE: &str = r#"#ifdef GL_ES
precision mediump float;
#endif
uniform mediump vec2 u_resolution;
uniform mediump float u_time;
void main() {
  vec2 uv = gl_FragCoord.xy / u_resolution;
  gl_FragColor = vec4(uv, 0.5 + 0.5 * sin(u_time), 1.0);
}
"#;

    #[test]
    fn wrap_strips_webgl_boilerplate() {
        let wrapped = wrap_scene_fragment(WEBGL_SCENE);
        assert!(!wrapped.contains("precision mediump"));
        assert!(!wrapped.contains("#ifdef GL_ES"));
        assert!(!wrapped.contains("uniform mediump float u_time"));
        assert!(!wrapped.contains("uniform mediump vec2 u_resolution"));
        assert_eq!(wrapped.matches("#version").count(), 1);
        assert!(wrapped.contains("gl_FragColor = vec4(uv"));
    }

    #[test]
    fn gl_es_guard_keeps_else_branch() {
        let source = "#ifdef GL_ES\nprecision mediump float;\n#else\n#define DESKTOP 1\n#endif\nvoid main() {}\n";
        assert_eq!(
            sanitize_scene_fragment(source),
            "#define DESKTOP 1\nvoid main() {}\n"
        );
    }

    #[test]
    fn gl_es_guard_skips_nested_conditionals() {
        let source = r"#ifdef GL_ES
#if __VERSION__ < 300
precision lowp float;
#endif
#define MOBILE 1
#endif
void main() { gl_FragColor = vec4(1.0); }
";
        let sanitized = sanitize_scene_fragment(source);
        assert_eq!(sanitized, "void main() { gl_FragColor = vec4(1.0); }\n");
        let wrapped = wrap_scene_fragment(source);
        validate_glsl("nested guard", ShaderStage::Fragment, &wrapped).unwrap();
    }

    #[test]
    fn gl_es_guard_reopens_elif_branch() {
        let source = "#ifdef GL_ES\nprecision mediump float;\n#elif defined(DESKTOP)\n#define WIDE 1\n#else\n#define NARROW 1\n#endif\n";
        assert_eq!(
            sanitize_scene_fragment(source),
            "#if defined(DESKTOP)\n#define WIDE 1\n#else\n#define NARROW 1\n#endif\n"
        );
    }

    #[test]
    fn wrapped_scene_passes_naga_validation() {
        let wrapped = wrap_scene_fragment(WEBGL_SCENE);
        validate_glsl("webgl scene", ShaderStage::Fragment, &wrapped).unwrap();
    }

    #[test]
    fn vertex_shader_passes_naga_validation() {
        validate_vertex_shader().unwrap();
    }

    #[test]
    fn broken_scene_reports_parse_error() {
        let wrapped = wrap_scene_fragment("void main() { gl_FragColor = vec4(1.0) }");
        let err = validate_glsl("broken", ShaderStage::Fragment, &wrapped).unwrap_err();
        assert!(matches!(err, ShaderBuildError::Parse { ref label, .. } if label == "broken"));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn locations_follow_references() {
        let locations = UniformLocations::resolve(WEBGL_SCENE);
        assert_eq!(locations.position, Some(POSITION_ATTRIBUTE));
        assert_eq!(locations.time, Some(crate::gpu::TIME_OFFSET));
        assert_eq!(locations.resolution, Some(crate::gpu::RESOLUTION_OFFSET));

        let constant = UniformLocations::resolve(
            "uniform float u_time;\nvoid main() { gl_FragColor = vec4(1.0); }\n",
        );
        assert_eq!(constant.time, None);
        assert_eq!(constant.resolution, None);
    }

    #[test]
    fn frag_coord_implies_resolution() {
        let locations =
            UniformLocations::resolve("void main() { gl_FragColor = gl_FragCoord / 100.0; }");
        assert_eq!(locations.resolution, Some(crate::gpu::RESOLUTION_OFFSET));
        assert_eq!(locations.time, None);
    }

    #[test]
    fn identifier_search_is_whole_word() {
        assert!(references_identifier("x = u_time;", "u_time"));
        assert!(!references_identifier("x = u_timeline;", "u_time"));
        assert!(!references_identifier("x = my_u_time;", "u_time"));
    }
}
