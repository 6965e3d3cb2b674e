use std::fmt::Write as _;

use crate::chain::{Effect, GodraysParams};
use crate::expr::glsl_float;
use crate::EffectError;

/// Binding of the first channel texture inside the pass bind group (set 1).
///
/// Bindings 0 and 1 hold the pass input texture and its sampler; channel `i`
/// occupies `BASE + i * 2` (texture) and `BASE + i * 2 + 1` (sampler).
pub const PASS_CHANNEL_BINDING_BASE: u32 = 2;
pub const PASS_BINDINGS_PER_CHANNEL: u32 = 2;

/// Builds the complete GLSL 450 fragment shader for one compositor pass.
///
/// `None` produces a pass-through copy of the input texture.
pub fn fragment_source(
    effect: Option<&Effect>,
    channel_count: usize,
) -> Result<String, EffectError> {
    let mut source = prelude(channel_count);
    let body = match effect {
        None => PASSTHROUGH_BODY.to_string(),
        Some(Effect::Brightness { amount }) => format!(
            "void main() {{\n    vec4 color = source_color(v_uv);\n    float amount = {};\n    outColor = vec4(color.rgb + vec3(amount), color.a);\n}}\n",
            amount.to_glsl(channel_count)?
        ),
        Some(Effect::Contrast { amount }) => format!(
            "void main() {{\n    vec4 color = source_color(v_uv);\n    float amount = {};\n    vec3 centered = color.rgb - vec3(0.5);\n    outColor = vec4(centered * vec3(1.0 + amount) + vec3(0.5), color.a);\n}}\n",
            amount.to_glsl(channel_count)?
        ),
        Some(Effect::Godrays(params)) => godrays_body(params)?,
    };
    source.push_str(&body);
    Ok(source)
}

fn prelude(channel_count: usize) -> String {
    let mut prelude = String::from(PRELUDE_HEADER);
    for index in 0..channel_count {
        let texture_binding =
            PASS_CHANNEL_BINDING_BASE + index as u32 * PASS_BINDINGS_PER_CHANNEL;
        let _ = writeln!(
            prelude,
            "layout(set = 1, binding = {texture_binding}) uniform texture2D channel{index}_texture;"
        );
        let _ = writeln!(
            prelude,
            "layout(set = 1, binding = {}) uniform sampler channel{index}_sampler;",
            texture_binding + 1
        );
    }
    prelude.push('\n');
    prelude.push_str(SOURCE_HELPER);
    for index in 0..channel_count {
        let _ = writeln!(
            prelude,
            "vec4 channel{index}_color() {{\n    return textureLod(sampler2D(channel{index}_texture, channel{index}_sampler), texel_uv(v_uv), 0.0);\n}}"
        );
    }
    prelude.push('\n');
    prelude
}

fn godrays_body(params: &GodraysParams) -> Result<String, EffectError> {
    let [light_x, light_y] = params.light_position;
    Ok(format!(
        r"const vec2 GODRAYS_LIGHT = vec2({light_x}, {light_y});
const int GODRAYS_SAMPLES = {samples};
const float GODRAYS_DENSITY = {density};
const float GODRAYS_WEIGHT = {weight};
const float GODRAYS_DECAY = {decay};
const float GODRAYS_EXPOSURE = {exposure};
const float GODRAYS_THRESHOLD = {threshold};

float godrays_emission(vec2 uv) {{
    vec3 rgb = source_color(uv).rgb;
    float luminance = dot(rgb, vec3(0.2126, 0.7152, 0.0722));
    return max(luminance - GODRAYS_THRESHOLD, 0.0);
}}

void main() {{
    vec4 base = source_color(v_uv);
    vec2 step_uv = (v_uv - GODRAYS_LIGHT) * (GODRAYS_DENSITY / float(GODRAYS_SAMPLES));
    vec2 uv = v_uv;
    float illumination = 1.0;
    float shafts = 0.0;
    for (int i = 0; i < GODRAYS_SAMPLES; i++) {{
        uv -= step_uv;
        shafts += godrays_emission(uv) * illumination * GODRAYS_WEIGHT;
        illumination *= GODRAYS_DECAY;
    }}
    outColor = vec4(base.rgb + vec3(shafts * GODRAYS_EXPOSURE), base.a);
}}
",
        light_x = glsl_float(light_x, "light_position")?,
        light_y = glsl_float(light_y, "light_position")?,
        samples = params.samples,
        density = glsl_float(params.density, "density")?,
        weight = glsl_float(params.weight, "weight")?,
        decay = glsl_float(params.decay, "decay")?,
        exposure = glsl_float(params.exposure, "exposure")?,
        threshold = glsl_float(params.threshold, "threshold")?,
    ))
}

/// Shared declarations for every pass. The uniform block layout must match
/// `FrameUniforms` in the renderer.
const PRELUDE_HEADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform PassParams {
    vec2 _u_resolution;
    float _u_time;
    float _padding0;
} params;

#define u_resolution params._u_resolution
#define u_time params._u_time

layout(set = 1, binding = 0) uniform texture2D source_texture;
layout(set = 1, binding = 1) uniform sampler source_sampler;
";

/// `v_uv` has a bottom-left origin while texture rows are stored top-down.
const SOURCE_HELPER: &str = r"vec2 texel_uv(vec2 uv) {
    return vec2(uv.x, 1.0 - uv.y);
}

vec4 source_color(vec2 uv) {
    return textureLod(sampler2D(source_texture, source_sampler), texel_uv(uv), 0.0);
}
";

const PASSTHROUGH_BODY: &str = r"void main() {
    outColor = source_color(v_uv);
}
";
