//! Embedded GLSL for the field and liquid passes.
//!
//! The sources are static string constants compiled through naga's GLSL
//! front-end; no caller ever supplies shader text, so a compile failure here
//! is a defect in this crate and surfaces as a `wgpu` validation panic at
//! construction rather than a recoverable error.
//!
//! The uniform block layouts must match the Pod mirrors in
//! [`crate::uniforms`], and the field math must stay in lockstep with the CPU
//! reference in [`crate::field`].

use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the pixel-field fragment shader.
pub(crate) fn compile_field_fragment(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("pixel field fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(FIELD_FRAGMENT_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Compiles the liquid displacement post-process fragment shader.
pub(crate) fn compile_liquid_fragment(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("liquid displacement fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(LIQUID_FRAGMENT_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Minimal full-screen triangle vertex shader shared by both passes.
const VERTEX_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// The pixel-field pass: fractal noise, center-grow reveal, ripple rings,
/// ordered dithering, per-cell jitter, shape masking, and edge fade.
const FIELD_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

const int MAX_CLICKS = 10;

layout(std140, set = 0, binding = 0) uniform FieldParams {
    vec4 _resolution;
    vec4 _base_color;
    float _time;
    float _pixel_size;
    float _pattern_scale;
    float _pattern_density;
    float _pixel_jitter;
    float _edge_fade;
    float _ripple_speed;
    float _ripple_thickness;
    float _ripple_intensity;
    float _center_grow;
    int _shape;
    int _ripples_enabled;
    vec4 _clicks[MAX_CLICKS];
} ubo;

float bayer2(vec2 a) {
    a = floor(a);
    return fract(a.x / 2.0 + a.y * a.y * 0.75);
}

float bayer4(vec2 a) { return bayer2(0.5 * a) * 0.25 + bayer2(a); }
float bayer8(vec2 a) { return bayer4(0.5 * a) * 0.25 + bayer2(a); }

float hash11(float n) { return fract(sin(n) * 43758.5453); }

float vnoise(vec3 p) {
    vec3 ip = floor(p);
    vec3 fp = fract(p);
    float n000 = hash11(dot(ip, vec3(1.0, 57.0, 113.0)));
    float n100 = hash11(dot(ip + vec3(1.0, 0.0, 0.0), vec3(1.0, 57.0, 113.0)));
    float n010 = hash11(dot(ip + vec3(0.0, 1.0, 0.0), vec3(1.0, 57.0, 113.0)));
    float n110 = hash11(dot(ip + vec3(1.0, 1.0, 0.0), vec3(1.0, 57.0, 113.0)));
    float n001 = hash11(dot(ip + vec3(0.0, 0.0, 1.0), vec3(1.0, 57.0, 113.0)));
    float n101 = hash11(dot(ip + vec3(1.0, 0.0, 1.0), vec3(1.0, 57.0, 113.0)));
    float n011 = hash11(dot(ip + vec3(0.0, 1.0, 1.0), vec3(1.0, 57.0, 113.0)));
    float n111 = hash11(dot(ip + vec3(1.0, 1.0, 1.0), vec3(1.0, 57.0, 113.0)));
    vec3 w = fp * fp * fp * (fp * (fp * 6.0 - 15.0) + 10.0);
    return mix(mix(mix(n000, n100, w.x), mix(n010, n110, w.x), w.y),
               mix(mix(n001, n101, w.x), mix(n011, n111, w.x), w.y), w.z) * 2.0 - 1.0;
}

// Five octaves at 1.25x frequency growth; slower than the usual 2x on
// purpose, which keeps the field soft.
float fbm2(vec2 uv, float t) {
    vec3 p = vec3(uv * ubo._pattern_scale, t);
    float amp = 1.0;
    float freq = 1.0;
    float sum = 1.0;
    for (int i = 0; i < 5; i++) {
        sum += amp * vnoise(p * freq);
        freq *= 1.25;
    }
    return sum * 0.5 + 0.5;
}

float maskCircle(vec2 p, float cov) {
    float r = sqrt(max(cov, 0.0)) * 0.25;
    float d = length(p - 0.5) - r;
    return cov * (1.0 - smoothstep(-fwidth(d) * 0.5, fwidth(d) * 0.5, d * 2.0));
}

// Herringbone tiling: triangle orientation flips on checkerboard parity.
float maskTriangle(vec2 p, vec2 id, float cov) {
    if (mod(id.x + id.y, 2.0) > 0.5) {
        p.x = 1.0 - p.x;
    }
    float d = p.y - sqrt(max(cov, 0.0)) * (1.0 - p.x);
    return cov * clamp(0.5 - d / fwidth(d), 0.0, 1.0);
}

float maskDiamond(vec2 p, float cov) {
    return step(abs(p.x - 0.49) + abs(p.y - 0.49), sqrt(max(cov, 0.0)) * 0.564);
}

void main() {
    vec2 res = ubo._resolution.xy;
    // Flip to a bottom-left origin so click coordinates and the cell math
    // agree with the CPU reference.
    vec2 screen = vec2(gl_FragCoord.x, res.y - gl_FragCoord.y);
    vec2 fragCoord = screen - res * 0.5;
    float aspect = res.x / res.y;

    vec2 pixelId = floor(fragCoord / ubo._pixel_size);
    vec2 pixelUV = fract(fragCoord / ubo._pixel_size);
    float cellSize = 8.0 * ubo._pixel_size;
    vec2 cellId = floor(fragCoord / cellSize);
    vec2 uv = cellId * cellSize / res * vec2(aspect, 1.0);

    vec2 centerDist = screen / res - 0.5;
    float distFromCenter = length(centerDist * vec2(aspect, 1.0));

    float base = fbm2(uv, ubo._time * 0.05) * 0.5 - 0.65;
    float feed = base + (ubo._pattern_density - 0.5) * 0.3;

    if (ubo._center_grow > 0.0) {
        float growRadius = ubo._time * ubo._center_grow * 0.15;
        float radialMask = smoothstep(growRadius, growRadius - 0.3, distFromCenter);
        feed *= radialMask;
    }

    if (ubo._ripples_enabled == 1) {
        for (int i = 0; i < MAX_CLICKS; i++) {
            vec2 pos = ubo._clicks[i].xy;
            if (pos.x < 0.0) {
                continue;
            }
            vec2 cuv = ((pos - res * 0.5 - cellSize * 0.5) / res) * vec2(aspect, 1.0);
            float t = max(ubo._time - ubo._clicks[i].z, 0.0);
            float r = distance(uv, cuv);
            float ring = exp(-pow((r - ubo._ripple_speed * t) / ubo._ripple_thickness, 2.0));
            // Saturating max-blend: ripples only brighten, never darken, and
            // overlapping rings do not compound.
            feed = max(feed, ring * exp(-t) * exp(-10.0 * r) * ubo._ripple_intensity);
        }
    }

    float bayer = bayer8(fragCoord / ubo._pixel_size) - 0.5;
    float bw = step(0.5, feed + bayer);
    float h = fract(sin(dot(pixelId, vec2(127.1, 311.7))) * 43758.5453);
    float coverage = bw * (1.0 + (h - 0.5) * ubo._pixel_jitter);

    float M;
    if (ubo._shape == 1) {
        M = maskCircle(pixelUV, coverage);
    } else if (ubo._shape == 2) {
        M = maskTriangle(pixelUV, pixelId, coverage);
    } else if (ubo._shape == 3) {
        M = maskDiamond(pixelUV, coverage);
    } else {
        M = coverage;
    }

    if (ubo._edge_fade > 0.0) {
        vec2 norm = screen / res;
        float edge = min(min(norm.x, norm.y), min(1.0 - norm.x, 1.0 - norm.y));
        M *= smoothstep(0.0, ubo._edge_fade, edge);
    }

    vec3 base_color = ubo._base_color.rgb;
    vec3 c = mix(base_color * 12.92,
                 1.055 * pow(base_color, vec3(1.0 / 2.4)) - 0.055,
                 step(vec3(0.0031308), base_color));
    outColor = vec4(c, M);
}
";

/// The liquid pass: offsets the scene lookup by the velocity stored in the
/// trail texture (red/green), scaled by the stored intensity (blue) and a
/// sine wobble over time.
const LIQUID_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform LiquidParams {
    vec4 _params; // x = strength, y = time, z = wobble frequency
} ubo;

layout(set = 1, binding = 0) uniform texture2D scene_texture;
layout(set = 1, binding = 1) uniform sampler scene_sampler;
layout(set = 1, binding = 2) uniform texture2D trail_texture;
layout(set = 1, binding = 3) uniform sampler trail_sampler;

void main() {
    // Texture rows run top-down while v_uv has a bottom-left origin.
    vec2 uv = vec2(v_uv.x, 1.0 - v_uv.y);
    vec4 t = texture(sampler2D(trail_texture, trail_sampler), uv);
    float vx = t.r * 2.0 - 1.0;
    float vy = t.g * 2.0 - 1.0;
    float intensity = t.b;
    float wave = 0.5 + 0.5 * sin(ubo._params.y * ubo._params.z + intensity * 6.2831853);
    // Stored velocity is bottom-left based, so y is negated in texture space.
    uv += vec2(vx, -vy) * ubo._params.x * intensity * wave;
    outColor = texture(sampler2D(scene_texture, scene_sampler), uv);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_shader_declares_every_uniform_field() {
        for field in [
            "_resolution",
            "_base_color",
            "_time",
            "_pixel_size",
            "_pattern_scale",
            "_pattern_density",
            "_pixel_jitter",
            "_edge_fade",
            "_ripple_speed",
            "_ripple_thickness",
            "_ripple_intensity",
            "_center_grow",
            "_shape",
            "_ripples_enabled",
            "_clicks",
        ] {
            assert!(
                FIELD_FRAGMENT_GLSL.contains(field),
                "field shader is missing `{field}`"
            );
        }
    }

    #[test]
    fn click_capacity_matches_the_ring_buffer() {
        assert!(FIELD_FRAGMENT_GLSL.contains("const int MAX_CLICKS = 10;"));
        assert_eq!(crate::ripples::MAX_RIPPLES, 10);
    }
}
