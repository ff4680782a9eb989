//! WGSL kernel sources, compiled once into the shared kernel library.

/// Name under which the color-convert + blur kernel is cached.
pub(crate) const COLOR_CONVERT_BLUR: &str = "color_convert_blur";

/// 3x3 Gaussian pre-blur, sRGB → linear → XYZ → LAB, then the per-channel
/// scaling of spec §4.2. One invocation per pixel.
///
/// Binding layout:
///   0: `params` (uniform) — width, height, lightness_scale, green_axis_scale
///   1: `src_rgba` (storage, read) — one packed RGBA8 `u32` per pixel
///   2: `out_lab` (storage, read_write) — 3 `f32`s per pixel (L, a, b)
///   3: `out_alpha` (storage, read_write) — 1 `f32` per pixel
pub(crate) const COLOR_CONVERT_BLUR_SRC: &str = r#"
struct Params {
    width: u32,
    height: u32,
    lightness_scale: f32,
    green_axis_scale: f32,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> src_rgba: array<u32>;
@group(0) @binding(2) var<storage, read_write> out_lab: array<f32>;
@group(0) @binding(3) var<storage, read_write> out_alpha: array<f32>;

fn unpack_rgba(packed: u32) -> vec4<f32> {
    let r = f32(packed & 0xFFu) / 255.0;
    let g = f32((packed >> 8u) & 0xFFu) / 255.0;
    let b = f32((packed >> 16u) & 0xFFu) / 255.0;
    let a = f32((packed >> 24u) & 0xFFu) / 255.0;
    return vec4<f32>(r, g, b, a);
}

// Composite over opaque white so transparent regions cluster as white
// rather than black (spec §3 "Image (input)").
fn composite_over_white(c: vec4<f32>) -> vec3<f32> {
    let white = vec3<f32>(1.0, 1.0, 1.0);
    return c.rgb * c.a + white * (1.0 - c.a);
}

fn srgb_to_linear_channel(c: f32) -> f32 {
    if (c <= 0.04045) {
        return c / 12.92;
    }
    return pow((c + 0.055) / 1.055, 2.4);
}

fn srgb_to_xyz(c: vec3<f32>) -> vec3<f32> {
    let lin = vec3<f32>(
        srgb_to_linear_channel(c.r),
        srgb_to_linear_channel(c.g),
        srgb_to_linear_channel(c.b),
    );
    // sRGB D65 matrix.
    let x = lin.r * 0.4124564 + lin.g * 0.3575761 + lin.b * 0.1804375;
    let y = lin.r * 0.2126729 + lin.g * 0.7151522 + lin.b * 0.0721750;
    let z = lin.r * 0.0193339 + lin.g * 0.1191920 + lin.b * 0.9503041;
    return vec3<f32>(x, y, z);
}

fn f_xyz(t: f32) -> f32 {
    let delta = 6.0 / 29.0;
    if (t > delta * delta * delta) {
        return pow(t, 1.0 / 3.0);
    }
    return t / (3.0 * delta * delta) + 4.0 / 29.0;
}

// D65 reference white.
const WHITE_X: f32 = 0.95047;
const WHITE_Y: f32 = 1.0;
const WHITE_Z: f32 = 1.08883;

fn xyz_to_lab(xyz: vec3<f32>) -> vec3<f32> {
    let fx = f_xyz(xyz.x / WHITE_X);
    let fy = f_xyz(xyz.y / WHITE_Y);
    let fz = f_xyz(xyz.z / WHITE_Z);
    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let b = 200.0 * (fy - fz);
    return vec3<f32>(l, a, b);
}

fn sample_rgb(x: i32, y: i32) -> vec3<f32> {
    let cx = clamp(x, 0, i32(params.width) - 1);
    let cy = clamp(y, 0, i32(params.height) - 1);
    let idx = u32(cy) * params.width + u32(cx);
    return composite_over_white(unpack_rgba(src_rgba[idx]));
}

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.width || gid.y >= params.height) {
        return;
    }
    let x = i32(gid.x);
    let y = i32(gid.y);

    // 3x3 Gaussian kernel, sigma ~1.
    var sum = vec3<f32>(0.0, 0.0, 0.0);
    let weights = array<f32, 9>(
        1.0, 2.0, 1.0,
        2.0, 4.0, 2.0,
        1.0, 2.0, 1.0,
    );
    var total_weight = 0.0;
    for (var j = -1; j <= 1; j = j + 1) {
        for (var i = -1; i <= 1; i = i + 1) {
            let w = weights[u32((j + 1) * 3 + (i + 1))];
            sum = sum + sample_rgb(x + i, y + j) * w;
            total_weight = total_weight + w;
        }
    }
    let blurred = sum / total_weight;

    let lab = xyz_to_lab(srgb_to_xyz(blurred));
    var l_out = lab.x * params.lightness_scale;
    var a_out = lab.y;
    if (a_out < 0.0) {
        a_out = a_out * params.green_axis_scale;
    }
    let b_out = lab.z;

    let idx = gid.y * params.width + gid.x;
    out_lab[idx * 3u] = l_out;
    out_lab[idx * 3u + 1u] = a_out;
    out_lab[idx * 3u + 2u] = b_out;

    let original = unpack_rgba(src_rgba[idx]);
    out_alpha[idx] = original.a;
}
"#;
