//! CPU rasterizer.
//!
//! Good enough for snapshots and golden images: discs for points and spheres,
//! sampled segments for lines, the plasma function for the shader quad. Rows
//! of the shader quad are shaded in parallel with the `parallel` feature.

use std::io::{self, Write};

use glam::Vec2;

use crate::camera::CameraTransform;
use crate::error::RenderError;
use crate::render::{DrawPrimitive, Frame, RenderBackend};
use crate::shader::{shade, ShaderUniforms};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// RGBA8 pixels, row-major, origin top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        let c = to_rgba8(color);
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&c);
        }
    }

    fn blend(&mut self, x: i32, y: i32, color: [f32; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        blend_into(&mut self.pixels[i..i + 4], color);
    }

    /// Binary PPM (P6), alpha composited over black.
    pub fn write_ppm<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for px in self.pixels.chunks_exact(4) {
            let a = px[3] as u32;
            for &c in &px[..3] {
                rgb.push(((c as u32 * a + 127) / 255) as u8);
            }
        }
        out.write_all(&rgb)?;
        out.flush()
    }
}

fn to_rgba8(c: [f32; 4]) -> [u8; 4] {
    c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Source-over blend of a straight-alpha color onto an RGBA8 pixel.
fn blend_into(dst: &mut [u8], color: [f32; 4]) {
    let a = color[3].clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = a + dst_a * (1.0 - a);
    for ch in 0..3 {
        let d = dst[ch] as f32 / 255.0;
        let s = color[ch].clamp(0.0, 1.0);
        let v = if out_a > 0.0 {
            (s * a + d * dst_a * (1.0 - a)) / out_a
        } else {
            0.0
        };
        dst[ch] = (v * 255.0).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

fn shade_row(row: &mut [u8], y: u32, uniforms: &ShaderUniforms) {
    for (x, px) in row.chunks_exact_mut(4).enumerate() {
        blend_into(px, shade(Vec2::new(x as f32, y as f32), uniforms));
    }
}

fn shade_quad(fb: &mut Framebuffer, uniforms: &ShaderUniforms) {
    let stride = fb.width as usize * 4;
    if stride == 0 {
        return;
    }
    #[cfg(feature = "parallel")]
    fb.pixels
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| shade_row(row, y as u32, uniforms));

    #[cfg(not(feature = "parallel"))]
    fb.pixels
        .chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| shade_row(row, y as u32, uniforms));
}

fn fill_disc(fb: &mut Framebuffer, center: Vec2, radius: f32, color: [f32; 4]) {
    // Always cover at least one pixel so tiny points stay visible.
    let r = radius.max(0.5);
    let (x0, x1) = ((center.x - r).floor() as i32, (center.x + r).ceil() as i32);
    let (y0, y1) = ((center.y - r).floor() as i32, (center.y + r).ceil() as i32);
    let r2 = r * r;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
            if d.length_squared() <= r2 {
                fb.blend(x, y, color);
            }
        }
    }
}

fn draw_segment(fb: &mut Framebuffer, a: Vec2, b: Vec2, color: [f32; 4]) {
    let steps = a.distance(b).ceil().max(1.0) as i32;
    for i in 0..=steps {
        let p = a.lerp(b, i as f32 / steps as f32);
        fb.blend(p.x.floor() as i32, p.y.floor() as i32, color);
    }
}

/// Depth used for back-to-front ordering; larger is farther.
fn depth_of(prim: &DrawPrimitive, camera: &CameraTransform) -> f32 {
    let point = match prim {
        DrawPrimitive::Point { position, .. } => *position,
        DrawPrimitive::Sphere { center, .. } => *center,
        DrawPrimitive::Line { from, to, .. } => (*from + *to) * 0.5,
        // Background.
        DrawPrimitive::FullscreenQuad { .. } => return f32::INFINITY,
    };
    camera.project(point).map_or(f32::NEG_INFINITY, |(_, z)| z)
}

pub fn rasterize(fb: &mut Framebuffer, frame: &Frame) {
    fb.clear(frame.clear);
    composite(fb, frame);
}

/// Draw `frame`'s primitives over the current contents, back to front.
pub fn composite(fb: &mut Framebuffer, frame: &Frame) {
    let camera = &frame.camera;

    let mut order: Vec<(f32, &DrawPrimitive)> =
        frame.primitives.iter().map(|p| (depth_of(p, camera), p)).collect();
    order.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (_, prim) in order {
        match *prim {
            DrawPrimitive::FullscreenQuad { ref uniforms } => shade_quad(fb, uniforms),
            DrawPrimitive::Point {
                position,
                size,
                color,
            } => {
                if let Some((px, _)) = camera.project(position) {
                    fill_disc(fb, px, camera.projected_radius(position, size * 0.5), color);
                }
            }
            DrawPrimitive::Sphere {
                center,
                radius,
                color,
            } => {
                if let Some((px, _)) = camera.project(center) {
                    fill_disc(fb, px, camera.projected_radius(center, radius), color);
                }
            }
            DrawPrimitive::Line { from, to, color } => {
                if let (Some((a, _)), Some((b, _))) = (camera.project(from), camera.project(to)) {
                    draw_segment(fb, a, b, color);
                }
            }
        }
    }
}

/// Rasterizes each frame into an owned framebuffer.
#[derive(Debug)]
pub struct SoftwareBackend {
    framebuffer: Framebuffer,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            framebuffer: Framebuffer::new(width, height),
        }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }
}

impl RenderBackend for SoftwareBackend {
    fn name(&self) -> &'static str {
        if cfg!(feature = "parallel") {
            "software-parallel"
        } else {
            "software"
        }
    }

    fn submit(&mut self, frame: &Frame) -> Result<(), RenderError> {
        let vp = frame.viewport();
        if vp.width != self.framebuffer.width || vp.height != self.framebuffer.height {
            return Err(RenderError::SizeMismatch {
                expected_w: vp.width,
                expected_h: vp.height,
                actual_w: self.framebuffer.width,
                actual_h: self.framebuffer.height,
            });
        }
        rasterize(&mut self.framebuffer, frame);
        Ok(())
    }

    fn framebuffer(&self) -> Option<&Framebuffer> {
        Some(&self.framebuffer)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.framebuffer.width, self.framebuffer.height) {
            self.framebuffer = Framebuffer::new(width, height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraConfig, Viewport};
    use crate::params::ShaderParams;
    use glam::Vec3;

    fn frame(primitives: Vec<DrawPrimitive>, w: u32, h: u32) -> Frame {
        Frame {
            camera: CameraTransform::new(CameraConfig::default(), Viewport::new(w, h)),
            clear: [0.0, 0.0, 0.0, 0.0],
            primitives,
            elapsed: 0.0,
        }
    }

    #[test]
    fn shader_quad_alpha_is_opacity_everywhere() {
        let uniforms = ShaderUniforms::new(&ShaderParams::default(), 1.0, Viewport::new(16, 12));
        let mut backend = SoftwareBackend::new(16, 12);
        backend
            .submit(&frame(vec![DrawPrimitive::FullscreenQuad { uniforms }], 16, 12))
            .unwrap();
        let fb = backend.framebuffer();
        for y in 0..12 {
            for x in 0..16 {
                assert_eq!(fb.pixel(x, y)[3], 153);
            }
        }
        // The rasterizer reproduces `shade` at the pixel.
        let expected = to_rgba8(shade(Vec2::new(3.0, 4.0), &uniforms));
        let got = fb.pixel(3, 4);
        for ch in 0..3 {
            assert!((got[ch] as i32 - expected[ch] as i32).abs() <= 1, "channel {ch}");
        }
    }

    #[test]
    fn sphere_at_origin_covers_center_pixel() {
        let mut backend = SoftwareBackend::new(64, 64);
        let sphere = DrawPrimitive::Sphere {
            center: Vec3::ZERO,
            radius: 0.5,
            color: [1.0, 0.0, 0.0, 1.0],
        };
        backend.submit(&frame(vec![sphere], 64, 64)).unwrap();
        assert_eq!(backend.framebuffer().pixel(32, 32), [255, 0, 0, 255]);
        assert_eq!(backend.framebuffer().pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn golden_disc_and_segments() {
        const GOLDEN: [&str; 6] = [
            "...B..",
            "..RM..",
            ".RRMR.",
            ".RRMR.",
            "..RM..",
            "BBBBBB",
        ];
        let mut fb = Framebuffer::new(6, 6);
        fb.clear([0.0, 0.0, 0.0, 1.0]);
        fill_disc(&mut fb, Vec2::new(3.0, 3.0), 2.0, [1.0, 0.0, 0.0, 1.0]);
        let glaze = [0.0, 0.0, 1.0, 0.5];
        draw_segment(&mut fb, Vec2::new(3.5, 0.5), Vec2::new(3.5, 4.5), glaze);
        draw_segment(&mut fb, Vec2::new(0.5, 5.5), Vec2::new(5.5, 5.5), glaze);

        for (y, row) in GOLDEN.iter().enumerate() {
            for (x, cell) in row.chars().enumerate() {
                let expected = match cell {
                    '.' => [0, 0, 0, 255],
                    'R' => [255, 0, 0, 255],
                    'B' => [0, 0, 128, 255],
                    'M' => [128, 0, 128, 255],
                    other => panic!("bad golden cell {other}"),
                };
                assert_eq!(fb.pixel(x as u32, y as u32), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn size_mismatch_is_reported() {
        let mut backend = SoftwareBackend::new(10, 10);
        let err = backend.submit(&frame(Vec::new(), 20, 10)).unwrap_err();
        assert!(matches!(err, RenderError::SizeMismatch { expected_w: 20, .. }));
    }

    #[test]
    fn ppm_header_and_size() {
        let mut fb = Framebuffer::new(3, 2);
        fb.clear([1.0, 1.0, 1.0, 1.0]);
        let mut bytes = Vec::new();
        fb.write_ppm(&mut bytes).unwrap();
        assert!(bytes.starts_with(b"P6\n3 2\n255\n"));
        assert_eq!(bytes.len(), b"P6\n3 2\n255\n".len() + 3 * 2 * 3);
        assert!(bytes[bytes.len() - 3..].iter().all(|&b| b == 255));
    }
}
