pub mod clip;
pub mod program;
pub mod shaders;

use std::ops::BitOr;

use cgmath::{Matrix4 as Mat4, Vector3 as Vec3, Vector4 as Vec4};
use log::debug;

use crate::framebuffer::{FrameBuffer, WHITE, pack_color};
use crate::rasterizer;
use crate::scene::Scene;
use crate::vertex::{ClipSpaceVertex, Line, RasterPoint, Triangle, Vertex};

use self::clip::{ViewVolume, clip_line, clip_triangle};
use self::program::Program;

/// 视口边缘内缩的距离，避免顶点恰好落在像素边界上
const VIEWPORT_MARGIN: f64 = 0.1;

/// 渲染模式，可以用 `|` 组合
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderMode(u8);

impl RenderMode {
    pub const FILL: RenderMode = RenderMode(0b01);
    pub const WIREFRAME: RenderMode = RenderMode(0b10);

    pub fn contains(self, other: RenderMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RenderMode {
    type Output = RenderMode;

    fn bitor(self, rhs: Self) -> Self::Output {
        RenderMode(self.0 | rhs.0)
    }
}

impl Default for RenderMode {
    fn default() -> Self {
        RenderMode::FILL
    }
}

/// NDC -> 窗口空间
///
/// x、y 从 [-1, 1] 映射到 [-0.5 + 0.1, 尺寸 - 0.5 - 0.1]，
/// z 从 [-1, 1] 映射到 [far, near]。
#[rustfmt::skip]
pub fn viewport_transform(width: usize, height: usize, near: f64, far: f64) -> Mat4<f64> {
    let low = -0.5 + VIEWPORT_MARGIN;
    let high_x = width as f64 - 0.5 - VIEWPORT_MARGIN;
    let high_y = height as f64 - 0.5 - VIEWPORT_MARGIN;

    let sx = (high_x - low) / 2.0;
    let sy = (high_y - low) / 2.0;
    let sz = (near - far) / 2.0;

    Mat4::new(
        sx,        0.0,       0.0,                0.0,
        0.0,       sy,        0.0,                0.0,
        0.0,       0.0,       sz,                 0.0,
        low + sx,  low + sy,  (near + far) / 2.0, 1.0,
    )
}

/// 一次遍历的计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub submitted: usize,
    pub clipped: usize,
    pub culled: usize,
    pub fragments: usize,
    pub lines: usize,
}

/// 顶点着色 -> 裁剪 -> 透视除法 -> 视口变换 -> 背面剔除 -> 光栅化 -> 深度测试 -> 片元着色
#[derive(Debug, Clone, Copy)]
pub struct GraphicsPipeline {
    pub render_mode: RenderMode,
    pub wireframe_color: Vec3<f64>,
}

impl Default for GraphicsPipeline {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::FILL,
            wireframe_color: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl GraphicsPipeline {
    pub fn new(render_mode: RenderMode) -> Self {
        Self {
            render_mode,
            ..Self::default()
        }
    }

    /// 把场景渲染进 `target`，返回同一个缓冲方便链式调用
    pub fn traverse<'t, P: Program>(
        &self,
        scene: &Scene,
        target: &'t mut FrameBuffer,
        program: &P,
        near: f64,
        far: f64,
    ) -> &'t mut FrameBuffer {
        let volume = ViewVolume::canonical();
        let (width, height) = target.resolution();
        let viewport = viewport_transform(width, height, near, far);
        let to_window = |vertex: &ClipSpaceVertex| {
            let mut point = vertex.perspective_divide();
            point.pos = viewport * point.pos;
            point
        };

        let mut stats = TraversalStats {
            submitted: scene.triangles.len(),
            ..TraversalStats::default()
        };

        for triangle in &scene.triangles {
            let shaded = triangle.map(|vertex| program.vertex(vertex));

            for clipped in clip_triangle(&shaded, &volume) {
                stats.clipped += 1;
                let window: Triangle<RasterPoint> = clipped.map(to_window);

                if !window.is_facing_front() {
                    stats.culled += 1;
                    continue;
                }

                if self.render_mode.contains(RenderMode::FILL) {
                    stats.fragments += self.fill(&window, target, program);
                }
                if self.render_mode.contains(RenderMode::WIREFRAME) {
                    let color = pack_color(self.wireframe_color);
                    for edge in [window.line_c(), window.line_a(), window.line_b()] {
                        draw_line(&edge, target, color);
                    }
                }
            }
        }

        for line in &scene.lines {
            let a = program.vertex(&Vertex::from_position(line.point_a));
            let b = program.vertex(&Vertex::from_position(line.point_b));
            if let Some(clipped) = clip_line(&Line::new(a.position, b.position), &volume) {
                let project = |p: Vec4<f64>| viewport * (p / p.w);
                let window = Line::new(project(clipped.point_a), project(clipped.point_b));
                draw_line(&window, target, WHITE);
                stats.lines += 1;
            }
        }

        debug!(
            "遍历完成: 提交 {} 个三角形, 裁剪后 {} 个, 剔除 {} 个, 着色 {} 个片元, 绘制 {} 条线",
            stats.submitted, stats.clipped, stats.culled, stats.fragments, stats.lines
        );
        target
    }

    /// 填充一个窗口空间三角形，返回通过深度测试的片元数
    fn fill<P: Program>(
        &self,
        triangle: &Triangle<RasterPoint>,
        target: &mut FrameBuffer,
        program: &P,
    ) -> usize {
        let mut shaded = 0;
        rasterizer::rasterize_incremental(triangle, |fragment| {
            if target.depth_test(fragment.x, fragment.y, fragment.z) {
                let color = program.fragment(fragment.coordinates(), &fragment.varyings);
                target.write(fragment.x, fragment.y, pack_color(color), fragment.z);
                shaded += 1;
            }
        });
        shaded
    }
}

/// 线框不参与深度测试
fn draw_line(line: &Line, target: &mut FrameBuffer, color: u32) {
    rasterizer::rasterize_line(line, |x, y| target.put_color(x, y, color));
}
