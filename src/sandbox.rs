use std::fs;
use std::path::Path;

use cgmath::{Deg, Matrix4 as Mat4, Vector3 as Vec3, Vector4 as Vec4};
use log::{debug, info};
use minifb::{Key, Window, WindowOptions};
use rayon::prelude::*;

use crate::error::Result;
use crate::framebuffer::{BLACK, FrameBuffer, ImageOrientation, WHITE, pack_color};
use crate::json_struct::JsonConfig;
use crate::model::{CUBE_OBJ, load_obj, load_obj_from_str};
use crate::rasterizer::{rasterize_incremental, rasterize_line};
use crate::renderer::clip::{ViewVolume, clip_line, clip_triangle};
use crate::renderer::program::Program;
use crate::renderer::shaders::{
    FlatColor, NormalDebug, ShaderKind, ToonShading, TransformAndLighting, TransformUniforms,
};
use crate::renderer::{GraphicsPipeline, RenderMode};
use crate::scene::{AnimatedScene, Scene, Timeline};
use crate::vertex::{ClipSpaceVertex, Line, RasterPoint, Triangle, Varyings, Vertex};

/// 窗口空间演示场景使用的固定分辨率（场景坐标按它给出）
pub const DEMO_RESOLUTION: (usize, usize) = (800, 800);

const RED: Vec3<f64> = Vec3::new(1.0, 0.0, 0.0);
const GREEN: Vec3<f64> = Vec3::new(0.0, 1.0, 0.0);
const BLUE: Vec3<f64> = Vec3::new(0.0, 0.0, 1.0);
const CYAN: Vec3<f64> = Vec3::new(0.0, 1.0, 1.0);
const MAGENTA: Vec3<f64> = Vec3::new(1.0, 0.0, 1.0);
const YELLOW: Vec3<f64> = Vec3::new(1.0, 1.0, 0.0);
const DARK: Vec3<f64> = Vec3::new(0.0, 0.0, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Demo {
    All,
    Lines,
    Triangle,
    Clipping,
    Depth,
    Animation,
}

impl Demo {
    fn includes(self, other: Demo) -> bool {
        self == Demo::All || self == other
    }
}

fn vertex(x: f64, y: f64, z: f64, color: Vec3<f64>) -> Vertex {
    Vertex::new(Vec4::new(x, y, z, 1.0), color)
}

fn triangle(a: Vertex, b: Vertex, c: Vertex) -> Triangle<Vertex> {
    Triangle::new(a, b, c)
}

/// 从 (400, 400) 出发、覆盖八个卦限的线段
pub fn line_fan() -> Scene {
    let ends = [
        (600.0, 500.0),
        (700.0, 700.0),
        (700.0, 710.0),
        (410.0, 700.0),
        (400.0, 700.0),
        (100.0, 700.0),
        (100.0, 400.0),
        (100.0, 100.0),
        (100.0, 110.0),
        (100.0, 90.0),
        (400.0, 100.0),
        (500.0, 100.0),
        (700.0, 100.0),
        (700.0, 130.0),
        (700.0, 400.0),
    ];
    let center = cgmath::Vector2::new(400.0, 400.0);
    Scene {
        lines: ends
            .iter()
            .map(|&(x, y)| Line::planar(center, cgmath::Vector2::new(x, y)))
            .collect(),
        ..Scene::default()
    }
}

pub fn rgb_triangle() -> Scene {
    Scene {
        triangles: vec![triangle(
            vertex(300.0, 300.0, 0.0, RED),
            vertex(500.0, 300.0, 0.0, GREEN),
            vertex(400.0, 500.0, 0.0, BLUE),
        )],
        ..Scene::default()
    }
}

pub fn line_clipping() -> Scene {
    let planar = |ax, ay, bx, by| {
        Line::planar(cgmath::Vector2::new(ax, ay), cgmath::Vector2::new(bx, by))
    };
    Scene {
        lines: vec![
            // 左
            planar(-400.0, 400.0, 600.0, 500.0),
            // 右
            planar(400.0, 400.0, 11700.0, 700.0),
            // 上下
            planar(400.0, -400.0, 700.0, 5000.0),
            // 不需要裁剪
            planar(200.0, 200.0, 600.0, 100.0),
            // 前后
            Line::new(Vec4::new(200.0, 180.0, 1000.0, 1.0), Vec4::new(600.0, 80.0, -1000.0, 1.0)),
        ],
        ..Scene::default()
    }
}

pub fn triangle_clipping() -> Scene {
    Scene {
        triangles: vec![
            // 跨越所有窗口边界
            triangle(
                vertex(-100.0, -200.0, 0.0, DARK),
                vertex(900.0, 200.0, 0.0, YELLOW),
                vertex(400.0, 1000.0, 0.0, CYAN),
            ),
            // 左上
            triangle(
                vertex(-100.0, 400.0, 0.0, DARK),
                vertex(0.0, 1000.0, 0.0, YELLOW),
                vertex(300.0, 500.0, 0.0, CYAN),
            ),
            // 左
            triangle(
                vertex(-100.0, 300.0, 0.0, RED),
                vertex(500.0, 300.0, 0.0, GREEN),
                vertex(400.0, 500.0, 0.0, BLUE),
            ),
            // 上
            triangle(
                vertex(100.0, 600.0, 0.0, RED),
                vertex(500.0, 500.0, 0.0, GREEN),
                vertex(400.0, 1500.0, 0.0, BLUE),
            ),
            // 右
            triangle(
                vertex(550.0, 300.0, 0.0, RED),
                vertex(900.0, 300.0, 0.0, GREEN),
                vertex(450.0, 500.0, 0.0, BLUE),
            ),
            // 下
            triangle(
                vertex(400.0, 100.0, 0.0, RED),
                vertex(600.0, -100.0, 0.0, GREEN),
                vertex(700.0, 100.0, 0.0, BLUE),
            ),
            triangle(
                vertex(200.0, 100.0, 0.0, RED),
                vertex(100.0, -100.0, 0.0, GREEN),
                vertex(400.0, -100.0, 0.0, BLUE),
            ),
        ],
        ..Scene::default()
    }
}

/// 两个互相穿插的三角形（都是逆时针），只有深度缓冲能得到正确的遮挡
pub fn depth_buffer() -> Scene {
    Scene {
        triangles: vec![
            triangle(
                vertex(-0.8, -0.8, -0.5, RED),
                vertex(0.2, 0.0, 0.5, BLUE),
                vertex(-0.8, 0.8, -0.5, GREEN),
            ),
            triangle(
                vertex(0.8, -0.8, -0.5, CYAN),
                vertex(0.8, 0.8, -0.5, MAGENTA),
                vertex(-0.2, 0.0, 0.5, YELLOW),
            ),
        ],
        ..Scene::default()
    }
}

/// 只做一个固定变换的程序，片元输出插值颜色
#[derive(Debug, Clone, Copy)]
pub struct Transformed(pub Mat4<f64>);

impl Program for Transformed {
    fn vertex(&self, vertex: &Vertex) -> ClipSpaceVertex {
        ClipSpaceVertex {
            position: self.0 * vertex.pos,
            varyings: Varyings {
                color: vertex.color,
                ..Varyings::default()
            },
        }
    }

    fn fragment(&self, _frag_coord: Vec4<f64>, input: &Varyings) -> Vec3<f64> {
        input.color
    }
}

/// 像素中心在整数坐标上，视体向内收一点，避免取整后越过窗口边缘
fn window_volume(width: usize, height: usize) -> ViewVolume {
    ViewVolume::from_box(
        Vec3::new(-0.45, -0.45, -500.0),
        Vec3::new(width as f64 - 0.55, height as f64 - 0.55, 500.0),
    )
}

/// 直接在窗口空间绘制的简化管线：裁剪、光栅化，没有深度测试和背面剔除
pub fn render_window_space(
    scene: &Scene,
    width: usize,
    height: usize,
    render_mode: RenderMode,
) -> FrameBuffer {
    let mut image = FrameBuffer::new(width, height, BLACK);
    let volume = window_volume(width, height);

    for line in &scene.lines {
        if let Some(clipped) = clip_line(line, &volume) {
            rasterize_line(&clipped, |x, y| image.put_color(x, y, WHITE));
        }
    }

    for triangle in &scene.triangles {
        let points = triangle.map(|v| RasterPoint::new(v.pos, v.color));
        for clipped in clip_triangle(&points, &volume) {
            if render_mode.contains(RenderMode::FILL) {
                rasterize_incremental(&clipped, |fragment| {
                    image.put_color(fragment.x, fragment.y, pack_color(fragment.varyings.color))
                });
            }
            if render_mode.contains(RenderMode::WIREFRAME) {
                for edge in [clipped.line_c(), clipped.line_b(), clipped.line_a()] {
                    rasterize_line(&edge, |x, y| image.put_color(x, y, WHITE));
                }
            }
        }
    }
    image
}

fn save(image: &FrameBuffer, path: &Path) -> Result<()> {
    image.save_to_image(path, ImageOrientation::InvertVerticalAxis)?;
    info!("已保存 {}", path.display());
    Ok(())
}

/// 按配置构建动画：每个模型一个场景，先平移再缩放
pub fn build_animation(config: &JsonConfig) -> Result<AnimatedScene> {
    let mut animation = AnimatedScene::new(config.camera());
    for model in &config.models {
        let palette = [Vec3::from(model.color)];
        let scene = if model.path == "cube" {
            load_obj_from_str(CUBE_OBJ, &palette)?
        } else {
            load_obj(Path::new(&model.path), &palette)?
        };
        let modelling =
            Mat4::from_scale(model.size) * Mat4::from_translation(Vec3::from(model.translation));
        animation.add(scene, modelling);
    }
    info!(
        "动画场景: {} 个模型, {} 个三角形",
        animation.posed_scenes.len(),
        animation.total_triangles()
    );
    Ok(animation)
}

/// 渲染一帧的所有模型，返回降采样后的缓冲
pub fn render_frame(
    animation: &AnimatedScene,
    poses: &[(&Scene, Mat4<f64>)],
    config: &JsonConfig,
) -> FrameBuffer {
    let (width, height) = (config.width * config.ssaa, config.height * config.ssaa);
    let mut target = FrameBuffer::new(width, height, pack_color(config.background()));

    let pipeline = GraphicsPipeline::new(config.render_mode.into());
    let projection = animation.projection(width as f64 / height as f64);
    let camera = animation.camera_transform();
    let light = config.light();
    let (near, far) = (animation.camera.near, animation.camera.far);

    for &(scene, local_to_world) in poses {
        let transform = TransformUniforms::new(camera * local_to_world, projection);
        match config.shader {
            ShaderKind::Phong => {
                let program = TransformAndLighting::new(transform, light);
                pipeline.traverse(scene, &mut target, &program, near, far)
            }
            ShaderKind::Toon => {
                let program = ToonShading { transform, light };
                pipeline.traverse(scene, &mut target, &program, near, far)
            }
            ShaderKind::Normal => {
                pipeline.traverse(scene, &mut target, &NormalDebug { transform }, near, far)
            }
            ShaderKind::Flat => {
                pipeline.traverse(scene, &mut target, &FlatColor { transform }, near, far)
            }
        };
    }
    target.ssaa(config.ssaa)
}

/// 各帧互不依赖，每帧拥有自己的缓冲，并行渲染后写入 `folder`
pub fn render_animation(config: &JsonConfig, folder: &Path) -> Result<()> {
    fs::create_dir_all(folder)?;
    let animation = build_animation(config)?;
    let timeline = Timeline::new(config.fps, config.duration);
    info!("开始渲染 {} 帧", timeline.frame_count);

    (0..timeline.frame_count).into_par_iter().try_for_each(|frame| -> Result<()> {
        let poses = animation.pose_at(frame, &timeline);
        let image = render_frame(&animation, &poses, config);
        let path = folder.join(format!("demoscene-{frame}.png"));
        image.save_to_image(&path, ImageOrientation::InvertVerticalAxis)?;
        debug!("第 {frame} 帧完成");
        Ok(())
    })?;

    info!("动画已保存到 {}", folder.display());
    Ok(())
}

/// 在窗口里循环播放动画，按 Esc 或关闭窗口退出
pub fn preview_animation(config: &JsonConfig) -> Result<()> {
    let mut animation = build_animation(config)?;
    let mut timeline = Timeline::new(config.fps, config.duration);
    let mut window = Window::new(
        "rs-pipeline",
        config.width,
        config.height,
        WindowOptions::default(),
    )?;
    window.set_target_fps(config.fps.round().max(1.0) as usize);

    while window.is_open() && !window.is_key_down(Key::Escape) {
        animation.update(&timeline);
        let poses: Vec<_> = animation
            .posed_scenes
            .iter()
            .map(|(scene, pose)| (scene, *pose))
            .collect();
        let image = render_frame(&animation, &poses, config);
        window.update_with_buffer(
            &image.oriented_rows(ImageOrientation::InvertVerticalAxis),
            image.width,
            image.height,
        )?;
        if timeline.next() {
            timeline.current_frame = 0;
            timeline.current_time = 0.0;
        }
    }
    Ok(())
}

/// 运行选中的演示，输出到 `folder`
pub fn run_demos(demo: Demo, folder: &Path, config: &JsonConfig, preview: bool) -> Result<()> {
    fs::create_dir_all(folder)?;
    let (width, height) = DEMO_RESOLUTION;

    if demo.includes(Demo::Lines) {
        let image = render_window_space(&line_fan(), width, height, RenderMode::FILL);
        save(&image, &folder.join("lines_test.png"))?;
    }
    if demo.includes(Demo::Triangle) {
        let image = render_window_space(&rgb_triangle(), width, height, RenderMode::FILL);
        save(&image, &folder.join("triangles_test.png"))?;
    }
    if demo.includes(Demo::Clipping) {
        let mode = RenderMode::FILL | RenderMode::WIREFRAME;
        save(
            &render_window_space(&line_clipping(), width, height, mode),
            &folder.join("clipping_lines.png"),
        )?;
        save(
            &render_window_space(&triangle_clipping(), width, height, mode),
            &folder.join("clipping_triangles.png"),
        )?;
    }
    if demo.includes(Demo::Depth) {
        let mut target = FrameBuffer::new(width, height, BLACK);
        let program = Transformed(Mat4::from_angle_z(Deg(45.0)));
        GraphicsPipeline::default().traverse(&depth_buffer(), &mut target, &program, 500.0, -500.0);
        save(&target, &folder.join("depth_buffer.png"))?;
        target.save_depth_as_image(
            &folder.join("depth_buffer_depth.png"),
            ImageOrientation::InvertVerticalAxis,
        )?;
    }
    if demo.includes(Demo::Animation) {
        if preview {
            preview_animation(config)?;
        } else {
            render_animation(config, &folder.join("demoscene"))?;
        }
    }
    Ok(())
}
