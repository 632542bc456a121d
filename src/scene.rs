use cgmath::{Deg, Matrix4 as Mat4, Rad};

use crate::camera::Camera;
use crate::vertex::{Line, Triangle, Vertex};

/// 一次遍历提交给管线的图元
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub lines: Vec<Line>,
    pub triangles: Vec<Triangle<Vertex>>,
}

/// 固定步长的动画时间轴
#[derive(Debug, Clone, Copy)]
pub struct Timeline {
    /// 帧间隔（秒）
    pub delta: f64,
    pub frame_count: usize,
    pub current_frame: usize,
    pub current_time: f64,
}

impl Timeline {
    pub fn new(fps: f64, duration: f64) -> Self {
        Self {
            delta: 1.0 / fps,
            frame_count: (duration * fps) as usize,
            current_frame: 0,
            current_time: 0.0,
        }
    }

    /// 前进一帧，返回是否已经结束
    pub fn next(&mut self) -> bool {
        self.current_time += self.delta;
        self.current_frame += 1;
        self.done()
    }

    pub fn done(&self) -> bool {
        self.current_frame >= self.frame_count
    }
}

/// 每秒绕 y 轴旋转的圈数
const ROTATIONS_PER_SECOND: f64 = 0.25;

/// 带模型变换的场景集合，随时间绕 y 轴旋转
#[derive(Debug, Clone, Default)]
pub struct AnimatedScene {
    pub posed_scenes: Vec<(Scene, Mat4<f64>)>,
    pub camera: Camera,
}

impl AnimatedScene {
    pub fn new(camera: Camera) -> Self {
        Self {
            posed_scenes: Vec::new(),
            camera,
        }
    }

    pub fn add(&mut self, scene: Scene, local_to_world: Mat4<f64>) {
        self.posed_scenes.push((scene, local_to_world));
    }

    /// 第 `frame` 帧时，每个场景的模型变换
    ///
    /// 先更新再渲染，所以第 0 帧已经转过了一个步长。
    pub fn pose_at(&self, frame: usize, timeline: &Timeline) -> Vec<(&Scene, Mat4<f64>)> {
        let turns = ROTATIONS_PER_SECOND * timeline.delta * (frame + 1) as f64;
        let rotation = Mat4::from_angle_y(Rad::from(Deg(360.0 * turns)));
        self.posed_scenes
            .iter()
            .map(|(scene, local_to_world)| (scene, rotation * *local_to_world))
            .collect()
    }

    /// 原地推进一帧的变换，供顺序渲染（实时预览）使用
    pub fn update(&mut self, timeline: &Timeline) {
        let turns = ROTATIONS_PER_SECOND * timeline.delta;
        let step = Mat4::from_angle_y(Rad::from(Deg(360.0 * turns)));
        for (_, local_to_world) in &mut self.posed_scenes {
            *local_to_world = step * *local_to_world;
        }
    }

    pub fn camera_transform(&self) -> Mat4<f64> {
        self.camera.get_view_mat()
    }

    pub fn projection(&self, aspect_ratio: f64) -> Mat4<f64> {
        self.camera.get_projection_mat(aspect_ratio)
    }

    pub fn total_triangles(&self) -> usize {
        self.posed_scenes.iter().map(|(scene, _)| scene.triangles.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Point3, SquareMatrix, Transform};

    #[test]
    fn timeline_counts_frames() {
        let mut timeline = Timeline::new(5.0, 4.0);
        assert_eq!(timeline.frame_count, 20);
        assert!(!timeline.done());
        let mut steps = 1;
        while !timeline.next() {
            steps += 1;
        }
        assert_eq!(steps, 20);
        assert!((timeline.current_time - 4.0).abs() < 1e-9);
    }

    #[test]
    fn pose_matches_sequential_updates() {
        let timeline = Timeline::new(5.0, 4.0);
        let mut animation = AnimatedScene::default();
        let offset = Mat4::from_translation(cgmath::Vector3::new(10.0, 0.0, 0.0));
        animation.add(Scene::default(), offset);

        let posed = animation.pose_at(2, &timeline)[0].1;
        for _ in 0..3 {
            animation.update(&timeline);
        }
        let updated = animation.posed_scenes[0].1;

        let p = Point3::new(1.0, 2.0, 3.0);
        let a = posed.transform_point(p);
        let b = updated.transform_point(p);
        assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9 && (a.z - b.z).abs() < 1e-9);
    }

    #[test]
    fn quarter_turn_per_second() {
        let timeline = Timeline::new(1.0, 4.0);
        let mut animation = AnimatedScene::default();
        animation.add(Scene::default(), Mat4::identity());
        // 第 0 帧已经转了 90 度：+x 转到 -z
        let p = animation.pose_at(0, &timeline)[0].1.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert!(p.x.abs() < 1e-9);
        assert!((p.z + 1.0).abs() < 1e-9);
    }
}
