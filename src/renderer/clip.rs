//! 齐次空间裁剪：视景体六个平面依次对线段和三角形做 Sutherland–Hodgman 式裁剪
//!
//! 平面顺序固定为 左、右、下、上、近、远。对某个平面裁剪出来的子图元
//! 只需要继续测试后面的平面，前面的平面已经保证满足。

use cgmath::{Vector3 as Vec3, Vector4 as Vec4};

use crate::vertex::{Homogeneous, Line, Triangle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipPlane {
    Left,
    Right,
    Bottom,
    Top,
    Near,
    Far,
}

impl ClipPlane {
    pub const ALL: [ClipPlane; 6] = [
        ClipPlane::Left,
        ClipPlane::Right,
        ClipPlane::Bottom,
        ClipPlane::Top,
        ClipPlane::Near,
        ClipPlane::Far,
    ];
}

/// 六个半空间组成的视景体
///
/// 近平面的 z 大于远平面的 z（右手坐标系，相机看向 -z）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewVolume {
    pub l: f64,
    pub r: f64,
    pub b: f64,
    pub t: f64,
    pub n: f64,
    pub f: f64,
}

impl ViewVolume {
    pub const PLANE_COUNT: usize = 6;

    pub fn from_box(min: Vec3<f64>, max: Vec3<f64>) -> Self {
        Self {
            l: min.x,
            r: max.x,
            b: min.y,
            t: max.y,
            n: max.z,
            f: min.z,
        }
    }

    /// 裁剪空间里的标准立方体 [-1, 1]^3
    pub fn canonical() -> Self {
        Self::from_box(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0))
    }

    /// 平面方程，结果 > 0 表示点在外侧，== 0 算作内侧
    pub fn evaluate(&self, plane: ClipPlane, p: Vec4<f64>) -> f64 {
        match plane {
            ClipPlane::Left => -p.x + self.l * p.w,
            ClipPlane::Right => p.x - self.r * p.w,
            ClipPlane::Bottom => -p.y + self.b * p.w,
            ClipPlane::Top => p.y - self.t * p.w,
            ClipPlane::Near => p.z - self.n * p.w,
            ClipPlane::Far => -p.z + self.f * p.w,
        }
    }

    /// 求 t 使 lerp(a, b, t) 恰好落在平面上
    ///
    /// 平面方程对齐次坐标是线性的，所以 f(lerp(a, b, t)) = fa + t (fb - fa)。
    pub fn solve_for_t(&self, plane: ClipPlane, a: Vec4<f64>, b: Vec4<f64>) -> f64 {
        let fa = self.evaluate(plane, a);
        let fb = self.evaluate(plane, b);
        fa / (fa - fb)
    }

    pub fn contains(&self, p: Vec4<f64>) -> bool {
        ClipPlane::ALL.iter().all(|&plane| self.evaluate(plane, p) <= 0.0)
    }
}

/// 两个求值结果是否在平面同一侧（0 视为内侧）
fn on_same_side(lhs: f64, rhs: f64) -> bool {
    let sign = lhs * rhs;
    sign > 0.0 || (sign == 0.0 && lhs + rhs <= 0.0)
}

/// 线段裁剪，完全在某个平面外侧时返回 None
pub fn clip_line(line: &Line, volume: &ViewVolume) -> Option<Line> {
    let mut a = line.point_a;
    let mut b = line.point_b;

    for plane in ClipPlane::ALL {
        let fa = volume.evaluate(plane, a);
        let fb = volume.evaluate(plane, b);

        if fa <= 0.0 && fb <= 0.0 {
            // 都在内侧，继续下一个平面
            continue;
        } else if fa * fb > 0.0 {
            return None;
        }

        let t = volume.solve_for_t(plane, a, b);
        let intersection = a.lerp(&b, t);
        if fb > 0.0 {
            b = intersection;
        } else {
            a = intersection;
        }
    }
    Some(Line::new(a, b))
}

/// 单个平面切开一个跨越它的三角形后的结果
enum Split<V> {
    One(Triangle<V>),
    Two(Triangle<V>, Triangle<V>),
}

fn split_triangle<V: Homogeneous>(
    triangle: &Triangle<V>,
    volume: &ViewVolume,
    plane: ClipPlane,
    evaluations: [f64; 3],
) -> Split<V> {
    let [mut fa, mut fb, mut fc] = evaluations;
    let Triangle {
        mut a,
        mut b,
        mut c,
    } = *triangle;

    // 轮换顶点，保证 c 单独在一侧，a 和 b 在另一侧
    if on_same_side(fa, fc) {
        // b 单独一侧：a=c, b=a, c=b
        (a, b, c) = (c, a, b);
        (fa, fb, fc) = (fc, fa, fb);
    } else if on_same_side(fb, fc) {
        // a 单独一侧：a=b, b=c, c=a
        (a, b, c) = (b, c, a);
        (fa, fb, fc) = (fb, fc, fa);
    }

    debug_assert!(
        (fc <= 0.0 && fa > 0.0 && fb > 0.0) || (fc > 0.0 && fa <= 0.0 && fb <= 0.0),
        "轮换之后 c 必须单独位于平面一侧"
    );

    let t_ac = volume.solve_for_t(plane, a.position(), c.position());
    let t_bc = volume.solve_for_t(plane, b.position(), c.position());
    debug_assert!((0.0..=1.0).contains(&t_ac) && (0.0..=1.0).contains(&t_bc));

    let vertex_ac = a.lerp(&c, t_ac);
    let vertex_bc = b.lerp(&c, t_bc);

    if fc <= 0.0 {
        // c 在内侧，只剩一个三角形
        Split::One(Triangle::new(vertex_ac, vertex_bc, c))
    } else {
        Split::Two(
            Triangle::new(a, b, vertex_ac),
            Triangle::new(b, vertex_bc, vertex_ac),
        )
    }
}

/// 三角形裁剪，返回零个或多个完全位于视景体内的三角形
///
/// 用显式栈代替递归，输出顺序与深度优先递归一致。
pub fn clip_triangle<V: Homogeneous>(
    triangle: &Triangle<V>,
    volume: &ViewVolume,
) -> Vec<Triangle<V>> {
    let mut result = Vec::new();
    let mut pending = vec![(*triangle, 0usize)];

    'work: while let Some((current, starting_plane)) = pending.pop() {
        for plane_id in starting_plane..ViewVolume::PLANE_COUNT {
            let plane = ClipPlane::ALL[plane_id];
            let evaluations = current.vertices().map(|v| volume.evaluate(plane, v.position()));

            if evaluations.iter().all(|&f| f > 0.0) {
                // 完全在外侧，丢弃
                continue 'work;
            }
            if evaluations.iter().any(|&f| f > 0.0) {
                match split_triangle(&current, volume, plane, evaluations) {
                    Split::One(inner) => pending.push((inner, plane_id + 1)),
                    Split::Two(first, second) => {
                        pending.push((second, plane_id + 1));
                        pending.push((first, plane_id + 1));
                    }
                }
                continue 'work;
            }
        }
        result.push(current);
    }
    result
}
