use cgmath::{InnerSpace, Matrix4 as Mat4, Point3, Vector3 as Vec3};

/// 把轴对齐的盒子映射到规范视体 [-1, 1]^3
///
/// z 方向上 `min.z`（远平面）映射到 -1，`max.z`（近平面）映射到 +1，
/// 与“越大越近”的深度约定一致。
#[rustfmt::skip]
pub fn orthographic_projection(min: Vec3<f64>, max: Vec3<f64>) -> Mat4<f64> {
    let size = max - min;
    let sx = 2.0 / size.x;
    let sy = 2.0 / size.y;
    let sz = 2.0 / size.z;

    Mat4::new(
        sx,                     0.0,                    0.0,                    0.0,
        0.0,                    sy,                     0.0,                    0.0,
        0.0,                    0.0,                    sz,                     0.0,
        -(max.x + min.x) / size.x, -(max.y + min.y) / size.y, -(max.z + min.z) / size.z, 1.0,
    )
}

/// FoCG 透视矩阵（整体取负，使相机前方的点 w = -z > 0）
///
/// `near`、`far` 都是负数（相机看向 -z），近远平面上的 z 经过透视除法后保持不变。
#[rustfmt::skip]
pub fn perspective_projection(near: f64, far: f64) -> Mat4<f64> {
    Mat4::new(
        -near, 0.0,   0.0,            0.0,
        0.0,   -near, 0.0,            0.0,
        0.0,   0.0,   -(near + far),  -1.0,
        0.0,   0.0,   far * near,     0.0,
    )
}

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Point3<f64>,
    pub looks_at: Point3<f64>,
    pub up: Vec3<f64>,
    /// 近平面上可见区域的高度
    pub shown_height: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 100.0),
            looks_at: Point3::new(0.0, 0.0, 0.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            shown_height: 100.0,
            near: -20.0,
            far: -1000.0,
        }
    }
}

impl Camera {
    /// 世界空间 -> 相机空间，相机看向 -z
    pub fn get_view_mat(&self) -> Mat4<f64> {
        let direction = (self.looks_at - self.position).normalize();
        Mat4::look_to_rh(self.position, direction, self.up)
    }

    /// 透视投影加正交投影，`aspect_ratio` 为宽 / 高
    pub fn get_projection_mat(&self, aspect_ratio: f64) -> Mat4<f64> {
        let half_width = self.shown_height * aspect_ratio / 2.0;
        let half_height = self.shown_height / 2.0;
        let projected = orthographic_projection(
            Vec3::new(-half_width, -half_height, self.far),
            Vec3::new(half_width, half_height, self.near),
        );
        projected * perspective_projection(self.near, self.far)
    }
}
