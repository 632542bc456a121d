use cgmath::{InnerSpace, Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4, Zero};

/// 模型空间输入顶点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub pos: Vec4<f64>,
    pub color: Vec3<f64>,
    /// w 分量为 0（方向向量）
    pub normal: Vec4<f64>,
    pub uv: Vec2<f64>,
}

impl Vertex {
    pub fn new(pos: Vec4<f64>, color: Vec3<f64>) -> Self {
        Self {
            pos,
            color,
            ..Self::default()
        }
    }

    pub fn from_position(pos: Vec4<f64>) -> Self {
        Self::new(pos, Vec3::new(1.0, 1.0, 1.0))
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Vertex {
            pos: Vec4::new(0.0, 0.0, 0.0, 1.0),
            color: Vec3::new(1.0, 1.0, 1.0),
            normal: Vec4::zero(),
            uv: Vec2::zero(),
        }
    }
}

/// 顶点着色器交给片元着色器的插值属性
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Varyings {
    pub color: Vec3<f64>,
    /// 相机空间位置
    pub position_c: Vec4<f64>,
    /// 相机空间法线
    pub normal_c: Vec4<f64>,
    pub uv: Vec2<f64>,
}

impl Default for Varyings {
    fn default() -> Self {
        Self {
            color: Vec3::new(1.0, 0.0, 0.0),
            position_c: Vec4::new(0.0, 0.0, 0.0, 1.0),
            normal_c: Vec4::zero(),
            uv: Vec2::zero(),
        }
    }
}

impl Varyings {
    /// 裁剪时沿边线性插值：t = 0 得到 self，t = 1 得到 other
    pub fn lerp(&self, other: &Varyings, t: f64) -> Varyings {
        let s = 1.0 - t;
        Varyings {
            color: self.color * s + other.color * t,
            position_c: self.position_c * s + other.position_c * t,
            normal_c: self.normal_c * s + other.normal_c * t,
            uv: self.uv * s + other.uv * t,
        }
    }

    /// 三顶点加权混合，法线非零时重新归一化
    pub fn blend(weights: [f64; 3], values: [&Varyings; 3]) -> Varyings {
        let [w0, w1, w2] = weights;
        let [v0, v1, v2] = values;

        let mut normal_c = v0.normal_c * w0 + v1.normal_c * w1 + v2.normal_c * w2;
        if normal_c.magnitude2() > 0.0 {
            normal_c = normal_c.normalize();
        }

        Varyings {
            color: v0.color * w0 + v1.color * w1 + v2.color * w2,
            position_c: v0.position_c * w0 + v1.position_c * w1 + v2.position_c * w2,
            normal_c,
            uv: v0.uv * w0 + v1.uv * w1 + v2.uv * w2,
        }
    }
}

/// 顶点着色之后、透视除法之前的顶点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSpaceVertex {
    pub position: Vec4<f64>,
    pub varyings: Varyings,
}

/// 光栅化阶段的点：窗口坐标（w == 1），保留除法前的 1/w
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterPoint {
    pub pos: Vec4<f64>,
    pub depth_inverse: f64,
    pub varyings: Varyings,
}

impl RasterPoint {
    /// 直接在窗口空间构造的点（没有经过透视投影）
    pub fn new(pos: Vec4<f64>, color: Vec3<f64>) -> Self {
        Self {
            pos,
            depth_inverse: 1.0,
            varyings: Varyings {
                color,
                ..Varyings::default()
            },
        }
    }
}

impl ClipSpaceVertex {
    /// 透视除法，同时记录 1/w 供透视校正插值使用
    pub fn perspective_divide(&self) -> RasterPoint {
        let depth_inverse = 1.0 / self.position.w;
        RasterPoint {
            pos: self.position * depth_inverse,
            depth_inverse,
            varyings: self.varyings,
        }
    }
}

/// 替代隐式“顶点 -> 齐次坐标”转换的显式访问接口
pub trait Homogeneous: Copy {
    fn position(&self) -> Vec4<f64>;

    /// 线性插值所有携带的属性
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

impl Homogeneous for Vec4<f64> {
    fn position(&self) -> Vec4<f64> {
        *self
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        *self + (*other - *self) * t
    }
}

impl Homogeneous for ClipSpaceVertex {
    fn position(&self) -> Vec4<f64> {
        self.position
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        ClipSpaceVertex {
            position: self.position + (other.position - self.position) * t,
            varyings: self.varyings.lerp(&other.varyings, t),
        }
    }
}

impl Homogeneous for RasterPoint {
    fn position(&self) -> Vec4<f64> {
        self.pos
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        RasterPoint {
            pos: self.pos + (other.pos - self.pos) * t,
            depth_inverse: self.depth_inverse + (other.depth_inverse - self.depth_inverse) * t,
            varyings: self.varyings.lerp(&other.varyings, t),
        }
    }
}

impl Homogeneous for Vertex {
    fn position(&self) -> Vec4<f64> {
        self.pos
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        let s = 1.0 - t;
        Vertex {
            pos: self.pos * s + other.pos * t,
            color: self.color * s + other.color * t,
            normal: self.normal * s + other.normal * t,
            uv: self.uv * s + other.uv * t,
        }
    }
}

/// 两个齐次坐标点组成的线段，提供 2D 隐式直线方程
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub point_a: Vec4<f64>,
    pub point_b: Vec4<f64>,
}

impl Line {
    pub fn new(point_a: Vec4<f64>, point_b: Vec4<f64>) -> Self {
        Self { point_a, point_b }
    }

    /// 窗口平面上的线段（z = 0, w = 1）
    pub fn planar(a: Vec2<f64>, b: Vec2<f64>) -> Self {
        Self::new(Vec4::new(a.x, a.y, 0.0, 1.0), Vec4::new(b.x, b.y, 0.0, 1.0))
    }

    /// 方程中 x 的系数，也是光栅化沿 x 步进时的增量
    pub fn factor_x(&self) -> f64 {
        self.point_a.y - self.point_b.y
    }

    pub fn factor_y(&self) -> f64 {
        self.point_b.x - self.point_a.x
    }

    /// f(p) = (Ay-By)px + (Bx-Ax)py + (AxBy - BxAy)
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let a = self.point_a;
        let b = self.point_b;
        self.factor_x() * x + self.factor_y() * y + a.x * b.y - b.x * a.y
    }

    pub fn evaluate_at(&self, p: Vec4<f64>) -> f64 {
        self.evaluate(p.x, p.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle<V> {
    pub a: V,
    pub b: V,
    pub c: V,
}

impl<V: Homogeneous> Triangle<V> {
    pub fn new(a: V, b: V, c: V) -> Self {
        Self { a, b, c }
    }

    /// 按下标取顶点，下标只能是 0..=2，否则是调用方的错误
    pub fn at(&self, index: usize) -> &V {
        match index {
            0 => &self.a,
            1 => &self.b,
            2 => &self.c,
            _ => panic!("三角形顶点下标无效: {index}"),
        }
    }

    pub fn vertices(&self) -> [&V; 3] {
        [&self.a, &self.b, &self.c]
    }

    pub fn map<U, F: FnMut(&V) -> U>(&self, mut f: F) -> Triangle<U> {
        Triangle {
            a: f(&self.a),
            b: f(&self.b),
            c: f(&self.c),
        }
    }

    pub fn xmin(&self) -> f64 {
        self.a.position().x.min(self.b.position().x).min(self.c.position().x)
    }

    pub fn xmax(&self) -> f64 {
        self.a.position().x.max(self.b.position().x).max(self.c.position().x)
    }

    pub fn ymin(&self) -> f64 {
        self.a.position().y.min(self.b.position().y).min(self.c.position().y)
    }

    pub fn ymax(&self) -> f64 {
        self.a.position().y.max(self.b.position().y).max(self.c.position().y)
    }

    /// 对边 b–c
    pub fn line_a(&self) -> Line {
        Line::new(self.b.position(), self.c.position())
    }

    /// 对边 c–a
    pub fn line_b(&self) -> Line {
        Line::new(self.c.position(), self.a.position())
    }

    /// 对边 a–b
    pub fn line_c(&self) -> Line {
        Line::new(self.a.position(), self.b.position())
    }

    /// 2D 投影的有向面积的两倍，逆时针为正
    pub fn signed_area(&self) -> f64 {
        let a = self.a.position();
        let e1 = self.b.position() - a;
        let e2 = self.c.position() - a;
        e1.x * e2.y - e1.y * e2.x
    }

    /// 窗口空间的背面判定
    pub fn is_facing_front(&self) -> bool {
        self.signed_area() > 0.0
    }
}
