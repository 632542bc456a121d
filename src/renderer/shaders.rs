use cgmath::{
    ElementWise, InnerSpace, Matrix, Matrix4 as Mat4, SquareMatrix, Vector3 as Vec3,
    Vector4 as Vec4,
};
use serde::Deserialize;

use crate::renderer::program::Program;
use crate::vertex::{ClipSpaceVertex, Varyings, Vertex};

/// 相机空间中的点光源
#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub position_c: Vec4<f64>,
    pub diffuse: Vec3<f64>,
    pub specular: Vec3<f64>,
    pub ambient: Vec3<f64>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position_c: Vec4::new(0.0, 50.0, 100.0, 1.0),
            diffuse: Vec3::new(1.0, 1.0, 1.0) * 0.4,
            specular: Vec3::new(1.0, 1.0, 1.0) * 0.3,
            ambient: Vec3::new(0.0, 1.0, 1.0) * 0.2, // 青色环境光
        }
    }
}

/// 顶点阶段的 uniforms：模型到相机、投影，以及法线矩阵
#[derive(Debug, Clone, Copy)]
pub struct TransformUniforms {
    pub local_to_camera: Mat4<f64>,
    pub projection: Mat4<f64>,
    normal_matrix: Mat4<f64>,
}

impl TransformUniforms {
    pub fn new(local_to_camera: Mat4<f64>, projection: Mat4<f64>) -> Self {
        // 不可逆时退化为直接使用模型矩阵
        let normal_matrix = local_to_camera
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or(local_to_camera);
        Self {
            local_to_camera,
            projection,
            normal_matrix,
        }
    }

    /// 计算裁剪空间位置，并把位置、法线变换到相机空间供光照使用
    pub fn shade_vertex(&self, vertex: &Vertex) -> ClipSpaceVertex {
        let position_c = self.local_to_camera * vertex.pos;
        let mut normal_c = self.normal_matrix * vertex.normal;
        normal_c.w = 0.0;
        if normal_c.magnitude2() > 0.0 {
            normal_c = normal_c.normalize();
        }

        ClipSpaceVertex {
            position: self.projection * position_c,
            varyings: Varyings {
                color: vertex.color,
                position_c,
                normal_c,
                uv: vertex.uv,
            },
        }
    }
}

impl Default for TransformUniforms {
    fn default() -> Self {
        Self::new(Mat4::identity(), Mat4::identity())
    }
}

fn direction(from: Vec4<f64>, to: Vec4<f64>) -> Vec4<f64> {
    let d = to - from;
    if d.magnitude2() > 0.0 { d.normalize() } else { d }
}

/// 相机在相机空间的原点
const CAMERA_POSITION_C: Vec4<f64> = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// 经典冯模型加棋盘格纹理
#[derive(Debug, Clone, Copy)]
pub struct TransformAndLighting {
    pub transform: TransformUniforms,
    pub light: Light,
    pub phong_exponent: f64,
    /// 沿 u、v 方向的棋盘格数量，0 表示不使用
    pub checkers: u32,
}

impl TransformAndLighting {
    pub fn new(transform: TransformUniforms, light: Light) -> Self {
        Self {
            transform,
            light,
            phong_exponent: 15.0,
            checkers: 40,
        }
    }

    fn checker_factor(&self, input: &Varyings) -> f64 {
        if self.checkers == 0 {
            return 1.0;
        }
        let n = self.checkers as f64;
        let cell = (input.uv.x * n).floor() + (input.uv.y * n).floor();
        if (cell as i64).rem_euclid(2) == 0 { 0.3 } else { 1.0 }
    }
}

impl Program for TransformAndLighting {
    fn vertex(&self, vertex: &Vertex) -> ClipSpaceVertex {
        self.transform.shade_vertex(vertex)
    }

    fn fragment(&self, _frag_coord: Vec4<f64>, input: &Varyings) -> Vec3<f64> {
        let view_dir = direction(input.position_c, CAMERA_POSITION_C);
        let light_dir = direction(input.position_c, self.light.position_c);
        let half_dir = (view_dir + light_dir).normalize();

        let diffuse = self.light.diffuse * input.normal_c.dot(light_dir).max(0.0);
        let specular =
            self.light.specular * input.normal_c.dot(half_dir).max(0.0).powf(self.phong_exponent);
        let lighting = diffuse + specular + self.light.ambient;

        input.color.mul_element_wise(lighting) * self.checker_factor(input)
    }
}

/// 非线性漫反射：卡通风格渲染
#[derive(Debug, Clone, Copy)]
pub struct ToonShading {
    pub transform: TransformUniforms,
    pub light: Light,
}

impl Program for ToonShading {
    fn vertex(&self, vertex: &Vertex) -> ClipSpaceVertex {
        self.transform.shade_vertex(vertex)
    }

    fn fragment(&self, _frag_coord: Vec4<f64>, input: &Varyings) -> Vec3<f64> {
        let light_dir = direction(input.position_c, self.light.position_c);
        let diff = input.normal_c.dot(light_dir).max(0.0);
        // 漫反射分成三档
        let band = if diff > 0.6 {
            1.1
        } else if diff > 0.2 {
            0.8
        } else {
            0.5
        };
        let lighting = self.light.diffuse * band * 2.0 + self.light.ambient;
        input.color.mul_element_wise(lighting)
    }
}

/// 把相机空间法线映射成颜色
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalDebug {
    pub transform: TransformUniforms,
}

impl Program for NormalDebug {
    fn vertex(&self, vertex: &Vertex) -> ClipSpaceVertex {
        self.transform.shade_vertex(vertex)
    }

    fn fragment(&self, _frag_coord: Vec4<f64>, input: &Varyings) -> Vec3<f64> {
        (input.normal_c.truncate() + Vec3::new(1.0, 1.0, 1.0)) * 0.5
    }
}

/// 只做变换，片元直接输出顶点颜色
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatColor {
    pub transform: TransformUniforms,
}

impl Program for FlatColor {
    fn vertex(&self, vertex: &Vertex) -> ClipSpaceVertex {
        self.transform.shade_vertex(vertex)
    }

    fn fragment(&self, _frag_coord: Vec4<f64>, input: &Varyings) -> Vec3<f64> {
        input.color
    }
}

/// 配置文件里可选的着色方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ShaderKind {
    #[default]
    Phong,
    Toon,
    Normal,
    /// 只用插值颜色
    Flat,
}
