use cgmath::{Vector3 as Vec3, Vector4 as Vec4};

use crate::vertex::{ClipSpaceVertex, Varyings, Vertex};

/// 可编程着色阶段：顶点着色器与片元着色器成对出现
///
/// uniforms 作为实现者自身的字段传入，管线以泛型参数接收 Program，
/// 光栅化内循环里没有动态分发。
pub trait Program {
    /// 模型空间顶点 -> 裁剪空间位置和插值属性
    fn vertex(&self, vertex: &Vertex) -> ClipSpaceVertex;

    /// 输入片元坐标 (x, y, z, 1/w) 和插值后的属性，输出 [0, 1] 范围的 RGB
    fn fragment(&self, frag_coord: Vec4<f64>, input: &Varyings) -> Vec3<f64>;
}

/// 位置原样输出，片元直接使用插值颜色
///
/// 适合已经在裁剪空间里给出的场景。
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Program for PassThrough {
    fn vertex(&self, vertex: &Vertex) -> ClipSpaceVertex {
        ClipSpaceVertex {
            position: vertex.pos,
            varyings: Varyings {
                color: vertex.color,
                position_c: vertex.pos,
                normal_c: vertex.normal,
                uv: vertex.uv,
            },
        }
    }

    fn fragment(&self, _frag_coord: Vec4<f64>, input: &Varyings) -> Vec3<f64> {
        input.color
    }
}
