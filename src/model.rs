use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use cgmath::{Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4, Zero};
use log::{debug, info};
use obj::{IndexTuple, ObjData};

use crate::error::{RenderError, Result};
use crate::scene::Scene;
use crate::vertex::{Triangle, Vertex};

/// 单位立方体 [0, 1]^3，每个面两个逆时针（朝外）三角形
pub const CUBE_OBJ: &str = "\
# unit cube
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
vn 0 0 -1
vn 1 0 0
vn -1 0 0
vn 0 1 0
vn 0 -1 0
f 5/1/1 6/2/1 7/3/1
f 5/1/1 7/3/1 8/4/1
f 1/1/2 4/2/2 3/3/2
f 1/1/2 3/3/2 2/4/2
f 2/1/3 3/2/3 7/3/3
f 2/1/3 7/3/3 6/4/3
f 1/1/4 5/2/4 8/3/4
f 1/1/4 8/3/4 4/4/4
f 4/1/5 8/2/5 7/3/5
f 4/1/5 7/3/5 3/4/5
f 1/1/6 2/2/6 6/3/6
f 1/1/6 6/3/6 5/4/6
";

/// 从文件加载 .obj，顶点颜色按位置下标在 `palette` 中循环取用
pub fn load_obj(path: &Path, palette: &[Vec3<f64>]) -> Result<Scene> {
    if !path.exists() {
        return Err(RenderError::MissingAsset(path.to_path_buf()));
    }
    let scene = load_obj_from_reader(BufReader::new(File::open(path)?), palette)?;
    info!("已加载模型 {}: {} 个三角形", path.display(), scene.triangles.len());
    Ok(scene)
}

pub fn load_obj_from_str(source: &str, palette: &[Vec3<f64>]) -> Result<Scene> {
    load_obj_from_reader(source.as_bytes(), palette)
}

pub fn load_obj_from_reader<R: Read>(input: R, palette: &[Vec3<f64>]) -> Result<Scene> {
    let data = ObjData::load_buf(input)?;
    debug!(
        "obj: {} 个位置, {} 个法线, {} 个纹理坐标",
        data.position.len(),
        data.normal.len(),
        data.texture.len()
    );

    let mut scene = Scene::default();
    for object in &data.objects {
        for group in &object.groups {
            for poly in &group.polys {
                if poly.0.len() != 3 {
                    return Err(RenderError::NonTriangularFace { count: poly.0.len() });
                }
                let a = corner(&data, &poly.0[0], palette)?;
                let b = corner(&data, &poly.0[1], palette)?;
                let c = corner(&data, &poly.0[2], palette)?;
                scene.triangles.push(Triangle::new(a, b, c));
            }
        }
    }
    Ok(scene)
}

/// 面的一个角：每个角使用自己的法线和纹理坐标下标
fn corner(data: &ObjData, index: &IndexTuple, palette: &[Vec3<f64>]) -> Result<Vertex> {
    let IndexTuple(position_index, texture_index, normal_index) = *index;

    let position = data.position.get(position_index).ok_or(RenderError::IndexOutOfRange {
        kind: "position",
        index: position_index,
    })?;

    let uv = match texture_index {
        Some(i) => {
            let t = data.texture.get(i).ok_or(RenderError::IndexOutOfRange {
                kind: "texture",
                index: i,
            })?;
            Vec2::new(t[0] as f64, t[1] as f64)
        }
        None => Vec2::zero(),
    };

    let normal = match normal_index {
        Some(i) => {
            let n = data.normal.get(i).ok_or(RenderError::IndexOutOfRange {
                kind: "normal",
                index: i,
            })?;
            Vec4::new(n[0] as f64, n[1] as f64, n[2] as f64, 0.0)
        }
        None => Vec4::zero(),
    };

    let color = if palette.is_empty() {
        Vec3::new(1.0, 1.0, 1.0)
    } else {
        palette[position_index % palette.len()]
    };

    Ok(Vertex {
        pos: Vec4::new(position[0] as f64, position[1] as f64, position[2] as f64, 1.0),
        color,
        normal,
        uv,
    })
}
