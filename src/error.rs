//! 渲染管线外围（模型加载、配置、图片输出）的错误类型

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("OBJ 解析失败: {0}")]
    Obj(#[from] obj::ObjError),

    #[error("只支持三角形面，而该面有 {count} 个顶点")]
    NonTriangularFace { count: usize },

    #[error("面引用了不存在的{kind}索引: {index}")]
    IndexOutOfRange { kind: &'static str, index: usize },

    #[error("资源不存在: {}", .0.display())]
    MissingAsset(PathBuf),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("图片错误: {0}")]
    Image(#[from] image::ImageError),

    #[error("配置解析失败: {0}")]
    Config(#[from] serde_json::Error),

    #[error("配置无效: {0}")]
    InvalidConfig(String),

    #[error("预览窗口错误: {0}")]
    Window(String),
}

impl From<minifb::Error> for RenderError {
    fn from(err: minifb::Error) -> Self {
        RenderError::Window(err.to_string())
    }
}
