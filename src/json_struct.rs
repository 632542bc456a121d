use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use cgmath::{Point3, Vector3 as Vec3, Vector4 as Vec4};
use log::info;
use serde::Deserialize;

use crate::camera::Camera;
use crate::error::{RenderError, Result};
use crate::renderer::RenderMode;
use crate::renderer::shaders::{Light, ShaderKind};

/// 渲染配置，所有字段都有默认值，部分填写的文件也合法
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    pub width: usize,
    pub height: usize,
    pub background: [f64; 3],
    pub render_mode: RenderModeConfig,
    pub shader: ShaderKind,
    pub ssaa: usize,
    pub fps: f64,
    pub duration: f64,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub models: Vec<ModelConfig>,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
            background: [0.0, 0.0, 0.0],
            render_mode: RenderModeConfig::Fill,
            shader: ShaderKind::Phong,
            ssaa: 1,
            fps: 5.0,
            duration: 4.0,
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            models: vec![ModelConfig::default()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderModeConfig {
    Fill,
    Wireframe,
    Both,
}

impl From<RenderModeConfig> for RenderMode {
    fn from(mode: RenderModeConfig) -> Self {
        match mode {
            RenderModeConfig::Fill => RenderMode::FILL,
            RenderModeConfig::Wireframe => RenderMode::WIREFRAME,
            RenderModeConfig::Both => RenderMode::FILL | RenderMode::WIREFRAME,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f64; 3],
    pub looks_at: [f64; 3],
    pub shown_height: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let camera = Camera::default();
        Self {
            position: camera.position.into(),
            looks_at: camera.looks_at.into(),
            shown_height: camera.shown_height,
            near: camera.near,
            far: camera.far,
        }
    }
}

/// 光源位置在相机空间给出
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub position: [f64; 3],
    pub diffuse: [f64; 3],
    pub specular: [f64; 3],
    pub ambient: [f64; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        let light = Light::default();
        Self {
            position: light.position_c.truncate().into(),
            diffuse: light.diffuse.into(),
            specular: light.specular.into(),
            ambient: light.ambient.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// .obj 路径，或者 "cube" 表示内置立方体
    pub path: String,
    pub size: f64,
    pub translation: [f64; 3],
    pub color: [f64; 3],
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "cube".to_string(),
            size: 100.0,
            translation: [-0.5, -0.5, -0.5],
            color: [0.0, 1.0, 1.0],
        }
    }
}

impl JsonConfig {
    pub fn camera(&self) -> Camera {
        Camera {
            position: Point3::from(self.camera.position),
            looks_at: Point3::from(self.camera.looks_at),
            shown_height: self.camera.shown_height,
            near: self.camera.near,
            far: self.camera.far,
            ..Camera::default()
        }
    }

    pub fn light(&self) -> Light {
        let [x, y, z] = self.light.position;
        Light {
            position_c: Vec4::new(x, y, z, 1.0),
            diffuse: Vec3::from(self.light.diffuse),
            specular: Vec3::from(self.light.specular),
            ambient: Vec3::from(self.light.ambient),
        }
    }

    pub fn background(&self) -> Vec3<f64> {
        Vec3::from(self.background)
    }

    /// 检查反序列化之后才能发现的问题
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidConfig(format!(
                "分辨率不能为零: {}x{}",
                self.width, self.height
            )));
        }
        if self.ssaa == 0 {
            return Err(RenderError::InvalidConfig("SSAA 倍数必须大于等于 1".to_string()));
        }
        if self.fps <= 0.0 || self.duration < 0.0 {
            return Err(RenderError::InvalidConfig(format!(
                "时间轴无效: fps = {}, duration = {}",
                self.fps, self.duration
            )));
        }
        // 相机看向 -z，近平面必须在远平面前方
        if !(self.camera.far < self.camera.near && self.camera.near < 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "需要 far < near < 0, 实际 near = {}, far = {}",
                self.camera.near, self.camera.far
            )));
        }
        if self.camera.position == self.camera.looks_at {
            return Err(RenderError::InvalidConfig("相机位置与观察点重合".to_string()));
        }
        Ok(())
    }
}

pub fn parse_json(path: &Path) -> Result<JsonConfig> {
    if !path.exists() {
        return Err(RenderError::MissingAsset(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let config: JsonConfig = serde_json::from_reader(BufReader::new(file))?;
    config.validate()?;
    info!("成功读取配置 {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config: JsonConfig = serde_json::from_str("{}").unwrap();
        assert_eq!((config.width, config.height), (640, 640));
        assert_eq!(config.shader, ShaderKind::Phong);
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].path, "cube");
        assert_eq!(config.camera.near, -20.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let source = r#"{
            "width": 320,
            "render_mode": "both",
            "shader": "toon",
            "camera": { "position": [0, 0, 50] },
            "models": [{ "path": "bunny.obj", "size": 10 }]
        }"#;
        let config: JsonConfig = serde_json::from_str(source).unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.height, 640);
        assert_eq!(config.shader, ShaderKind::Toon);
        assert_eq!(RenderMode::from(config.render_mode), RenderMode::FILL | RenderMode::WIREFRAME);
        assert_eq!(config.camera().position, Point3::new(0.0, 0.0, 50.0));
        assert_eq!(config.camera.far, -1000.0);
        assert_eq!(config.models[0].translation, [-0.5, -0.5, -0.5]);
    }

    #[test]
    fn unknown_shader_is_a_config_error() {
        let result = serde_json::from_str::<JsonConfig>(r#"{ "shader": "ink" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn inverted_planes_are_rejected() {
        let mut config = JsonConfig::default();
        config.camera.near = -1000.0;
        config.camera.far = -20.0;
        assert!(matches!(config.validate(), Err(RenderError::InvalidConfig(_))));

        let mut config = JsonConfig::default();
        config.ssaa = 0;
        assert!(matches!(config.validate(), Err(RenderError::InvalidConfig(_))));
    }

    #[test]
    fn light_is_placed_in_camera_space() {
        let config = JsonConfig::default();
        let light = config.light();
        assert_eq!(light.position_c, Vec4::new(0.0, 50.0, 100.0, 1.0));
        assert_eq!(light.ambient, Vec3::new(0.0, 0.2, 0.2));
    }
}
