use std::path::PathBuf;

use clap::Parser;
use log::info;

use rs_pipeline::json_struct::{JsonConfig, parse_json};
use rs_pipeline::renderer::shaders::ShaderKind;
use rs_pipeline::sandbox::{self, Demo};

/// 软件光栅化管线的演示程序
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// 输出图片的目录
    output_folder: PathBuf,

    /// JSON 渲染配置，缺省时使用内置的立方体动画
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 要运行的演示
    #[arg(short, long, value_enum, default_value_t = Demo::All)]
    demo: Demo,

    /// 覆盖配置里的着色方式
    #[arg(short, long, value_enum)]
    shader: Option<ShaderKind>,

    /// 在窗口中实时播放动画，而不是写入图片
    #[arg(long)]
    preview: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => parse_json(path)?,
        None => JsonConfig::default(),
    };
    if let Some(shader) = args.shader {
        config.shader = shader;
    }

    info!("输出目录: {}", args.output_folder.display());
    sandbox::run_demos(args.demo, &args.output_folder, &config, args.preview)?;
    info!("已渲染完成");
    Ok(())
}
