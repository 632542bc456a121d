pub mod camera;
pub mod error;
pub mod framebuffer;
pub mod json_struct;
pub mod model;
pub mod rasterizer;
pub mod renderer;
pub mod sandbox;
pub mod scene;
pub mod vertex;

pub use error::{RenderError, Result};
pub use framebuffer::FrameBuffer;
pub use renderer::{GraphicsPipeline, RenderMode};
