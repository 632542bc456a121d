use std::path::Path;

use cgmath::Vector3 as Vec3;
use log::debug;

use crate::error::Result;

pub const BLACK: u32 = 0xFF000000; // A=FF, R=00, G=00, B=00
pub const WHITE: u32 = 0xFFFFFFFF;

/// 把 [0, 1] 范围的颜色打包成 ARGB
pub fn pack_color(color: Vec3<f64>) -> u32 {
    let r = (color.x.clamp(0.0, 1.0) * 255.0).round() as u32;
    let g = (color.y.clamp(0.0, 1.0) * 255.0).round() as u32;
    let b = (color.z.clamp(0.0, 1.0) * 255.0).round() as u32;
    0xFF000000 | r << 16 | g << 8 | b
}

pub fn unpack_color(color: u32) -> [u8; 4] {
    let a = ((color >> 24) & 0xFF) as u8;
    let r = ((color >> 16) & 0xFF) as u8;
    let g = ((color >> 8) & 0xFF) as u8;
    let b = (color & 0xFF) as u8;
    [r, g, b, a]
}

/// 保存图片时的行顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrientation {
    /// 第 0 行写在图片顶部
    Unchanged,
    /// 第 0 行（窗口空间 y = 0）写在图片底部
    InvertVerticalAxis,
}

/// 渲染目标：颜色缓冲和同尺寸的深度缓冲
///
/// 深度约定为“越大越近”（近平面的 z 大于远平面），
/// 所以深度缓冲初始化为最小值，测试条件是严格大于。
#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u32>,
    pub depth: Vec<f64>,
    pub clear_color: u32,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize, clear_color: u32) -> Self {
        FrameBuffer {
            width,
            height,
            data: vec![clear_color; width * height],
            depth: vec![f64::MIN; width * height],
            clear_color,
        }
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn clear(&mut self) {
        self.data.fill(self.clear_color);
        self.depth.fill(f64::MIN);
    }

    /// 超出缓冲范围时返回 None
    pub fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// 越界直接 panic
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.data[self.checked_index(x, y)]
    }

    pub fn depth_at(&self, x: usize, y: usize) -> f64 {
        self.depth[self.checked_index(x, y)]
    }

    fn checked_index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "像素 ({x}, {y}) 超出 {}x{} 缓冲",
            self.width,
            self.height
        );
        y * self.width + x
    }

    /// 新深度严格大于已存深度时通过
    pub fn depth_test(&self, x: i32, y: i32, depth: f64) -> bool {
        self.index_of(x, y)
            .is_some_and(|idx| depth > self.depth[idx])
    }

    /// 写入颜色和深度（调用前应先做深度测试）
    pub fn write(&mut self, x: i32, y: i32, color: u32, depth: f64) {
        if let Some(idx) = self.index_of(x, y) {
            self.data[idx] = color;
            self.depth[idx] = depth;
        }
    }

    /// 只写颜色，不碰深度缓冲（线框模式）
    pub fn put_color(&mut self, x: i32, y: i32, color: u32) {
        if let Some(idx) = self.index_of(x, y) {
            self.data[idx] = color;
        }
    }

    /// 按行输出，可选择上下翻转
    pub fn oriented_rows(&self, orientation: ImageOrientation) -> Vec<u32> {
        match orientation {
            ImageOrientation::Unchanged => self.data.clone(),
            ImageOrientation::InvertVerticalAxis => self
                .data
                .chunks(self.width)
                .rev()
                .flatten()
                .copied()
                .collect(),
        }
    }

    pub fn ssaa(&self, factor: usize) -> Self {
        if factor <= 1 {
            return self.clone();
        }
        let new_width = self.width / factor;
        let new_height = self.height / factor;
        let mut new_data = vec![0; new_width * new_height];
        let mut new_depth = vec![f64::MIN; new_width * new_height];
        let count = (factor * factor) as u32;

        // 遍历缩小后的每个像素
        for y in 0..new_height {
            for x in 0..new_width {
                let mut channels = [0u32; 4];
                let mut nearest = f64::MIN;

                // 采样高分辨率区域内的所有像素
                for dy in 0..factor {
                    for dx in 0..factor {
                        let src_idx = (y * factor + dy) * self.width + x * factor + dx;
                        let [r, g, b, a] = unpack_color(self.data[src_idx]);
                        channels[0] += r as u32;
                        channels[1] += g as u32;
                        channels[2] += b as u32;
                        channels[3] += a as u32;
                        nearest = nearest.max(self.depth[src_idx]);
                    }
                }

                // 平均值包括背景色像素
                let [r, g, b, a] = channels.map(|c| c / count);
                new_data[y * new_width + x] = a << 24 | r << 16 | g << 8 | b;
                new_depth[y * new_width + x] = nearest;
            }
        }

        Self {
            width: new_width,
            height: new_height,
            data: new_data,
            depth: new_depth,
            clear_color: self.clear_color,
        }
    }

    pub fn save_to_image(&self, filepath: &Path, orientation: ImageOrientation) -> Result<()> {
        use image::{ImageBuffer, Rgba};

        let rows = self.oriented_rows(orientation);
        let mut img = ImageBuffer::new(self.width as u32, self.height as u32);
        for (idx, color) in rows.iter().enumerate() {
            let x = (idx % self.width) as u32;
            let y = (idx / self.width) as u32;
            img.put_pixel(x, y, Rgba(unpack_color(*color)));
        }

        img.save(filepath)?;
        debug!("已保存 {}", filepath.display());
        Ok(())
    }

    /// 将深度缓冲可视化为图片（近→亮，远→暗），背景为黑色
    pub fn save_depth_as_image(
        &self,
        filepath: &Path,
        orientation: ImageOrientation,
    ) -> Result<()> {
        use image::{ImageBuffer, Luma};

        let written = self.depth.iter().copied().filter(|d| *d > f64::MIN);
        let (nearest, farthest) = written.fold((f64::MIN, f64::MAX), |(near, far), d| {
            (near.max(d), far.min(d))
        });
        let range = nearest - farthest;

        let width = self.width;
        let order: Vec<usize> = match orientation {
            ImageOrientation::Unchanged => (0..self.depth.len()).collect(),
            ImageOrientation::InvertVerticalAxis => (0..self.height)
                .rev()
                .flat_map(|y| (0..width).map(move |x| y * width + x))
                .collect(),
        };

        let mut img = ImageBuffer::new(self.width as u32, self.height as u32);
        for (out_idx, src_idx) in order.into_iter().enumerate() {
            let depth = self.depth[src_idx];
            let brightness = if depth == f64::MIN {
                0.0
            } else if range > 0.0 {
                // 线性映射：最远→0.2，最近→1.0
                0.2 + 0.8 * (depth - farthest) / range
            } else {
                1.0
            };
            let x = (out_idx % self.width) as u32;
            let y = (out_idx / self.width) as u32;
            img.put_pixel(x, y, Luma([(brightness * 255.0) as u8]));
        }

        img.save(filepath)?;
        debug!("已保存深度图 {}", filepath.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_cleared() {
        let buffer = FrameBuffer::new(4, 3, BLACK);
        assert_eq!(buffer.data.len(), 12);
        assert_eq!(buffer.depth.len(), 12);
        assert!(buffer.data.iter().all(|c| *c == BLACK));
        assert!(buffer.depth.iter().all(|d| *d == f64::MIN));
    }

    #[test]
    fn depth_test_is_strictly_greater() {
        let mut buffer = FrameBuffer::new(2, 2, BLACK);
        assert!(buffer.depth_test(1, 1, -1000.0));
        buffer.write(1, 1, WHITE, -5.0);
        assert!(!buffer.depth_test(1, 1, -5.0));
        assert!(!buffer.depth_test(1, 1, -6.0));
        assert!(buffer.depth_test(1, 1, -4.0));
        assert_eq!(buffer.pixel(1, 1), WHITE);
        assert_eq!(buffer.depth_at(1, 1), -5.0);
    }

    #[test]
    fn out_of_range_writes_are_ignored() {
        let mut buffer = FrameBuffer::new(2, 2, BLACK);
        assert!(!buffer.depth_test(-1, 0, 0.0));
        assert!(!buffer.depth_test(2, 0, 0.0));
        buffer.write(5, 5, WHITE, 0.0);
        buffer.put_color(-1, 1, WHITE);
        assert!(buffer.data.iter().all(|c| *c == BLACK));
    }

    #[test]
    #[should_panic]
    fn reading_past_row_end_panics() {
        let mut buffer = FrameBuffer::new(2, 2, BLACK);
        buffer.write(0, 1, WHITE, 3.0);
        buffer.pixel(2, 0);
    }

    #[test]
    #[should_panic]
    fn depth_past_row_end_panics() {
        let mut buffer = FrameBuffer::new(2, 2, BLACK);
        buffer.write(0, 1, WHITE, 3.0);
        buffer.depth_at(2, 0);
    }

    #[test]
    fn clear_restores_background_and_depth() {
        let mut buffer = FrameBuffer::new(2, 2, BLACK);
        buffer.write(0, 0, WHITE, 1.0);
        buffer.clear();
        assert_eq!(buffer.pixel(0, 0), BLACK);
        assert_eq!(buffer.depth_at(0, 0), f64::MIN);
    }

    #[test]
    fn invert_vertical_axis_flips_rows() {
        let mut buffer = FrameBuffer::new(2, 2, BLACK);
        buffer.put_color(0, 0, WHITE);
        let rows = buffer.oriented_rows(ImageOrientation::InvertVerticalAxis);
        assert_eq!(rows, vec![BLACK, BLACK, WHITE, BLACK]);
    }

    #[test]
    fn pack_color_clamps() {
        assert_eq!(pack_color(Vec3::new(1.0, 0.0, 0.0)), 0xFFFF0000);
        assert_eq!(pack_color(Vec3::new(2.0, -1.0, 1.0)), 0xFFFF00FF);
        assert_eq!(unpack_color(0xFF102030), [0x10, 0x20, 0x30, 0xFF]);
    }

    #[test]
    fn ssaa_averages_blocks() {
        let mut buffer = FrameBuffer::new(4, 2, BLACK);
        buffer.write(0, 0, WHITE, 3.0);
        buffer.write(1, 1, WHITE, 2.0);
        let small = buffer.ssaa(2);
        assert_eq!(small.resolution(), (2, 1));
        assert_eq!(small.pixel(0, 0), 0xFF7F7F7F);
        assert_eq!(small.pixel(1, 0), BLACK);
        assert_eq!(small.depth_at(0, 0), 3.0);
    }
}
