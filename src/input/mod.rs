// 该文件是 Takumi （匠目） 项目的一部分。
// src/input/mod.rs - 输入源模块
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Takumi 项目贡献者

mod image_source;
mod v4l2_source;

use anyhow::Result;
use image::RgbImage;
use image::imageops::FilterType;

pub use image_source::ImageSource;
pub use v4l2_source::V4l2Source;

/// 帧数据
pub struct Frame {
  /// RGB 图像数据，已整理为模型输入尺寸
  pub image: RgbImage,
  /// 帧索引
  pub index: u64,
  /// 时间戳（毫秒）
  pub timestamp_ms: u64,
}

/// 输入源类型
pub enum InputSourceType {
  /// 图片文件
  Image,
  /// V4L2 摄像头
  V4l2,
}

/// 输入源 trait
pub trait InputSource: Iterator<Item = Result<Frame>> {
  /// 获取输入源类型
  fn source_type(&self) -> InputSourceType;

  /// 获取帧宽度
  fn width(&self) -> u32;

  /// 获取帧高度
  fn height(&self) -> u32;

  /// 获取帧率（如果适用）
  fn fps(&self) -> Option<f64>;
}

/// 从路径创建输入源
///
/// `target` 为模型输入边长：图片做非等比拉伸，摄像头帧做信箱式缩放。
pub fn create_input_source(source: &str, target: u32) -> Result<Box<dyn InputSource>> {
  // 检查是否是 V4L2 设备
  if source.starts_with("/dev/video") || source.starts_with("v4l2://") {
    let device_path = if source.starts_with("v4l2://") {
      source.trim_start_matches("v4l2://")
    } else {
      source
    };
    return Ok(Box::new(V4l2Source::new(device_path, target)?));
  }

  // 否则视为图片文件
  Ok(Box::new(ImageSource::new(source, target)?))
}

/// 信箱式缩放：等比缩放至较长边贴合目标边长，居中放置，余量填充黑色
///
/// 宽高为零的退化输入产生全黑画布，是否在数据就绪前调用由调用方负责。
pub fn letterbox(image: &RgbImage, target: u32) -> RgbImage {
  let mut canvas = RgbImage::new(target, target);

  let (width, height) = image.dimensions();
  if width == 0 || height == 0 || target == 0 {
    return canvas;
  }

  let scale = target as f32 / width.max(height) as f32;
  let scaled_w = ((width as f32) * scale).round().max(1.0) as u32;
  let scaled_h = ((height as f32) * scale).round().max(1.0) as u32;

  let resized = image::imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle);
  let offset_x = ((target - scaled_w.min(target)) / 2) as i64;
  let offset_y = ((target - scaled_h.min(target)) / 2) as i64;
  image::imageops::overlay(&mut canvas, &resized, offset_x, offset_y);

  canvas
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn letterbox_centers_wide_frame() {
    // 1280x720 -> 640: 缩放系数 0.5，内容区 640x360，上下各 140 像素黑边
    let frame = RgbImage::from_pixel(1280, 720, Rgb([200, 200, 200]));
    let boxed = letterbox(&frame, 640);

    assert_eq!(boxed.dimensions(), (640, 640));
    for y in 0..140 {
      assert_eq!(*boxed.get_pixel(320, y), Rgb([0, 0, 0]));
      assert_eq!(*boxed.get_pixel(320, 639 - y), Rgb([0, 0, 0]));
    }
    assert_eq!(*boxed.get_pixel(320, 140), Rgb([200, 200, 200]));
    assert_eq!(*boxed.get_pixel(320, 499), Rgb([200, 200, 200]));
    assert_eq!(*boxed.get_pixel(0, 320), Rgb([200, 200, 200]));
    assert_eq!(*boxed.get_pixel(639, 320), Rgb([200, 200, 200]));
  }

  #[test]
  fn letterbox_centers_tall_frame() {
    let frame = RgbImage::from_pixel(360, 720, Rgb([10, 20, 30]));
    let boxed = letterbox(&frame, 640);

    // 320x640 内容区，左右各 160 像素黑边
    assert_eq!(*boxed.get_pixel(0, 320), Rgb([0, 0, 0]));
    assert_eq!(*boxed.get_pixel(159, 320), Rgb([0, 0, 0]));
    assert_eq!(*boxed.get_pixel(160, 320), Rgb([10, 20, 30]));
    assert_eq!(*boxed.get_pixel(479, 320), Rgb([10, 20, 30]));
    assert_eq!(*boxed.get_pixel(480, 320), Rgb([0, 0, 0]));
  }

  #[test]
  fn letterbox_degenerate_input_is_black() {
    let empty = RgbImage::new(0, 0);
    let boxed = letterbox(&empty, 8);
    assert!(boxed.pixels().all(|p| *p == Rgb([0, 0, 0])));
  }
}
