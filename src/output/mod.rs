// 该文件是 Takumi （匠目） 项目的一部分。
// src/output/mod.rs - 输出模块
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

mod directory_output;
mod image_output;
mod visualizer;

pub use directory_output::DirectoryOutput;
pub use image_output::ImageOutput;
pub use visualizer::Visualizer;

use std::path::Path;

use anyhow::Result;
use image::RgbImage;

use crate::detector::Detection;

/// 输出写入器 trait
pub trait OutputWriter {
  /// 写入一帧
  fn write_frame(&mut self, image: &RgbImage, detections: &[Detection]) -> Result<()>;

  /// 完成写入
  fn finish(&mut self) -> Result<()>;
}

/// 创建输出写入器
///
/// 已存在的目录逐帧记录带时间戳的文件，其余路径写单张图片。
pub fn create_output_writer(
  output_path: &str,
  font_path: Option<&Path>,
) -> Result<Box<dyn OutputWriter>> {
  if Path::new(output_path).is_dir() {
    Ok(Box::new(DirectoryOutput::new(output_path, font_path)?))
  } else {
    Ok(Box::new(ImageOutput::new(output_path, font_path)?))
  }
}
