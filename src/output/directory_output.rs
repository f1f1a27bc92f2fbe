// 该文件是 Takumi （匠目） 项目的一部分。
// src/output/directory_output.rs - 目录记录输出
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

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use image::RgbImage;
use tracing::debug;

use super::{OutputWriter, Visualizer};
use crate::detector::Detection;

/// 目录记录输出
///
/// 逐帧写入 `frame-<序号>-<UTC 时间戳>.jpg`，用于摄像头连续模式。
pub struct DirectoryOutput {
  /// 输出目录
  directory: PathBuf,
  /// 可视化工具
  visualizer: Visualizer,
  /// 帧计数
  frame_counter: u64,
}

impl DirectoryOutput {
  /// 创建一个新的目录记录输出
  pub fn new(directory: &str, font_path: Option<&Path>) -> Result<Self> {
    let directory = PathBuf::from(directory);
    anyhow::ensure!(directory.is_dir(), "输出目录不存在: {}", directory.display());

    Ok(Self {
      directory,
      visualizer: Visualizer::new(font_path),
      frame_counter: 0,
    })
  }
}

impl OutputWriter for DirectoryOutput {
  fn write_frame(&mut self, image: &RgbImage, detections: &[Detection]) -> Result<()> {
    let mut output_image = image.clone();
    self
      .visualizer
      .draw_detections(&mut output_image, detections);

    let filename = format!(
      "frame-{:06}-{}.jpg",
      self.frame_counter,
      Utc::now().format("%Y%m%dT%H%M%S%.3f")
    );
    let path = self.directory.join(filename);

    output_image
      .save(&path)
      .with_context(|| format!("无法保存图片: {}", path.display()))?;
    debug!("已记录帧: {}", path.display());

    self.frame_counter += 1;
    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    debug!("目录记录完成，共 {} 帧", self.frame_counter);
    Ok(())
  }
}
