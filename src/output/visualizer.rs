// 该文件是 Takumi （匠目） 项目的一部分。
// src/output/visualizer.rs - 检测结果可视化
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

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::detector::Detection;

/// 边框与文本颜色：红色
const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// 标签字号
const FONT_SIZE: f32 = 16.0;
/// 标签文本与边框上沿的间距
const LABEL_GAP: i32 = 5;

/// 缺省字体候选路径
const FONT_CANDIDATES: [&str; 3] = [
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

/// 可视化工具
///
/// 每帧绘制都以原始帧的全新副本为底，因此对同一帧与同一结果重复绘制
/// 产生相同的像素。
pub struct Visualizer {
  /// 字体；找不到可用字体时只画边框
  font: Option<FontVec>,
  /// 字体大小
  font_scale: PxScale,
}

impl Visualizer {
  /// 创建一个新的可视化工具
  pub fn new(font_path: Option<&Path>) -> Self {
    let font = load_font(font_path);
    if font.is_none() {
      warn!("未找到可用字体，标签文本将被跳过");
    }

    Self {
      font,
      font_scale: PxScale::from(FONT_SIZE),
    }
  }

  /// 在图像上绘制检测结果
  ///
  /// 边框为 2 像素红色空心矩形，锚点为 (中心 x - 宽/2, 中心 y - 高/2)，
  /// 标签文本位于边框上沿上方。
  pub fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      // 中心坐标转左上角，超出画布的部分按画布边缘裁剪
      let left = detection.x - detection.width / 2.0;
      let top = detection.y - detection.height / 2.0;
      let x = left.max(0.0) as i32;
      let y = top.max(0.0) as i32;
      let right = (left + detection.width).min(image.width() as f32) as i32;
      let bottom = (top + detection.height).min(image.height() as f32) as i32;
      let width = (right - x).max(0) as u32;
      let height = (bottom - y).max(0) as u32;

      if width > 0 && height > 0 {
        let rect = Rect::at(x, y).of_size(width, height);
        draw_hollow_rect_mut(image, rect, BOX_COLOR);

        // 第二圈边框，合计描边宽度 2 像素
        if width > 2 && height > 2 {
          let inner = Rect::at(x + 1, y + 1).of_size(width - 2, height - 2);
          draw_hollow_rect_mut(image, inner, BOX_COLOR);
        }
      }

      if let Some(font) = &self.font {
        let text = format_label(detection);
        let text_y = (y - FONT_SIZE as i32 - LABEL_GAP).max(0);
        draw_text_mut(image, BOX_COLOR, x, text_y, self.font_scale, font, &text);
      }
    }
  }
}

/// 标签文本: "<标签> (<得分百分比，1 位小数>%)"；无标签时回落到类别 id
pub fn format_label(detection: &Detection) -> String {
  let name = detection.label.as_deref().unwrap_or(&detection.class_id);
  format!("{} ({:.1}%)", name, detection.score * 100.0)
}

fn load_font(font_path: Option<&Path>) -> Option<FontVec> {
  let candidates: Vec<PathBuf> = match font_path {
    Some(path) => vec![path.to_path_buf()],
    None => FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
  };

  for path in candidates {
    if let Ok(data) = std::fs::read(&path) {
      match FontVec::try_from_vec(data) {
        Ok(font) => {
          debug!("加载字体: {}", path.display());
          return Some(font);
        }
        Err(e) => warn!("字体解析失败 {}: {}", path.display(), e),
      }
    }
  }

  None
}
