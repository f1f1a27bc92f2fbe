// 该文件是 Takumi （匠目） 项目的一部分。
// src/input/image_source.rs - 图片输入源
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

use anyhow::{Context, Result};
use image::RgbImage;
use image::imageops::FilterType;
use tracing::info;
use url::Url;

use super::{Frame, InputSource, InputSourceType};

/// 图片输入源
///
/// 来源可以是本地文件路径或 http(s) URL。解码后直接拉伸到目标边长
/// （非等比），alpha 通道在解码阶段丢弃。只产出一帧。
#[derive(Debug)]
pub struct ImageSource {
  /// 图片数据
  image: Option<RgbImage>,
  /// 目标边长
  target: u32,
  /// 是否已读取
  consumed: bool,
}

impl ImageSource {
  /// 创建一个新的图片输入源
  pub fn new(source: &str, target: u32) -> Result<Self> {
    let data = fetch_image(source)?;
    let img = image::load_from_memory(&data)
      .with_context(|| format!("无法解码图片: {}", source))?
      .to_rgb8();

    let resized = image::imageops::resize(&img, target, target, FilterType::Triangle);

    Ok(Self {
      image: Some(resized),
      target,
      consumed: false,
    })
  }
}

/// 解析图片引用：http(s) URL 下载，file URL 或普通字符串按本地路径读取
fn fetch_image(source: &str) -> Result<Vec<u8>> {
  match Url::parse(source) {
    Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
      info!("下载图片: {}", url);
      let response = reqwest::blocking::get(url.as_str())
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("无法获取图片: {}", url))?;
      let data = response
        .bytes()
        .with_context(|| format!("无法读取图片数据: {}", url))?;
      Ok(data.to_vec())
    }
    Ok(url) if url.scheme() == "file" => {
      let path = url
        .to_file_path()
        .map_err(|_| anyhow::anyhow!("无效的 file URL: {}", url))?;
      std::fs::read(&path).with_context(|| format!("无法打开图片文件: {}", path.display()))
    }
    _ => std::fs::read(source).with_context(|| format!("无法打开图片文件: {}", source)),
  }
}

impl Iterator for ImageSource {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.consumed {
      return None;
    }

    self.consumed = true;

    self.image.take().map(|image| {
      Ok(Frame {
        image,
        index: 0,
        timestamp_ms: 0,
      })
    })
  }
}

impl InputSource for ImageSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::Image
  }

  fn width(&self) -> u32 {
    self.target
  }

  fn height(&self) -> u32 {
    self.target
  }

  fn fps(&self) -> Option<f64> {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn write_temp_png(name: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(name);
    let image = RgbImage::from_pixel(4, 2, Rgb([9, 8, 7]));
    image.save(&path).unwrap();
    path
  }

  #[test]
  fn file_path_is_decoded_and_stretched() {
    let path = write_temp_png("takumi-image-source-path.png");
    let mut source = ImageSource::new(path.to_str().unwrap(), 64).unwrap();

    let frame = source.next().unwrap().unwrap();
    assert_eq!(frame.image.dimensions(), (64, 64));
    assert_eq!(*frame.image.get_pixel(32, 32), Rgb([9, 8, 7]));

    // 只产出一帧，图片来源没有帧率
    assert!(source.next().is_none());
    assert!(source.fps().is_none());
  }

  #[test]
  fn file_url_is_decoded() {
    let path = write_temp_png("takumi-image-source-url.png");
    let url = Url::from_file_path(&path).unwrap();

    let source = ImageSource::new(url.as_str(), 32).unwrap();
    assert_eq!(source.width(), 32);
    assert_eq!(source.height(), 32);
  }

  #[test]
  fn remote_reference_is_not_treated_as_path() {
    // http(s) 引用必须走下载分支，而不是被当作文件路径打开
    let err = ImageSource::new("http://127.0.0.1:9/none.png", 32).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("无法获取图片"), "错误信息: {}", message);
  }

  #[test]
  fn missing_file_fails_with_open_error() {
    let err = ImageSource::new("/no/such/takumi-image.png", 32).unwrap_err();
    assert!(format!("{:#}", err).contains("无法打开图片文件"));
  }
}
