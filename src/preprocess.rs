// 该文件是 Takumi （匠目） 项目的一部分。
// src/preprocess.rs - 图像到张量的预处理
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

use image::RgbImage;
use ndarray::Array4;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {
  #[error("张量维度必须为 [1, 3, H, W], 实际为 {0:?}")]
  BadDims([usize; 4]),
  #[error("图像尺寸 {width}x{height} 与张量维度 {dims:?} 不匹配")]
  DimMismatch {
    width: u32,
    height: u32,
    dims: [usize; 4],
  },
  #[error("形状错误: {0}")]
  Shape(#[from] ndarray::ShapeError),
}

/// 将 RGB 图像转换为 NCHW 平面布局的归一化张量
///
/// 逐像素按行扫描顺序拆分通道：先全部 R，再全部 G，最后全部 B，
/// 每个字节除以 255 归一化到 [0, 1]。解码阶段已丢弃 alpha 通道，
/// 此处不做任何重采样。纯函数：同一图像总是产生相同的张量。
pub fn to_tensor(image: &RgbImage, dims: [usize; 4]) -> Result<Array4<f32>, TensorError> {
  let [n, c, h, w] = dims;
  if n != 1 || c != 3 {
    return Err(TensorError::BadDims(dims));
  }
  if image.width() as usize != w || image.height() as usize != h {
    return Err(TensorError::DimMismatch {
      width: image.width(),
      height: image.height(),
      dims,
    });
  }

  let plane = h * w;
  let mut data = vec![0f32; 3 * plane];
  for (idx, pixel) in image.pixels().enumerate() {
    data[idx] = pixel[0] as f32 / 255.0;
    data[plane + idx] = pixel[1] as f32 / 255.0;
    data[2 * plane + idx] = pixel[2] as f32 / 255.0;
  }

  Ok(Array4::from_shape_vec((n, c, h, w), data)?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn sample_image() -> RgbImage {
    let mut image = RgbImage::new(2, 2);
    image.put_pixel(0, 0, Rgb([255, 0, 10]));
    image.put_pixel(1, 0, Rgb([0, 255, 20]));
    image.put_pixel(0, 1, Rgb([128, 64, 255]));
    image.put_pixel(1, 1, Rgb([1, 2, 3]));
    image
  }

  #[test]
  fn normalization_is_exact() {
    let image = sample_image();
    let tensor = to_tensor(&image, [1, 3, 2, 2]).unwrap();
    for y in 0..2u32 {
      for x in 0..2u32 {
        let pixel = image.get_pixel(x, y);
        for channel in 0..3usize {
          assert_eq!(
            tensor[[0, channel, y as usize, x as usize]],
            pixel[channel] as f32 / 255.0
          );
        }
      }
    }
  }

  #[test]
  fn layout_is_planar_row_major() {
    let image = sample_image();
    let tensor = to_tensor(&image, [1, 3, 2, 2]).unwrap();
    let flat = tensor.as_slice().unwrap();
    assert_eq!(flat.len(), 3 * 2 * 2);
    // [0, H*W) 全部来自 R 通道，按行扫描顺序
    assert_eq!(
      &flat[0..4],
      &[255.0 / 255.0, 0.0, 128.0 / 255.0, 1.0 / 255.0]
    );
    // [H*W, 2*H*W) 来自 G 通道
    assert_eq!(
      &flat[4..8],
      &[0.0, 255.0 / 255.0, 64.0 / 255.0, 2.0 / 255.0]
    );
    // [2*H*W, 3*H*W) 来自 B 通道
    assert_eq!(
      &flat[8..12],
      &[10.0 / 255.0, 20.0 / 255.0, 255.0 / 255.0, 3.0 / 255.0]
    );
  }

  #[test]
  fn alpha_never_reaches_tensor() {
    // 带 alpha 的像素数据在解码阶段转为 RGB，张量中只出现三个通道
    let rgba = image::RgbaImage::from_raw(1, 1, vec![30, 60, 90, 120]).unwrap();
    let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();
    let tensor = to_tensor(&rgb, [1, 3, 1, 1]).unwrap();
    let flat = tensor.as_slice().unwrap();
    assert_eq!(flat, &[30.0 / 255.0, 60.0 / 255.0, 90.0 / 255.0]);
  }

  #[test]
  fn same_image_same_tensor() {
    let image = sample_image();
    let first = to_tensor(&image, [1, 3, 2, 2]).unwrap();
    let second = to_tensor(&image, [1, 3, 2, 2]).unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn dim_mismatch_is_an_error() {
    let image = sample_image();
    assert!(matches!(
      to_tensor(&image, [1, 3, 4, 4]),
      Err(TensorError::DimMismatch { .. })
    ));
    assert!(matches!(
      to_tensor(&image, [2, 3, 2, 2]),
      Err(TensorError::BadDims(_))
    ));
  }
}
