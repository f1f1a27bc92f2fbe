// 该文件是 Takumi （匠目） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;

use crate::detector::ExecutionBackend;

/// Takumi 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型位置（本地文件路径或 http(s) URL）
  #[arg(long, value_name = "MODEL")]
  pub model: String,

  /// 输入来源（图片文件或 V4L2 摄像头设备路径）
  /// 支持格式:
  /// - 图片: *.jpg, *.jpeg, *.png, *.bmp, *.gif, *.webp
  /// - V4L2: /dev/video0 或 v4l2:///dev/video0
  #[arg(long, value_name = "SOURCE")]
  pub input: String,

  /// 输出路径
  /// 图片文件路径写单张标注图；已存在的目录则逐帧写入带时间戳的文件
  #[arg(long, value_name = "OUTPUT")]
  pub output: String,

  /// 置信度阈值 (0.0 - 1.0)，得分严格大于该值才保留
  /// 历史配置中存在 0.2 与 0.5 两个取值，0.5 需显式指定
  #[arg(long, default_value = "0.2", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 模型输入边长（输入图像被整理为该边长的正方形）
  #[arg(long, default_value = "640", value_name = "SIZE")]
  pub size: u32,

  /// 执行后端（wasm 为配置兼容取值，本机环境同样落在 CPU 上）
  #[arg(long, value_enum, default_value_t = ExecutionBackend::Cpu, value_name = "BACKEND")]
  pub backend: ExecutionBackend,

  /// 推理线程数
  #[arg(long, default_value = "1", value_name = "COUNT")]
  pub threads: usize,

  /// 标签字体文件路径（缺省时尝试常见系统字体位置）
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,

  /// 最大处理帧数（仅对摄像头输入有意义，0 表示无限制）
  #[arg(long, default_value = "1", value_name = "COUNT")]
  pub max_frames: u64,
}
