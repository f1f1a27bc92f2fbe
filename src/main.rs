// 该文件是 Takumi （匠目） 项目的一部分。
// src/main.rs - 项目主程序
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

use std::sync::mpsc::Receiver;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use takumi::args::Args;
use takumi::detector::{Detector, SessionConfig};
use takumi::{input, output};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型位置: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("置信度阈值: {}", args.confidence);
  info!("模型输入边长: {}", args.size);

  // 创建检测器（模型获取与会话编译只发生一次）
  info!("正在加载模型...");
  let config = SessionConfig {
    backend: args.backend,
    threads: args.threads,
    ..SessionConfig::default()
  };
  let mut detector = Detector::new(&args.model, &config, args.size, args.confidence)
    .context("无法创建检测器")?;

  // 打开输入源；摄像头权限或设备错误不重试，由用户手动重新运行
  info!("正在打开输入源...");
  let mut input_source = match input::create_input_source(&args.input, args.size) {
    Ok(source) => source,
    Err(e) => {
      error!("无法打开输入源: {:#}", e);
      error!("喂，兄弟，你不让我用摄像头，我还怎么检测啊");
      return Err(e);
    }
  };
  info!(
    "输入源已打开: {}x{} {}，帧率: {}",
    input_source.width(),
    input_source.height(),
    match input_source.source_type() {
      input::InputSourceType::Image => "图片",
      input::InputSourceType::V4l2 => "V4L2 摄像头",
    },
    match input_source.fps() {
      Some(fps) => format!("{:.0}", fps),
      None => "不适用".to_string(),
    }
  );

  let mut output_writer =
    output::create_output_writer(&args.output, args.font.as_deref()).context("无法创建输出")?;

  // 无限制模式下由 Ctrl-C 结束循环
  let stop_rx: Option<Receiver<()>> = if args.max_frames == 0 {
    let (tx, rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
    })
    .context("无法设置 Ctrl-C 处理")?;
    Some(rx)
  } else {
    None
  };

  info!("开始处理...");
  let mut frame_count = 0u64;
  let mut total_detections = 0usize;

  while let Some(frame_result) = input_source.next() {
    let frame = frame_result?;

    if args.max_frames > 0 && frame_count >= args.max_frames {
      info!("已达到最大帧数限制: {}", args.max_frames);
      break;
    }

    let now = Instant::now();
    let detection = detector.detect(&frame.image)?;
    let elapsed = now.elapsed();

    match &detection {
      Some(det) => {
        total_detections += 1;
        info!(
          "帧 {} (时间: {}ms): {} 得分 {:.1}%，中心 ({:.0}, {:.0})，耗时 {:.2?}",
          frame.index,
          frame.timestamp_ms,
          det.label.as_deref().unwrap_or(&det.class_id),
          det.score * 100.0,
          det.x,
          det.y,
          elapsed
        );
      }
      None => {
        info!(
          "帧 {} (时间: {}ms): 无超过阈值的目标，耗时 {:.2?}",
          frame.index, frame.timestamp_ms, elapsed
        );
      }
    }

    output_writer.write_frame(&frame.image, detection.as_slice())?;
    frame_count += 1;

    if let Some(rx) = &stop_rx {
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出处理循环");
        break;
      }
    }
  }

  output_writer.finish()?;

  info!("处理完成: 共 {} 帧, {} 个检测", frame_count, total_detections);

  Ok(())
}
