// 该文件是 Takumi （匠目） 项目的一部分。
// src/detector.rs - ONNX 目标检测器
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
use ort::session::{Session, builder::GraphOptimizationLevel};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::preprocess::{self, TensorError};

/// 标签表：类别 id 到显示名称的静态映射
pub const LABELS: [(u32, &str); 2] = [(0, "alien"), (1, "Takuma Sumi")];

/// 查询类别标签；表中不存在的类别返回 None
pub fn lookup_label(class_id: u32) -> Option<&'static str> {
  LABELS
    .iter()
    .find(|(id, _)| *id == class_id)
    .map(|(_, name)| *name)
}

/// 候选检测行: [中心 x, 中心 y, 宽, 高, 得分, 类别]
pub type DetectionRow = [f32; 6];

/// 检测结果
///
/// 每次推理最多产出一个：得分严格超过阈值的行中取最高者。
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
  /// 边界框中心 x 坐标（模型像素空间）
  pub x: f32,
  /// 边界框中心 y 坐标
  pub y: f32,
  /// 边界框宽度
  pub width: f32,
  /// 边界框高度
  pub height: f32,
  /// 置信度
  pub score: f32,
  /// 类别 id（原始浮点四舍五入后的整数，字符串形式）
  pub class_id: String,
  /// 显示标签；标签表中不存在该类别时为 None
  pub label: Option<String>,
}

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("模型下载错误: {0}")]
  ModelFetch(#[from] reqwest::Error),
  #[error("模型读取错误: {0}")]
  ModelRead(#[from] std::io::Error),
  #[error("模型路径错误: {0}")]
  ModelPath(String),
  #[error("模型结构无效: {0}")]
  ModelShape(String),
  #[error("推理运行时错误: {0}")]
  Runtime(#[from] ort::Error),
  #[error("张量转换错误: {0}")]
  Tensor(#[from] TensorError),
}

/// 执行后端
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExecutionBackend {
  /// 本机 CPU 执行提供器
  #[default]
  Cpu,
  /// 为配置兼容保留的 wasm 后端；本机环境下同样落在 CPU 执行提供器上
  Wasm,
}

/// 会话执行配置
///
/// 取代全局可变的运行时标志：显式构造一份配置传入会话创建过程。
#[derive(Clone, Debug)]
pub struct SessionConfig {
  /// 执行后端
  pub backend: ExecutionBackend,
  /// 推理线程数
  pub threads: usize,
  /// SIMD 提示；本机运行时自行选择向量指令集，此项仅被记录
  pub simd: bool,
  /// 是否允许并行执行（离线程代理执行的本机近似）
  pub proxy: bool,
}

impl Default for SessionConfig {
  fn default() -> Self {
    // 保守配置：单线程、不并行，牺牲速度换取可移植性
    Self {
      backend: ExecutionBackend::Cpu,
      threads: 1,
      simd: false,
      proxy: false,
    }
  }
}

/// ONNX 目标检测器
///
/// 会话创建一次，跨多次 detect 调用复用；推理本身独占会话，
/// 调用之间不保留任何状态。
pub struct Detector {
  /// ONNX Runtime 推理会话
  session: Session,
  /// 模型声明的唯一输入名
  input_name: String,
  /// 模型声明的唯一输出名
  output_name: String,
  /// 模型输入边长
  input_size: u32,
  /// 置信度阈值
  confidence_threshold: f32,
}

impl Detector {
  /// 创建一个新的检测器
  ///
  /// 模型引用可以是本地文件路径或 http(s) URL。加载与编译只发生一次，
  /// 代价高，应当复用。缺少输入或输出张量的模型直接报错。
  pub fn new(
    model: &str,
    config: &SessionConfig,
    input_size: u32,
    confidence_threshold: f32,
  ) -> Result<Self, DetectorError> {
    let model_data = fetch_model(model)?;

    info!("创建 ONNX Runtime 推理会话 (后端: {:?})", config.backend);
    if config.backend == ExecutionBackend::Wasm {
      debug!("wasm 后端在本机环境映射到 CPU 执行提供器");
    }
    if config.simd {
      debug!("已请求 SIMD；本机运行时自行决定向量指令集");
    }

    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(config.threads.max(1))?
      .with_parallel_execution(config.proxy)?
      .commit_from_memory(&model_data)?;

    let input_name = session
      .inputs
      .first()
      .map(|input| input.name.clone())
      .ok_or_else(|| DetectorError::ModelShape("模型未声明任何输入张量".to_string()))?;
    let output_name = session
      .outputs
      .first()
      .map(|output| output.name.clone())
      .ok_or_else(|| DetectorError::ModelShape("模型未声明任何输出张量".to_string()))?;

    debug!("模型输入: {}, 模型输出: {}", input_name, output_name);
    info!("模型加载完成");

    Ok(Self {
      session,
      input_name,
      output_name,
      input_size,
      confidence_threshold,
    })
  }

  /// 对单帧图像执行推理，返回零或一个检测结果
  pub fn detect(&mut self, image: &RgbImage) -> Result<Option<Detection>, DetectorError> {
    let size = self.input_size as usize;
    let tensor = preprocess::to_tensor(image, [1, 3, size, size])?;

    debug!("设置模型输入并执行推理");
    let input_value = ort::value::Value::from_array(tensor)?;
    let outputs = self
      .session
      .run(ort::inputs![self.input_name.as_str() => input_value])?;

    let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
      DetectorError::ModelShape(format!("模型输出 {} 缺失", self.output_name))
    })?;
    let (_, data) = output.try_extract_tensor::<f32>()?;

    let rows = reshape_rows(data);
    debug!("模型输出 {} 行候选", rows.len());

    Ok(select_best(&rows, self.confidence_threshold).map(to_detection))
  }
}

/// 解析模型引用：http(s) URL 下载，file URL 或普通字符串按本地路径读取
fn fetch_model(model: &str) -> Result<Vec<u8>, DetectorError> {
  match Url::parse(model) {
    Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
      info!("下载模型: {}", url);
      let response = reqwest::blocking::get(url)?.error_for_status()?;
      let data = response.bytes()?.to_vec();
      debug!("模型大小: {:.2} MB", data.len() as f64 / (1024.0 * 1024.0));
      Ok(data)
    }
    Ok(url) if url.scheme() == "file" => {
      let path = url
        .to_file_path()
        .map_err(|_| DetectorError::ModelPath(format!("无效的 file URL: {}", url)))?;
      info!("加载模型文件: {}", path.display());
      Ok(std::fs::read(path)?)
    }
    _ => {
      info!("加载模型文件: {}", model);
      let data = std::fs::read(model)?;
      debug!("模型大小: {:.2} MB", data.len() as f64 / (1024.0 * 1024.0));
      Ok(data)
    }
  }
}

/// 将平铺的输出浮点序列按 6 个一组切分为候选行
///
/// 末尾不足一行的元素被丢弃（整除语义），但会记录警告。
pub fn reshape_rows(data: &[f32]) -> Vec<DetectionRow> {
  let remainder = data.len() % 6;
  if remainder != 0 {
    warn!(
      "模型输出长度 {} 不是 6 的整数倍，丢弃末尾 {} 个元素",
      data.len(),
      remainder
    );
  }

  data
    .chunks_exact(6)
    .map(|chunk| [chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5]])
    .collect()
}

/// 阈值过滤：仅保留得分严格大于阈值的行
pub fn filter_rows(rows: &[DetectionRow], threshold: f32) -> Vec<DetectionRow> {
  rows
    .iter()
    .copied()
    .filter(|row| row[4] > threshold)
    .collect()
}

/// 过滤后按得分升序排序，取末位（即得分最高者）
pub fn select_best(rows: &[DetectionRow], threshold: f32) -> Option<DetectionRow> {
  let mut survivors = filter_rows(rows, threshold);
  survivors.sort_by(|a, b| a[4].partial_cmp(&b[4]).unwrap_or(std::cmp::Ordering::Equal));
  survivors.pop()
}

/// 将候选行转换为检测结果，类别 id 四舍五入取整后查标签表
pub fn to_detection(row: DetectionRow) -> Detection {
  let class_id = row[5].round() as i64;
  let label = u32::try_from(class_id)
    .ok()
    .and_then(lookup_label)
    .map(str::to_string);

  Detection {
    x: row[0],
    y: row[1],
    width: row[2],
    height: row[3],
    score: row[4],
    class_id: class_id.to_string(),
    label,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(score: f32, class: f32) -> DetectionRow {
    [320.0, 240.0, 100.0, 80.0, score, class]
  }

  #[test]
  fn trailing_partial_row_is_dropped() {
    let data = vec![0.5f32; 6 * 3 + 4];
    let rows = reshape_rows(&data);
    assert_eq!(rows.len(), 3);

    let exact = vec![0.5f32; 6 * 2];
    assert_eq!(reshape_rows(&exact).len(), 2);
  }

  #[test]
  fn raising_threshold_never_adds_survivors() {
    let rows = vec![row(0.1, 0.0), row(0.3, 0.0), row(0.6, 1.0), row(0.9, 1.0)];
    let mut previous = usize::MAX;
    for threshold in [0.0, 0.2, 0.5, 0.8, 0.95] {
      let survivors = filter_rows(&rows, threshold).len();
      assert!(survivors <= previous);
      previous = survivors;
    }
  }

  #[test]
  fn threshold_is_strict() {
    let rows = vec![row(0.5, 0.0)];
    assert!(filter_rows(&rows, 0.5).is_empty());
    assert_eq!(filter_rows(&rows, 0.49).len(), 1);
  }

  #[test]
  fn best_of_n_selects_maximum_survivor() {
    let rows = vec![row(0.3, 0.0), row(0.6, 1.0), row(0.9, 1.0), row(0.1, 0.0)];
    let best = select_best(&rows, 0.2).unwrap();
    assert_eq!(best[4], 0.9);

    assert!(select_best(&rows, 0.95).is_none());
  }

  #[test]
  fn class_id_rounds_before_lookup() {
    let detection = to_detection(row(0.8, 1.4));
    assert_eq!(detection.class_id, "1");
    assert_eq!(detection.label.as_deref(), Some("Takuma Sumi"));

    let detection = to_detection(row(0.8, 0.2));
    assert_eq!(detection.class_id, "0");
    assert_eq!(detection.label.as_deref(), Some("alien"));
  }

  #[test]
  fn unknown_class_keeps_numeric_id_without_label() {
    let detection = to_detection(row(0.7, 7.0));
    assert_eq!(detection.class_id, "7");
    assert!(detection.label.is_none());
  }

  #[test]
  fn label_table_round_trip() {
    assert_eq!(lookup_label(0), Some("alien"));
    assert_eq!(lookup_label(1), Some("Takuma Sumi"));
    assert_eq!(lookup_label(7), None);
  }

  #[test]
  fn conservative_defaults() {
    let config = SessionConfig::default();
    assert_eq!(config.backend, ExecutionBackend::Cpu);
    assert_eq!(config.threads, 1);
    assert!(!config.simd);
    assert!(!config.proxy);
  }
}
