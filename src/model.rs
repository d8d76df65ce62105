// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::RgbImage;
use ndarray::{Array4, ArrayD};
use thiserror::Error;

use crate::frame::FrameError;
use crate::postprocess::PostprocessError;

/// 外部推理引擎边界：输入一个张量，同步返回全部输出张量
pub trait Predictor {
  type Error: std::error::Error + Send + Sync + 'static;

  fn predict(&self, input: &Array4<f32>) -> Result<Vec<ArrayD<f32>>, Self::Error>;
}

impl<P: Predictor + ?Sized> Predictor for &P {
  type Error = P::Error;

  fn predict(&self, input: &Array4<f32>) -> Result<Vec<ArrayD<f32>>, Self::Error> {
    (**self).predict(input)
  }
}

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("推理引擎错误: {0}")]
  Predictor(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("模型输出数量不足: 期望至少 {expected}, 实际 {actual}")]
  MissingOutput { expected: usize, actual: usize },
  #[error("模型输出 {index} 形状无效: {shape:?}")]
  OutputShape { index: usize, shape: Vec<usize> },
  #[error("后处理错误: {0}")]
  Postprocess(#[from] PostprocessError),
  #[error("帧转换错误: {0}")]
  Frame(#[from] FrameError),
}

impl ModelError {
  pub fn predictor<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
    ModelError::Predictor(Box::new(err))
  }
}

#[derive(Debug, Clone)]
pub struct DetectItem<T> {
  pub kind: T,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，原图像素坐标
}

#[derive(Debug, Clone)]
pub struct DetectResult<T> {
  pub items: Box<[DetectItem<T>]>,
}

impl<T> Default for DetectResult<T> {
  fn default() -> Self {
    Self {
      items: Box::new([]),
    }
  }
}

impl<T> DetectResult<T> {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
  fn from_label_id(id: u32) -> Self;
}

/// 风格迁移输出，已缩放回输入帧尺寸
#[derive(Debug, Clone)]
pub struct StyledImage {
  pub image: RgbImage,
}

/// 结果摘要，用于日志输出；没有可报告的内容时返回 `None`
pub trait Summary {
  fn summary(&self) -> Option<String>;
}

impl<T: WithLabel> Summary for DetectResult<T> {
  fn summary(&self) -> Option<String> {
    if self.is_empty() {
      return None;
    }
    let lines: Vec<String> = self
      .items
      .iter()
      .map(|item| {
        format!(
          "pos:({:.1},{:.1},{:.1},{:.1}), ids:{}, score:{:.3}",
          item.bbox[0],
          item.bbox[1],
          item.bbox[2],
          item.bbox[3],
          item.kind.to_label_str(),
          item.score
        )
      })
      .collect();
    Some(lines.join("\n"))
  }
}

impl Summary for StyledImage {
  fn summary(&self) -> Option<String> {
    Some(format!(
      "风格化图像 {}x{}",
      self.image.width(),
      self.image.height()
    ))
  }
}

mod label;
pub use self::label::{COCO_CATEGORY, CocoLabel};

mod style_transfer;
pub use self::style_transfer::StyleTransfer;

mod m2det;
pub use self::m2det::M2Det;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxPredictor, OnnxPredictorError};
