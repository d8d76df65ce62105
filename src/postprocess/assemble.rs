// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/assemble.rs - 多类别检测结果组装
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

use ndarray::ArrayView2;
use tracing::debug;

use super::{PostprocessError, filter, suppress};
use crate::config::{DEFAULT_IOU, DEFAULT_KEEP_PER_CLASS, DEFAULT_THRESHOLD};
use crate::model::{DetectItem, DetectResult, WithLabel};

/// 图像尺寸（宽, 高）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
  pub width: f32,
  pub height: f32,
}

impl Size {
  /// 归一化坐标系
  pub const UNIT: Size = Size {
    width: 1.0,
    height: 1.0,
  };

  pub fn new(width: f32, height: f32) -> Self {
    Self { width, height }
  }

  fn is_valid(&self) -> bool {
    self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
  }
}

impl From<(u32, u32)> for Size {
  fn from((width, height): (u32, u32)) -> Self {
    Size::new(width as f32, height as f32)
  }
}

/// 单帧网络原始输出
///
/// `boxes` 形状为 `(N, 4)`，`scores` 形状为 `(N, num_classes + 1)`，第 0 列为背景。
#[derive(Debug, Clone, Copy)]
pub struct RawDetectionSet<'a> {
  pub boxes: ArrayView2<'a, f32>,
  pub scores: ArrayView2<'a, f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssembleParams {
  pub num_classes: usize,
  pub score_threshold: f32,
  pub overlap_threshold: f32,
  pub max_keep_per_class: usize,
}

impl AssembleParams {
  pub fn with_num_classes(num_classes: usize) -> Self {
    Self {
      num_classes,
      score_threshold: DEFAULT_THRESHOLD,
      overlap_threshold: DEFAULT_IOU,
      max_keep_per_class: DEFAULT_KEEP_PER_CLASS,
    }
  }
}

/// 逐类别筛选、抑制并合并检测结果，再缩放到原图像素坐标
///
/// 输出先按类别索引、再按类内抑制顺序排列，不做全局重排。
pub fn assemble<T: WithLabel>(
  raw: &RawDetectionSet<'_>,
  params: &AssembleParams,
  original: Size,
  network: Size,
) -> Result<DetectResult<T>, PostprocessError> {
  if raw.boxes.ncols() != 4 {
    return Err(PostprocessError::MalformedBoxes(format!(
      "期望 (N, 4), 实际 {:?}",
      raw.boxes.shape()
    )));
  }
  if raw.boxes.nrows() != raw.scores.nrows() {
    return Err(PostprocessError::LengthMismatch {
      boxes: raw.boxes.nrows(),
      scores: raw.scores.nrows(),
    });
  }
  if raw.scores.ncols() <= params.num_classes {
    return Err(PostprocessError::ClassOutOfRange {
      class_index: params.num_classes,
      columns: raw.scores.ncols(),
    });
  }
  for size in [original, network] {
    if !size.is_valid() {
      return Err(PostprocessError::InvalidSize {
        width: size.width,
        height: size.height,
      });
    }
  }

  let sx = original.width / network.width;
  let sy = original.height / network.height;

  let mut items = Vec::new();
  for class_index in 1..=params.num_classes {
    let indices = filter(raw.scores, class_index, params.score_threshold)?;
    if indices.is_empty() {
      continue;
    }

    let boxes: Vec<[f32; 4]> = indices
      .iter()
      .map(|&i| {
        let row = raw.boxes.row(i);
        [row[0], row[1], row[2], row[3]]
      })
      .collect();
    let scores: Vec<f32> = indices
      .iter()
      .map(|&i| raw.scores[[i, class_index]])
      .collect();

    let keep = suppress(
      &boxes,
      &scores,
      params.overlap_threshold,
      params.max_keep_per_class,
    )?;
    debug!(
      "类别 {}: 候选 {} 个, 保留 {} 个",
      class_index,
      indices.len(),
      keep.len()
    );

    items.extend(keep.into_iter().map(|k| {
      let b = boxes[k];
      DetectItem {
        kind: T::from_label_id(class_index as u32),
        score: scores[k],
        bbox: [b[0] * sx, b[1] * sy, b[2] * sx, b[3] * sy],
      }
    }));
  }

  Ok(DetectResult {
    items: items.into_boxed_slice(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::CocoLabel;
  use ndarray::{Array2, array};

  fn params(num_classes: usize) -> AssembleParams {
    AssembleParams {
      num_classes,
      score_threshold: 0.4,
      overlap_threshold: 0.5,
      max_keep_per_class: 10,
    }
  }

  #[test]
  fn rescales_to_original_frame() {
    let boxes = array![[0.1f32, 0.2, 0.5, 0.6]];
    let scores = array![[0.0f32, 0.9]];
    let raw = RawDetectionSet {
      boxes: boxes.view(),
      scores: scores.view(),
    };
    let result: DetectResult<CocoLabel> = assemble(
      &raw,
      &params(1),
      Size::new(896.0, 448.0),
      Size::new(448.0, 448.0),
    )
    .unwrap();

    assert_eq!(result.len(), 1);
    let bbox = result.items[0].bbox;
    let expected = [0.2, 0.2, 1.0, 0.6];
    for (got, want) in bbox.iter().zip(expected) {
      assert!((got - want).abs() < 1e-6, "{:?}", bbox);
    }
  }

  #[test]
  fn merges_by_class_then_score() {
    // 4 个候选，2 个类别
    let boxes = array![
      [0.0f32, 0.0, 10.0, 10.0],
      [1.0, 1.0, 11.0, 11.0],
      [50.0, 50.0, 60.0, 60.0],
      [80.0, 80.0, 90.0, 90.0],
    ];
    let scores = array![
      [0.0f32, 0.9, 0.1],
      [0.0, 0.8, 0.5],
      [0.0, 0.7, 0.95],
      [0.0, 0.1, 0.6],
    ];
    let raw = RawDetectionSet {
      boxes: boxes.view(),
      scores: scores.view(),
    };
    let result: DetectResult<CocoLabel> =
      assemble(&raw, &params(2), Size::UNIT, Size::UNIT).unwrap();

    let got: Vec<(u32, f32)> = result
      .items
      .iter()
      .map(|item| (item.kind.to_label_id(), item.score))
      .collect();
    assert_eq!(got, vec![(1, 0.9), (1, 0.7), (2, 0.95), (2, 0.6), (2, 0.5)]);
  }

  #[test]
  fn nothing_above_threshold_is_empty() {
    let boxes = Array2::<f32>::zeros((3, 4));
    let scores = Array2::<f32>::from_elem((3, 4), 0.2);
    let raw = RawDetectionSet {
      boxes: boxes.view(),
      scores: scores.view(),
    };
    let result: DetectResult<CocoLabel> =
      assemble(&raw, &params(3), Size::UNIT, Size::UNIT).unwrap();
    assert!(result.is_empty());
  }

  #[test]
  fn malformed_inputs_are_errors() {
    let scores = Array2::<f32>::zeros((2, 3));

    let boxes = Array2::<f32>::zeros((2, 5));
    let raw = RawDetectionSet {
      boxes: boxes.view(),
      scores: scores.view(),
    };
    assert!(matches!(
      assemble::<CocoLabel>(&raw, &params(2), Size::UNIT, Size::UNIT),
      Err(PostprocessError::MalformedBoxes(_))
    ));

    let boxes = Array2::<f32>::zeros((3, 4));
    let raw = RawDetectionSet {
      boxes: boxes.view(),
      scores: scores.view(),
    };
    assert!(matches!(
      assemble::<CocoLabel>(&raw, &params(2), Size::UNIT, Size::UNIT),
      Err(PostprocessError::LengthMismatch { boxes: 3, scores: 2 })
    ));

    let boxes = Array2::<f32>::zeros((2, 4));
    let raw = RawDetectionSet {
      boxes: boxes.view(),
      scores: scores.view(),
    };
    assert!(matches!(
      assemble::<CocoLabel>(&raw, &params(3), Size::UNIT, Size::UNIT),
      Err(PostprocessError::ClassOutOfRange { .. })
    ));
    assert!(matches!(
      assemble::<CocoLabel>(&raw, &params(2), Size::new(0.0, 10.0), Size::UNIT),
      Err(PostprocessError::InvalidSize { .. })
    ));
  }
}
