// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/score_filter.rs - 按类别分数筛选候选框
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

use ndarray::{ArrayView2, Axis};

use super::PostprocessError;

/// 返回第 `class_index` 列分数严格大于 `threshold` 的候选索引（升序）
///
/// 第 0 列为背景，不允许查询。结果为空表示该类别没有候选。
pub fn filter(
  scores: ArrayView2<'_, f32>,
  class_index: usize,
  threshold: f32,
) -> Result<Vec<usize>, PostprocessError> {
  if class_index == 0 {
    return Err(PostprocessError::BackgroundClass);
  }
  let columns = scores.ncols();
  if class_index >= columns {
    return Err(PostprocessError::ClassOutOfRange {
      class_index,
      columns,
    });
  }

  let indices = scores
    .index_axis(Axis(1), class_index)
    .iter()
    .enumerate()
    .filter(|&(_, &score)| score > threshold)
    .map(|(i, _)| i)
    .collect();

  Ok(indices)
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::array;

  #[test]
  fn threshold_is_strict() {
    let scores = array![
      [0.1, 0.2, 0.6],
      [0.0, 0.9, 0.4],
      [0.5, 0.0, 0.7],
    ];
    assert_eq!(filter(scores.view(), 2, 0.4).unwrap(), vec![0, 2]);
    assert_eq!(filter(scores.view(), 2, 0.7).unwrap(), Vec::<usize>::new());
    assert_eq!(filter(scores.view(), 1, 0.1).unwrap(), vec![0, 1]);
  }

  #[test]
  fn row_with_class_two_score() {
    let scores = array![[0.0, 0.1, 0.6]];
    assert_eq!(filter(scores.view(), 2, 0.4).unwrap(), vec![0]);
    assert!(filter(scores.view(), 2, 0.7).unwrap().is_empty());
  }

  #[test]
  fn background_and_out_of_range() {
    let scores = array![[0.9, 0.1]];
    assert_eq!(
      filter(scores.view(), 0, 0.0),
      Err(PostprocessError::BackgroundClass)
    );
    assert_eq!(
      filter(scores.view(), 2, 0.0),
      Err(PostprocessError::ClassOutOfRange {
        class_index: 2,
        columns: 2
      })
    );
  }

  #[test]
  fn nan_scores_never_pass() {
    let scores = array![[0.0, f32::NAN], [0.0, 0.8]];
    assert_eq!(filter(scores.view(), 1, 0.5).unwrap(), vec![1]);
  }
}
