// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/suppress.rs - 单类别贪心非极大值抑制
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

use tracing::trace;

use super::PostprocessError;

// 像素包含约定：宽高均额外 +1
fn area(b: &[f32; 4]) -> f32 {
  (b[2] - b[0] + 1.0) * (b[3] - b[1] + 1.0)
}

fn overlap(a: &[f32; 4], area_a: f32, b: &[f32; 4], area_b: f32) -> f32 {
  let w = (a[2].min(b[2]) - a[0].max(b[0]) + 1.0).max(0.0);
  let h = (a[3].min(b[3]) - a[1].max(b[1]) + 1.0).max(0.0);
  let inter = w * h;
  let union = area_a + area_b - inter;
  // 退化框的并集可能为零、负数或非有限值；极小的正并集照常计算
  if union > 0.0 && union.is_finite() {
    inter / union
  } else {
    0.0
  }
}

/// 两个框 `[x1, y1, x2, y2]` 的交并比，采用 +1 像素包含约定
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  overlap(a, area(a), b, area(b))
}

/// 对单一类别的候选框做贪心非极大值抑制
///
/// 返回保留下来的候选索引，按分数降序排列（同分时索引小者在前）。
/// 与已保留框的 IoU 大于 `overlap_threshold` 的候选会被丢弃，
/// 最多保留 `max_keep` 个。
pub fn suppress(
  boxes: &[[f32; 4]],
  scores: &[f32],
  overlap_threshold: f32,
  max_keep: usize,
) -> Result<Vec<usize>, PostprocessError> {
  if boxes.len() != scores.len() {
    return Err(PostprocessError::LengthMismatch {
      boxes: boxes.len(),
      scores: scores.len(),
    });
  }

  let areas: Vec<f32> = boxes.iter().map(area).collect();

  // sort_by 为稳定排序，同分保持原索引顺序
  let mut order: Vec<usize> = (0..boxes.len()).collect();
  order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

  let mut keep = Vec::with_capacity(max_keep.min(boxes.len()));
  while let Some((&best, rest)) = order.split_first() {
    if keep.len() >= max_keep {
      break;
    }
    keep.push(best);
    order = rest
      .iter()
      .copied()
      .filter(|&i| overlap(&boxes[best], areas[best], &boxes[i], areas[i]) <= overlap_threshold)
      .collect();
  }

  trace!("抑制后保留 {} / {} 个候选框", keep.len(), boxes.len());
  Ok(keep)
}
