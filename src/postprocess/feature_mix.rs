// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/feature_mix.rs - 特征统计量融合 (AdaIN)
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

use ndarray::{Array2, Array4, ArrayView4, Axis};
use tracing::debug;

use super::PostprocessError;

/// 方差下限，保证常数通道的标准差不为零
pub const STD_EPSILON: f32 = 1e-5;

/// 风格混合系数，取值范围 [0, 1]
///
/// 0 表示保持内容特征不变，1 表示完全采用风格统计量。
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Alpha(f32);

impl Alpha {
  pub const CONTENT: Alpha = Alpha(0.0);
  pub const STYLE: Alpha = Alpha(1.0);

  /// 超出 [0, 1] 或非有限值直接拒绝，不做截断
  pub fn new(value: f32) -> Result<Self, PostprocessError> {
    if (0.0..=1.0).contains(&value) {
      Ok(Alpha(value))
    } else {
      Err(PostprocessError::InvalidAlpha(value))
    }
  }

  pub fn get(self) -> f32 {
    self.0
  }
}

impl Default for Alpha {
  fn default() -> Self {
    Alpha::STYLE
  }
}

/// 按 (batch, channel) 计算空间维度上的均值与标准差
///
/// 标准差为 `sqrt(var + eps)`，其中 `var` 为总体方差。
/// 返回形状均为 `(batch, channel)` 的 `(mean, std)`。
pub fn channel_stats(tensor: ArrayView4<'_, f32>, eps: f32) -> (Array2<f32>, Array2<f32>) {
  let (batch, channels, _, _) = tensor.dim();
  let mut mean = Array2::<f32>::zeros((batch, channels));
  let mut std = Array2::<f32>::zeros((batch, channels));

  for (n, sample) in tensor.axis_iter(Axis(0)).enumerate() {
    for (c, plane) in sample.axis_iter(Axis(0)).enumerate() {
      let count = plane.len() as f64;
      let sum: f64 = plane.iter().map(|&v| v as f64).sum();
      let m = sum / count;
      let var = plane
        .iter()
        .map(|&v| {
          let d = v as f64 - m;
          d * d
        })
        .sum::<f64>()
        / count;
      mean[[n, c]] = m as f32;
      std[[n, c]] = (var + eps as f64).sqrt() as f32;
    }
  }

  (mean, std)
}

/// 将内容特征的逐通道统计量替换为风格特征的统计量，并按 alpha 与原内容插值
///
/// 内容与风格的 batch、channel 维度必须一致，空间维度可以不同。
pub fn fuse(
  content: ArrayView4<'_, f32>,
  style: ArrayView4<'_, f32>,
  alpha: Alpha,
) -> Result<Array4<f32>, PostprocessError> {
  let (cn, cc, ch, cw) = content.dim();
  let (sn, sc, sh, sw) = style.dim();

  if cn != sn || cc != sc {
    return Err(PostprocessError::ShapeMismatch {
      content: [cn, cc, ch, cw],
      style: [sn, sc, sh, sw],
    });
  }
  if ch * cw == 0 {
    return Err(PostprocessError::EmptySpatial([cn, cc, ch, cw]));
  }
  if sh * sw == 0 {
    return Err(PostprocessError::EmptySpatial([sn, sc, sh, sw]));
  }

  debug!(
    "融合特征: 内容 {:?}, 风格 {:?}, alpha = {}",
    content.shape(),
    style.shape(),
    alpha.get()
  );

  let (content_mean, content_std) = channel_stats(content, STD_EPSILON);
  let (style_mean, style_std) = channel_stats(style, STD_EPSILON);
  let a = alpha.get();

  let mut output = content.to_owned();
  for (n, mut sample) in output.axis_iter_mut(Axis(0)).enumerate() {
    for (c, mut plane) in sample.axis_iter_mut(Axis(0)).enumerate() {
      let cm = content_mean[[n, c]];
      let cs = content_std[[n, c]];
      let sm = style_mean[[n, c]];
      let ss = style_std[[n, c]];
      plane.mapv_inplace(|x| {
        let styled = (x - cm) / cs * ss + sm;
        a * styled + (1.0 - a) * x
      });
    }
  }

  Ok(output)
}
