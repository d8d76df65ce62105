// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess.rs - 张量后处理
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

//! 网络原始输出到最终结果的数值后处理。
//!
//! 所有函数均无状态：输入全部通过参数传入，每次调用返回新的结果。

use thiserror::Error;

mod assemble;
mod feature_mix;
mod score_filter;
mod suppress;

pub use self::assemble::{AssembleParams, RawDetectionSet, Size, assemble};
pub use self::feature_mix::{Alpha, STD_EPSILON, channel_stats, fuse};
pub use self::score_filter::filter;
pub use self::suppress::{iou, suppress};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostprocessError {
  #[error("混合系数 alpha 必须位于 [0, 1]，实际为 {0}")]
  InvalidAlpha(f32),
  #[error("特征张量形状不匹配: 内容 {content:?}, 风格 {style:?}")]
  ShapeMismatch {
    content: [usize; 4],
    style: [usize; 4],
  },
  #[error("特征张量空间维度为空: {0:?}")]
  EmptySpatial([usize; 4]),
  #[error("背景类别 (0) 不参与筛选")]
  BackgroundClass,
  #[error("类别索引 {class_index} 超出分数矩阵列数 {columns}")]
  ClassOutOfRange { class_index: usize, columns: usize },
  #[error("候选框数量 {boxes} 与分数数量 {scores} 不一致")]
  LengthMismatch { boxes: usize, scores: usize },
  #[error("检测框张量形状无效: {0}")]
  MalformedBoxes(String),
  #[error("图像尺寸无效: {width}x{height}")]
  InvalidSize { width: f32, height: f32 },
}
