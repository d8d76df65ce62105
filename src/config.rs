// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 流水线配置
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

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::postprocess::{Alpha, AssembleParams};

pub const DEFAULT_THRESHOLD: f32 = 0.4;
pub const DEFAULT_IOU: f32 = 0.45;
pub const DEFAULT_KEEP_PER_CLASS: usize = 10;
pub const STYLE_IMAGE_SIZE: u32 = 512;
pub const M2DET_INPUT_SIZE: u32 = 512;
pub const BENCHMARK_ITERATIONS: usize = 5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("基准测试模式不能与视频模式同时使用")]
  BenchmarkWithVideo,
  #[error("{name} 必须位于 [0, 1]，实际为 {value}")]
  OutOfUnitRange { name: &'static str, value: f32 },
  #[error("{0} 必须大于 0")]
  Zero(&'static str),
}

/// 运行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
  /// 单张图像，处理一次后输出
  Image,
  /// 单张图像，重复推理并报告耗时
  Benchmark,
  /// 按顺序处理帧序列
  Video,
}

fn mode_of(video: &Option<Url>, benchmark: bool) -> Result<RunMode, ConfigError> {
  match (video.is_some(), benchmark) {
    (true, true) => Err(ConfigError::BenchmarkWithVideo),
    (true, false) => Ok(RunMode::Video),
    (false, true) => Ok(RunMode::Benchmark),
    (false, false) => Ok(RunMode::Image),
  }
}

fn unit_range(name: &'static str, value: f32) -> Result<(), ConfigError> {
  if (0.0..=1.0).contains(&value) {
    Ok(())
  } else {
    Err(ConfigError::OutOfUnitRange { name, value })
  }
}

/// 风格迁移流水线配置
#[derive(Debug, Clone)]
pub struct StyleConfig {
  pub input: Url,
  pub style: Url,
  pub video: Option<Url>,
  pub savepath: Url,
  pub benchmark: bool,
  pub alpha: Alpha,
  pub image_size: u32,
  pub frame_number: Option<usize>,
}

impl StyleConfig {
  pub fn new(input: Url, style: Url, savepath: Url) -> Self {
    Self {
      input,
      style,
      video: None,
      savepath,
      benchmark: false,
      alpha: Alpha::default(),
      image_size: STYLE_IMAGE_SIZE,
      frame_number: None,
    }
  }

  pub fn mode(&self) -> Result<RunMode, ConfigError> {
    if self.image_size == 0 {
      return Err(ConfigError::Zero("image_size"));
    }
    mode_of(&self.video, self.benchmark)
  }

  /// 内容帧来源：视频模式下为视频，否则为输入图像
  pub fn source(&self) -> &Url {
    self.video.as_ref().unwrap_or(&self.input)
  }
}

/// 目标检测流水线配置
#[derive(Debug, Clone)]
pub struct DetectConfig {
  pub input: Url,
  pub video: Option<Url>,
  pub savepath: Url,
  pub benchmark: bool,
  pub params: AssembleParams,
  pub input_size: u32,
  pub font: Option<PathBuf>,
  pub frame_number: Option<usize>,
}

impl DetectConfig {
  pub fn new(input: Url, savepath: Url, num_classes: usize) -> Self {
    Self {
      input,
      video: None,
      savepath,
      benchmark: false,
      params: AssembleParams::with_num_classes(num_classes),
      input_size: M2DET_INPUT_SIZE,
      font: None,
      frame_number: None,
    }
  }

  pub fn mode(&self) -> Result<RunMode, ConfigError> {
    unit_range("threshold", self.params.score_threshold)?;
    unit_range("iou", self.params.overlap_threshold)?;
    if self.params.num_classes == 0 {
      return Err(ConfigError::Zero("num_classes"));
    }
    if self.input_size == 0 {
      return Err(ConfigError::Zero("input_size"));
    }
    mode_of(&self.video, self.benchmark)
  }

  pub fn source(&self) -> &Url {
    self.video.as_ref().unwrap_or(&self.input)
  }
}
