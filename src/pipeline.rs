// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline.rs - 风格迁移与目标检测流水线
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

use tracing::info;

use crate::{
  FromUrl,
  config::{DetectConfig, RunMode, StyleConfig},
  input::{InputWrapper, load_image},
  model::{CocoLabel, M2Det, Predictor, StyleTransfer},
  output::{OutputWrapper, draw::Draw},
  task::{ContinuousTask, OneShotTask, RepeatShotTask, Task},
};

/// 任意风格迁移：编码器与解码器各一个推理引擎
pub fn run_style_transfer<P: Predictor>(
  config: &StyleConfig,
  encoder: P,
  decoder: P,
) -> anyhow::Result<()> {
  let mode = config.mode()?;
  info!("风格迁移模式: {:?}, alpha: {}", mode, config.alpha.get());

  let style = load_image(&config.style)?;
  info!("风格图像: {}x{}", style.width(), style.height());
  // 视频帧等比缩放补边，避免拉伸变形
  let model = StyleTransfer::new(encoder, decoder, &style, config.alpha, config.image_size)
    .with_keep_aspect(mode == RunMode::Video);

  let input = InputWrapper::from_url(config.source())?;
  let output = OutputWrapper::from_url(&config.savepath)?;

  match mode {
    RunMode::Image => OneShotTask.run_task(input, model, output),
    RunMode::Benchmark => RepeatShotTask::default().run_task(input, model, output),
    RunMode::Video => ContinuousTask::default()
      .with_frame_number(config.frame_number)
      .run_task(input, model, output),
  }
}

/// M2Det 多类别目标检测
pub fn run_detection<P: Predictor>(config: &DetectConfig, detector: P) -> anyhow::Result<()> {
  let mode = config.mode()?;
  info!(
    "目标检测模式: {:?}, 阈值: {}, IoU: {}, 每类最多: {}",
    mode,
    config.params.score_threshold,
    config.params.overlap_threshold,
    config.params.max_keep_per_class
  );

  let model: M2Det<P, CocoLabel> = M2Det::new(detector, config.params, config.input_size);

  let input = InputWrapper::from_url(config.source())?;
  let mut output = OutputWrapper::from_url(&config.savepath)?;
  if let Some(font) = &config.font {
    output = output.with_draw(Draw::with_font_file(font)?);
  }

  match mode {
    RunMode::Image => OneShotTask.run_task(input, model, output),
    RunMode::Benchmark => RepeatShotTask::default().run_task(input, model, output),
    RunMode::Video => ContinuousTask::default()
      .with_frame_number(config.frame_number)
      .run_task(input, model, output),
  }
}
