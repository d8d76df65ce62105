// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/m2det.rs - M2Det 目标检测示例
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

use anyhow::Result;
use clap::Parser;
use shanan_post::{
  config::{DEFAULT_IOU, DEFAULT_KEEP_PER_CLASS, DEFAULT_THRESHOLD, DetectConfig, M2DET_INPUT_SIZE},
  input::source_url,
  model::{CocoLabel, OnnxPredictor},
  output::target_url,
  pipeline::run_detection,
};
use tracing::info;

/// M2Det 多类别目标检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像路径
  #[arg(short, long, default_value = "couple.jpg", value_name = "IMAGE")]
  pub input: String,

  /// 视频输入：图像序列目录或 folder:// URL，设置后忽略 --input
  #[arg(short, long, value_name = "VIDEO")]
  pub video: Option<String>,

  /// 输出路径：图像文件，或帧目录（支持 folder:///dir?record=json）
  #[arg(short, long, default_value = "output.png", value_name = "SAVE_IMAGE_PATH")]
  pub savepath: String,

  /// 同一输入重复推理 5 次以测量耗时（不能与视频模式同时使用）
  #[arg(short, long)]
  pub benchmark: bool,

  /// 检测模型文件路径
  #[arg(long, default_value = "m2det.onnx", value_name = "FILE")]
  pub model: PathBuf,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_name = "THRESHOLD")]
  pub threshold: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_IOU, value_name = "THRESHOLD")]
  pub iou: f32,

  /// 每个类别最多保留的检测框数量
  #[arg(long, default_value_t = DEFAULT_KEEP_PER_CLASS, value_name = "COUNT")]
  pub keep_per_class: usize,

  /// 模型输入边长
  #[arg(long, default_value_t = M2DET_INPUT_SIZE, value_name = "SIZE")]
  pub input_size: u32,

  /// 标签字体文件（TTF/OTF），不提供时只绘制检测框
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,

  /// 视频模式下最多处理的帧数
  #[arg(long, value_name = "COUNT")]
  pub max_frames: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model.display());
  info!("输入来源: {}", args.video.as_deref().unwrap_or(&args.input));
  info!("输出路径: {}", args.savepath);

  let mut config = DetectConfig::new(
    source_url(&args.input)?,
    target_url(&args.savepath)?,
    CocoLabel::NUM_CLASSES,
  );
  config.video = args.video.as_deref().map(source_url).transpose()?;
  config.benchmark = args.benchmark;
  config.params.score_threshold = args.threshold;
  config.params.overlap_threshold = args.iou;
  config.params.max_keep_per_class = args.keep_per_class;
  config.input_size = args.input_size;
  config.font = args.font;
  config.frame_number = args.max_frames;

  let detector = OnnxPredictor::load(&args.model)?;

  run_detection(&config, detector)?;

  info!("程序正常结束");
  Ok(())
}
