// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/adain.rs - 任意风格迁移示例
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
  config::StyleConfig,
  input::source_url,
  model::OnnxPredictor,
  output::target_url,
  pipeline::run_style_transfer,
  postprocess::Alpha,
};
use tracing::info;

/// 任意风格迁移 (AdaIN)
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 内容图像路径
  #[arg(short, long, default_value = "cornell.jpg", value_name = "IMAGE")]
  pub input: String,

  /// 风格图像路径
  #[arg(short = 't', long, default_value = "woman_with_hat_matisse.jpg", value_name = "STYLE_IMAGE")]
  pub style: String,

  /// 视频输入：图像序列目录或 folder:// URL，设置后忽略 --input
  #[arg(short, long, value_name = "VIDEO")]
  pub video: Option<String>,

  /// 输出路径：图像文件，或视频模式下的帧目录
  #[arg(short, long, default_value = "output.png", value_name = "SAVE_IMAGE_PATH")]
  pub savepath: String,

  /// 同一输入重复推理 5 次以测量耗时（不能与视频模式同时使用）
  #[arg(short, long)]
  pub benchmark: bool,

  /// 风格强度 (0.0 - 1.0)
  #[arg(long, default_value = "1.0", value_name = "ALPHA")]
  pub alpha: f32,

  /// 编码器 (VGG) 模型文件路径
  #[arg(long, default_value = "adain-vgg.onnx", value_name = "FILE")]
  pub vgg: PathBuf,

  /// 解码器模型文件路径
  #[arg(long, default_value = "adain-decoder.onnx", value_name = "FILE")]
  pub decoder: PathBuf,

  /// 视频模式下最多处理的帧数
  #[arg(long, value_name = "COUNT")]
  pub max_frames: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("内容图像: {}", args.input);
  info!("风格图像: {}", args.style);
  info!("输出路径: {}", args.savepath);

  let mut config = StyleConfig::new(
    source_url(&args.input)?,
    source_url(&args.style)?,
    target_url(&args.savepath)?,
  );
  config.video = args.video.as_deref().map(source_url).transpose()?;
  config.benchmark = args.benchmark;
  config.alpha = Alpha::new(args.alpha)?;
  config.frame_number = args.max_frames;

  let encoder = OnnxPredictor::load(&args.vgg)?;
  let decoder = OnnxPredictor::load(&args.decoder)?;

  run_style_transfer(&config, encoder, decoder)?;

  info!("程序正常结束");
  Ok(())
}
