// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/style_transfer.rs - 任意风格迁移 (AdaIN)
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

use image::{RgbImage, imageops::FilterType};
use ndarray::{Array4, ArrayD, Ix4};
use tracing::debug;

use crate::{
  frame::{Frame, Normalize, image_to_tensor, pad_to_fit, tensor_to_image},
  model::{Model, ModelError, Predictor, StyledImage},
  postprocess::{Alpha, fuse},
};

/// 编码器提取特征，统计量融合后由解码器还原图像
///
/// 风格图像在构建时转为张量；每次推理都重新提取风格特征，帧之间不保留状态。
/// 开启 `keep_aspect` 时内容帧先等比缩放并补黑边，输出时再裁掉黑边。
pub struct StyleTransfer<P> {
  encoder: P,
  decoder: P,
  style: Array4<f32>,
  alpha: Alpha,
  size: u32,
  keep_aspect: bool,
}

impl<P: Predictor> StyleTransfer<P> {
  pub fn new(encoder: P, decoder: P, style: &RgbImage, alpha: Alpha, size: u32) -> Self {
    let style = image_to_tensor(style, (size, size), Normalize::Unit);
    Self {
      encoder,
      decoder,
      style,
      alpha,
      size,
      keep_aspect: false,
    }
  }

  pub fn with_keep_aspect(mut self, keep_aspect: bool) -> Self {
    self.keep_aspect = keep_aspect;
    self
  }

  fn first_output(&self, outputs: Vec<ArrayD<f32>>) -> Result<Array4<f32>, ModelError> {
    let actual = outputs.len();
    let output = outputs
      .into_iter()
      .next()
      .ok_or(ModelError::MissingOutput {
        expected: 1,
        actual,
      })?;
    let shape = output.shape().to_vec();
    output
      .into_dimensionality::<Ix4>()
      .map_err(|_| ModelError::OutputShape { index: 0, shape })
  }

  /// 对已预处理的内容张量做一次完整的 编码 → 融合 → 解码
  pub fn transfer(&self, content: &Array4<f32>) -> Result<Array4<f32>, ModelError> {
    let content_f = self.encode(content)?;
    let style_f = self.encode(&self.style)?;
    debug!(
      "内容特征 {:?}, 风格特征 {:?}",
      content_f.shape(),
      style_f.shape()
    );

    let fused = fuse(content_f.view(), style_f.view(), self.alpha)?;
    let decoded = self
      .decoder
      .predict(&fused)
      .map_err(ModelError::predictor)?;
    self.first_output(decoded)
  }

  fn encode(&self, input: &Array4<f32>) -> Result<Array4<f32>, ModelError> {
    let outputs = self
      .encoder
      .predict(input)
      .map_err(ModelError::predictor)?;
    self.first_output(outputs)
  }
}

impl<P: Predictor> Model for StyleTransfer<P> {
  type Input = Frame;
  type Output = StyledImage;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let target = (self.size, self.size);
    let (content, region) = if self.keep_aspect {
      let (padded, region) = pad_to_fit(&input.image, target);
      (image_to_tensor(&padded, target, Normalize::Unit), Some(region))
    } else {
      (image_to_tensor(&input.image, target, Normalize::Unit), None)
    };
    let decoded = self.transfer(&content)?;
    let mut image = tensor_to_image(decoded.view())?;

    // 解码器输出尺寸可能与输入不同，按比例换算内容区域
    if let Some([x, y, w, h]) = region {
      let (ow, oh) = image.dimensions();
      let sx = ow as f32 / self.size as f32;
      let sy = oh as f32 / self.size as f32;
      let cx = ((x as f32 * sx) as u32).min(ow.saturating_sub(1));
      let cy = ((y as f32 * sy) as u32).min(oh.saturating_sub(1));
      let cw = ((w as f32 * sx).round() as u32).clamp(1, ow - cx);
      let ch = ((h as f32 * sy).round() as u32).clamp(1, oh - cy);
      image = image::imageops::crop_imm(&image, cx, cy, cw, ch).to_image();
    }

    // 解码结果缩放回原始帧尺寸
    let (w, h) = input.image.dimensions();
    let image = if image.dimensions() == (w, h) {
      image
    } else {
      image::imageops::resize(&image, w, h, FilterType::Triangle)
    };

    Ok(StyledImage { image })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageBuffer, Rgb};
  use std::convert::Infallible;

  /// 把输入原样当作特征/图像返回
  struct Echo;

  impl Predictor for Echo {
    type Error = Infallible;

    fn predict(&self, input: &Array4<f32>) -> Result<Vec<ArrayD<f32>>, Self::Error> {
      Ok(vec![input.clone().into_dyn()])
    }
  }

  struct Nothing;

  impl Predictor for Nothing {
    type Error = Infallible;

    fn predict(&self, _input: &Array4<f32>) -> Result<Vec<ArrayD<f32>>, Self::Error> {
      Ok(Vec::new())
    }
  }

  fn gradient(w: u32, h: u32) -> RgbImage {
    ImageBuffer::from_fn(w, h, |x, y| Rgb([(x * 20) as u8, (y * 30) as u8, 90]))
  }

  #[test]
  fn zero_alpha_round_trips_content() {
    let style = ImageBuffer::from_pixel(8, 8, Rgb([200u8, 10, 10]));
    let model = StyleTransfer::new(Echo, Echo, &style, Alpha::CONTENT, 8);
    let frame = Frame::new(gradient(8, 8), 0);
    let out = model.infer(&frame).unwrap();
    assert_eq!(out.image, frame.image);
  }

  #[test]
  fn output_matches_frame_size() {
    let style = gradient(5, 5);
    let model = StyleTransfer::new(Echo, Echo, &style, Alpha::STYLE, 8);
    let frame = Frame::new(gradient(12, 6), 3);
    let out = model.infer(&frame).unwrap();
    assert_eq!(out.image.dimensions(), (12, 6));
  }

  #[test]
  fn padded_frames_crop_the_border_back_out() {
    let style = ImageBuffer::from_pixel(8, 8, Rgb([0u8, 0, 0]));
    let color = Rgb([200u8, 100, 50]);
    let model =
      StyleTransfer::new(Echo, Echo, &style, Alpha::CONTENT, 16).with_keep_aspect(true);
    let frame = Frame::new(ImageBuffer::from_pixel(40, 20, color), 0);
    let out = model.infer(&frame).unwrap();
    assert_eq!(out.image.dimensions(), (40, 20));
    // 黑边被裁掉，四角仍为原色
    for (x, y) in [(0, 0), (39, 0), (0, 19), (39, 19)] {
      let p = out.image.get_pixel(x, y);
      for c in 0..3 {
        assert!((p[c] as i32 - color[c] as i32).abs() <= 2, "{:?}", p);
      }
    }
  }

  #[test]
  fn missing_encoder_output_is_an_error() {
    let style = gradient(4, 4);
    let model = StyleTransfer::new(Nothing, Nothing, &style, Alpha::STYLE, 4);
    let frame = Frame::new(gradient(4, 4), 0);
    assert!(matches!(
      model.infer(&frame),
      Err(ModelError::MissingOutput {
        expected: 1,
        actual: 0
      })
    ));
  }
}
