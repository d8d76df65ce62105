// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 帧定义与图像/张量转换
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

use image::{ImageBuffer, Rgb, RgbImage, imageops::FilterType};
use ndarray::{Array4, ArrayView4};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;

/// M2Det 预处理减去的 BGR 均值
const BGR_MEANS: [f32; 3] = [104.0, 117.0, 123.0];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
  #[error("张量形状无效: 期望 (1, 3, H, W), 实际 {0:?}")]
  InvalidShape(Vec<usize>),
}

/// 帧数据
#[derive(Debug, Clone)]
pub struct Frame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 帧索引
  pub index: u64,
}

impl Frame {
  pub fn new(image: RgbImage, index: u64) -> Self {
    Self { image, index }
  }
}

/// 输入张量的通道顺序与数值范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalize {
  /// RGB 顺序，除以 255 缩放到 [0, 1]
  Unit,
  /// BGR 顺序，减去通道均值，不缩放
  BgrMean,
}

/// 缩放图像并转为 `(1, 3, H, W)` 浮点张量
pub fn image_to_tensor(
  image: &RgbImage,
  (width, height): (u32, u32),
  normalize: Normalize,
) -> Array4<f32> {
  let resized;
  let image = if image.dimensions() == (width, height) {
    image
  } else {
    resized = image::imageops::resize(image, width, height, FilterType::Triangle);
    &resized
  };

  let (w, h) = (width as usize, height as usize);
  let mut tensor = Array4::<f32>::zeros((1, RGB_CHANNELS, h, w));
  for (x, y, pixel) in image.enumerate_pixels() {
    let (x, y) = (x as usize, y as usize);
    for c in 0..RGB_CHANNELS {
      tensor[[0, c, y, x]] = match normalize {
        Normalize::Unit => pixel[c] as f32 / 255.0,
        Normalize::BgrMean => pixel[RGB_CHANNELS - 1 - c] as f32 - BGR_MEANS[c],
      };
    }
  }
  tensor
}

/// 等比缩放后居中放到黑色画布上
///
/// 返回填充后的图像与内容所在区域 `[x, y, width, height]`。
pub fn pad_to_fit(image: &RgbImage, (width, height): (u32, u32)) -> (RgbImage, [u32; 4]) {
  let (iw, ih) = image.dimensions();
  let scale = (width as f32 / iw.max(1) as f32).min(height as f32 / ih.max(1) as f32);
  let nw = ((iw as f32 * scale).round() as u32).clamp(1, width.max(1));
  let nh = ((ih as f32 * scale).round() as u32).clamp(1, height.max(1));
  let (x, y) = ((width.saturating_sub(nw)) / 2, (height.saturating_sub(nh)) / 2);

  let resized = image::imageops::resize(image, nw, nh, FilterType::Triangle);
  let mut canvas = RgbImage::new(width, height);
  image::imageops::replace(&mut canvas, &resized, x as i64, y as i64);
  (canvas, [x, y, nw, nh])
}

/// 将 `(1, 3, H, W)` 的 RGB [0, 1] 张量转回图像
pub fn tensor_to_image(tensor: ArrayView4<'_, f32>) -> Result<RgbImage, FrameError> {
  let (n, c, h, w) = tensor.dim();
  if n != 1 || c != RGB_CHANNELS || h == 0 || w == 0 {
    return Err(FrameError::InvalidShape(tensor.shape().to_vec()));
  }

  let to_u8 = |v: f32| (v * 255.0 + 0.5).clamp(0.0, 255.0) as u8;
  Ok(ImageBuffer::from_fn(w as u32, h as u32, |x, y| {
    let (x, y) = (x as usize, y as usize);
    Rgb([
      to_u8(tensor[[0, 0, y, x]]),
      to_u8(tensor[[0, 1, y, x]]),
      to_u8(tensor[[0, 2, y, x]]),
    ])
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unit_tensor_is_rgb_over_255() {
    let image = ImageBuffer::from_fn(2, 1, |x, _| {
      if x == 0 {
        Rgb([255u8, 0, 51])
      } else {
        Rgb([0, 102, 0])
      }
    });
    let t = image_to_tensor(&image, (2, 1), Normalize::Unit);
    assert_eq!(t.shape(), &[1, 3, 1, 2]);
    assert_eq!(t[[0, 0, 0, 0]], 1.0);
    assert!((t[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);
    assert!((t[[0, 1, 0, 1]] - 0.4).abs() < 1e-6);
  }

  #[test]
  fn bgr_mean_tensor_swaps_and_centers() {
    let image = ImageBuffer::from_pixel(3, 2, Rgb([10u8, 20, 30]));
    let t = image_to_tensor(&image, (3, 2), Normalize::BgrMean);
    assert_eq!(t[[0, 0, 1, 2]], 30.0 - 104.0);
    assert_eq!(t[[0, 1, 1, 2]], 20.0 - 117.0);
    assert_eq!(t[[0, 2, 1, 2]], 10.0 - 123.0);
  }

  #[test]
  fn resizes_to_requested_shape() {
    let image = ImageBuffer::from_pixel(7, 5, Rgb([128u8, 128, 128]));
    let t = image_to_tensor(&image, (4, 6), Normalize::Unit);
    assert_eq!(t.shape(), &[1, 3, 6, 4]);
    assert!(t.iter().all(|&v| (v - 128.0 / 255.0).abs() < 1e-3));
  }

  #[test]
  fn pad_keeps_aspect_ratio() {
    let image = ImageBuffer::from_pixel(40, 20, Rgb([200u8, 100, 50]));
    let (padded, region) = pad_to_fit(&image, (16, 16));
    assert_eq!(padded.dimensions(), (16, 16));
    assert_eq!(region, [0, 4, 16, 8]);
    assert_eq!(padded.get_pixel(8, 0), &Rgb([0, 0, 0]));
    assert_eq!(padded.get_pixel(8, 15), &Rgb([0, 0, 0]));
    let inside = padded.get_pixel(8, 8);
    assert!((inside[0] as i32 - 200).abs() <= 1, "{:?}", inside);

    let tall = ImageBuffer::from_pixel(10, 30, Rgb([1u8, 2, 3]));
    assert_eq!(pad_to_fit(&tall, (12, 12)).1, [4, 0, 4, 12]);
  }

  #[test]
  fn tensor_to_image_rounds_and_clamps() {
    let mut t = Array4::<f32>::zeros((1, 3, 1, 2));
    t[[0, 0, 0, 0]] = 1.5;
    t[[0, 1, 0, 0]] = -0.3;
    t[[0, 2, 0, 0]] = 0.5;
    let image = tensor_to_image(t.view()).unwrap();
    assert_eq!(image.dimensions(), (2, 1));
    assert_eq!(image.get_pixel(0, 0), &Rgb([255, 0, 128]));
    assert_eq!(image.get_pixel(1, 0), &Rgb([0, 0, 0]));
  }

  #[test]
  fn tensor_to_image_rejects_bad_shape() {
    let t = Array4::<f32>::zeros((1, 4, 2, 2));
    assert_eq!(
      tensor_to_image(t.view()),
      Err(FrameError::InvalidShape(vec![1, 4, 2, 2]))
    );
  }
}
