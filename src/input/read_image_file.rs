// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, url_path};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 单张图像，作为只有一帧的输入
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl ImageFileInput {
  /// 读取并解码为 RGB 图像（带透明通道的图像会丢弃 alpha）
  pub fn read(url: &Url) -> Result<RgbImage, ImageFileInputError> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url_path(url);
    info!("读取图像文件: {}", path.display());
    let image = ImageReader::open(&path)?.with_guessed_format()?.decode()?;
    Ok(image.to_rgb8())
  }
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Ok(ImageFileInput {
      image: Some(Self::read(url)?),
    })
  }
}

impl Iterator for ImageFileInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take().map(|image| Frame::new(image, 0))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::path_url;
  use image::{ImageBuffer, Rgb};

  #[test]
  fn yields_exactly_one_frame() {
    let dir = std::env::temp_dir().join("shanan-post-read-image-file");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("single.png");
    ImageBuffer::from_pixel(6, 4, Rgb([1u8, 2, 3]))
      .save(&path)
      .unwrap();

    let url = path_url("image", &path).unwrap();
    let mut input = ImageFileInput::from_url(&url).unwrap();
    let frame = input.next().unwrap();
    assert_eq!(frame.image.dimensions(), (6, 4));
    assert_eq!(frame.image.get_pixel(5, 3), &Rgb([1, 2, 3]));
    assert!(input.next().is_none());
  }

  #[test]
  fn missing_file_is_an_io_error() {
    let url = Url::parse("image:///definitely/not/here.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::IoError(_))
    ));
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("folder:///tmp").unwrap();
    assert!(matches!(
      ImageFileInput::read(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
