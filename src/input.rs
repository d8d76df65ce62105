// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 视频/图像输入
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

use std::path::Path;

use image::RgbImage;
use thiserror::Error;
use tracing::error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, path_url};

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

mod image_sequence;
pub use self::image_sequence::{ImageSequenceInput, ImageSequenceInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("Image sequence input error: {0}")]
  ImageSequenceInputError(#[from] ImageSequenceInputError),
  #[error("Camera capture is not supported, use an image file or a frame directory: {0}")]
  CameraUnsupported(String),
  #[error("Invalid input path '{0}': {1}")]
  InvalidPath(String, std::io::Error),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

/// 将命令行参数转换为输入 URL
///
/// 已带方案的 URL 原样返回；目录映射为 `folder://`，其余路径映射为 `image://`。
/// 纯数字参数表示摄像头编号，不受支持。
pub fn source_url(source: &str) -> Result<Url, InputError> {
  if source.contains("://") {
    return Url::parse(source)
      .map_err(|e| InputError::InvalidPath(source.to_string(), std::io::Error::other(e)));
  }
  if !source.is_empty() && source.chars().all(|c| c.is_ascii_digit()) {
    error!("不支持摄像头输入: {}", source);
    return Err(InputError::CameraUnsupported(source.to_string()));
  }

  let path = Path::new(source);
  let scheme = if path.is_dir() {
    ImageSequenceInput::SCHEME
  } else {
    ImageFileInput::SCHEME
  };
  path_url(scheme, path).map_err(|e| InputError::InvalidPath(source.to_string(), e))
}

/// 读取 `image://` URL 指向的单张图像
pub fn load_image(url: &Url) -> Result<RgbImage, InputError> {
  Ok(ImageFileInput::read(url)?)
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
  ImageSequence(ImageSequenceInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME => {
        let input = ImageFileInput::from_url(url)?;
        Ok(InputWrapper::ReadImageFile(input))
      }
      ImageSequenceInput::SCHEME => {
        let input = ImageSequenceInput::from_url(url)?;
        Ok(InputWrapper::ImageSequence(input))
      }
      _ => Err(InputError::SchemeMismatch),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next(),
      InputWrapper::ImageSequence(input) => input.next(),
    }
  }
}
