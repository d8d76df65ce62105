// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/image_sequence.rs - 图像序列目录输入
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

use std::collections::VecDeque;
use std::path::PathBuf;

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, has_image_extension, url_path};

#[derive(Error, Debug)]
pub enum ImageSequenceInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("目录中没有图像文件: {0}")]
  Empty(PathBuf),
}

/// 目录中的图像按文件名排序后逐帧回放，作为视频输入
pub struct ImageSequenceInput {
  files: VecDeque<PathBuf>,
  index: u64,
}

impl FromUrlWithScheme for ImageSequenceInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ImageSequenceInput {
  type Error = ImageSequenceInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ImageSequenceInputError::SchemeMismatch);
    }

    let directory = url_path(url);
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&directory)? {
      let path = entry?.path();
      if path.is_file() && has_image_extension(&path) {
        files.push(path);
      }
    }
    if files.is_empty() {
      error!("目录中没有图像文件: {}", directory.display());
      return Err(ImageSequenceInputError::Empty(directory));
    }
    files.sort();
    info!("图像序列 {} 共 {} 帧", directory.display(), files.len());

    Ok(ImageSequenceInput {
      files: files.into(),
      index: 0,
    })
  }
}

impl ImageSequenceInput {
  pub fn remaining(&self) -> usize {
    self.files.len()
  }
}

impl Iterator for ImageSequenceInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(path) = self.files.pop_front() {
      let decoded = ImageReader::open(&path)
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode());
      match decoded {
        Ok(image) => {
          let frame = Frame::new(image.to_rgb8(), self.index);
          debug!("读取第 {} 帧: {}", self.index, path.display());
          self.index += 1;
          return Some(frame);
        }
        Err(e) => warn!("跳过无法解码的帧 {}: {}", path.display(), e),
      }
    }
    None
  }
}
