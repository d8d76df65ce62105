// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化与记录
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use serde_json::json;
use tracing::{debug, info};

use crate::model::{COCO_CATEGORY, DetectItem, DetectResult, WithLabel};

// 文本渲染常量
const LABEL_MIN_FONT_SIZE: f32 = 12.0;
const LABEL_CHAR_WIDTH_RATIO: f32 = 0.55; // 每字符平均宽度 / 字号（粗略估计）
const LABEL_OFFSET: i32 = 7;

/// 按类别索引生成颜色，类别数开立方向上取整作为每个通道的级数
///
/// 三个级数依次落在蓝、绿、红通道。
fn class_color(index: u32, num_classes: usize) -> Rgb<u8> {
  let base = (num_classes as f32).cbrt().ceil().max(1.0);
  let base2 = base * base;
  let index = index as f32;
  let level = |v: f32| ((2.0 - v) * 127.0).clamp(0.0, 255.0) as u8;
  let blue = level(index / base2);
  let green = level((index % base2) / base);
  let red = level((index % base2) % base);
  Rgb([red, green, blue])
}

/// 检测框绘制器
pub struct Draw {
  font: Option<FontArc>,
  palette: Vec<Rgb<u8>>,
}

impl Default for Draw {
  fn default() -> Self {
    Self::new(None)
  }
}

impl Draw {
  pub fn new(font: Option<FontArc>) -> Self {
    let num_classes = COCO_CATEGORY.len();
    let palette = (0..num_classes as u32)
      .map(|i| class_color(i, num_classes))
      .collect();
    Self { font, palette }
  }

  /// 从字体文件加载标签字体
  pub fn with_font_file<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
    let data = std::fs::read(path.as_ref())?;
    let font = FontArc::try_from_vec(data)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    info!("加载标签字体: {}", path.as_ref().display());
    Ok(Self::new(Some(font)))
  }

  fn color(&self, id: u32) -> Rgb<u8> {
    self.palette[id as usize % self.palette.len()]
  }

  fn draw_item<T: WithLabel>(&self, image: &mut RgbImage, item: &DetectItem<T>) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let thickness = ((w + h) / 300).max(1);
    let color = self.color(item.kind.to_label_id());

    let x_min = (item.bbox[0] as i32).clamp(0, w - 1);
    let y_min = (item.bbox[1] as i32).clamp(0, h - 1);
    let x_max = (item.bbox[2] as i32).clamp(0, w - 1);
    let y_max = (item.bbox[3] as i32).clamp(0, h - 1);
    if x_min >= x_max || y_min >= y_max {
      debug!("跳过退化检测框: {:?}", item.bbox);
      return;
    }

    for t in 0..thickness {
      let (width, height) = (x_max - x_min - 2 * t, y_max - y_min - 2 * t);
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32 + 1, height as u32 + 1);
      draw_hollow_rect_mut(image, rect, color);
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = format!("{}: {:.3}", item.kind.to_label_str(), item.score);
    let font_size = (h as f32 * 0.03).max(LABEL_MIN_FONT_SIZE);
    let text_height = font_size.ceil() as i32;
    let text_width = (label.chars().count() as f32 * font_size * LABEL_CHAR_WIDTH_RATIO) as i32;

    // 标签放在检测框上方，空间不足时放在框内
    let label_x = x_min;
    let label_y = (y_min - text_height - LABEL_OFFSET).max(0);
    let label_width = text_width.min(w - label_x);
    if label_width > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width as u32, text_height as u32);
      draw_filled_rect_mut(image, rect, color);
      draw_text_mut(
        image,
        Rgb([255u8, 255u8, 255u8]),
        label_x,
        label_y,
        PxScale::from(font_size),
        font,
        &label,
      );
    }
  }

  pub fn draw_detections<T: WithLabel>(&self, image: &mut RgbImage, result: &DetectResult<T>) {
    for item in result.items.iter() {
      self.draw_item(image, item);
    }
  }

  pub fn draw_detection<T: WithLabel>(
    &self,
    image: &RgbImage,
    result: &DetectResult<T>,
  ) -> RgbImage {
    let mut image = image.clone();
    self.draw_detections(&mut image, result);
    image
  }
}

/// 检测结果记录格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
  /// 每行 `名称, 分数, x1, y1, x2, y2`
  Name,
  /// 每行 `类别ID, 分数, x1, y1, x2, y2`
  Id,
  /// JSON 数组
  Json,
}

pub struct Record {
  pub format: RecordFormat,
}

impl Record {
  /// 记录写到与图像同名、扩展名为 txt 或 json 的文件
  pub fn record<T: WithLabel>(
    &self,
    result: &DetectResult<T>,
    path: &Path,
  ) -> Result<(), std::io::Error> {
    match self.format {
      RecordFormat::Json => {
        let items: Vec<serde_json::Value> = result
          .items
          .iter()
          .map(|item| {
            json!({
              "label": item.kind.to_label_str(),
              "id": item.kind.to_label_id(),
              "score": item.score,
              "bbox": item.bbox,
            })
          })
          .collect();
        let text = serde_json::to_string_pretty(&items).map_err(std::io::Error::other)?;
        std::fs::write(path.with_extension("json"), text)
      }
      RecordFormat::Name | RecordFormat::Id => {
        let mut records = Vec::new();
        for item in result.items.iter() {
          let name = if self.format == RecordFormat::Name {
            item.kind.to_label_str()
          } else {
            format!("{}", item.kind.to_label_id())
          };
          records.push(format!(
            "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
            name, item.score, item.bbox[0], item.bbox[1], item.bbox[2], item.bbox[3]
          ));
        }
        std::fs::write(path.with_extension("txt"), records.join("\n"))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::CocoLabel;
  use image::ImageBuffer;

  fn result(bbox: [f32; 4]) -> DetectResult<CocoLabel> {
    DetectResult {
      items: vec![DetectItem {
        kind: CocoLabel::from_label_id(3),
        score: 0.75,
        bbox,
      }]
      .into_boxed_slice(),
    }
  }

  #[test]
  fn palette_follows_cube_root_levels() {
    // 81 类 → 每通道 5 级
    assert_eq!(class_color(0, 81), Rgb([254, 254, 254]));
    assert_eq!(class_color(1, 81), Rgb([127, 228, 248]));
    assert_eq!(class_color(5, 81), Rgb([254, 127, 228]));
    // 超出范围的级数截断为 0
    assert_eq!(class_color(4, 81), Rgb([0, 152, 233]));
  }

  #[test]
  fn draws_box_outline() {
    let image = ImageBuffer::from_pixel(100, 80, Rgb([0u8, 0, 0]));
    let draw = Draw::default();
    let out = draw.draw_detection(&image, &result([10.0, 10.0, 50.0, 40.0]));
    let color = draw.color(3);
    assert_eq!(out.get_pixel(10, 10), &color);
    assert_eq!(out.get_pixel(50, 40), &color);
    assert_eq!(out.get_pixel(30, 25), &Rgb([0, 0, 0]));
    assert_eq!(image.get_pixel(10, 10), &Rgb([0, 0, 0]));
  }

  #[test]
  fn boxes_are_clamped_to_image() {
    let image = ImageBuffer::from_pixel(20, 20, Rgb([0u8, 0, 0]));
    let draw = Draw::default();
    let out = draw.draw_detection(&image, &result([-5.0, -5.0, 100.0, 100.0]));
    assert_eq!(out.get_pixel(0, 0), &draw.color(3));
    assert_eq!(out.get_pixel(19, 19), &draw.color(3));

    // 完全在图像外的框不绘制
    let out = draw.draw_detection(&image, &result([30.0, 30.0, 40.0, 40.0]));
    assert_eq!(out, image);
  }

  #[test]
  fn records_text_and_json() {
    let dir = std::env::temp_dir().join("shanan-post-record");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("000001.png");
    let r = result([1.0, 2.0, 3.0, 4.0]);

    Record {
      format: RecordFormat::Name,
    }
    .record(&r, &path)
    .unwrap();
    let text = std::fs::read_to_string(dir.join("000001.txt")).unwrap();
    assert_eq!(text, "car, 0.7500, 1.0000, 2.0000, 3.0000, 4.0000");

    Record {
      format: RecordFormat::Json,
    }
    .record(&r, &path)
    .unwrap();
    let text = std::fs::read_to_string(dir.join("000001.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value[0]["label"], "car");
    assert_eq!(value[0]["id"], 3);
  }
}
