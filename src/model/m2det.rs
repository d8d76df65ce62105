// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/m2det.rs - M2Det 多类别目标检测
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

use std::marker::PhantomData;

use ndarray::{Array2, ArrayD, Axis, Ix2};
use tracing::debug;

use crate::{
  frame::{Frame, Normalize, image_to_tensor},
  model::{DetectResult, Model, ModelError, Predictor, WithLabel},
  postprocess::{AssembleParams, RawDetectionSet, Size, assemble},
};

const M2DET_NUM_OUTPUTS: usize = 2;

pub struct M2Det<P, T> {
  detector: P,
  params: AssembleParams,
  size: u32,
  _phantom: PhantomData<T>,
}

impl<P: Predictor, T: WithLabel> M2Det<P, T> {
  pub fn new(detector: P, params: AssembleParams, size: u32) -> Self {
    Self {
      detector,
      params,
      size,
      _phantom: PhantomData,
    }
  }
}

/// 去掉大小为 1 的 batch 维，得到二维矩阵
fn to_matrix(index: usize, output: ArrayD<f32>) -> Result<Array2<f32>, ModelError> {
  let shape = output.shape().to_vec();
  let output = if shape.len() == 3 && shape[0] == 1 {
    output.index_axis_move(Axis(0), 0)
  } else {
    output
  };
  output
    .into_dimensionality::<Ix2>()
    .map_err(|_| ModelError::OutputShape { index, shape })
}

impl<P: Predictor, T: WithLabel> Model for M2Det<P, T> {
  type Input = Frame;
  type Output = DetectResult<T>;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let tensor = image_to_tensor(&input.image, (self.size, self.size), Normalize::BgrMean);

    debug!("执行检测模型推理");
    let outputs = self
      .detector
      .predict(&tensor)
      .map_err(ModelError::predictor)?;
    let actual = outputs.len();
    let mut outputs = outputs.into_iter();
    let (Some(boxes), Some(scores)) = (outputs.next(), outputs.next()) else {
      return Err(ModelError::MissingOutput {
        expected: M2DET_NUM_OUTPUTS,
        actual,
      });
    };
    let boxes = to_matrix(0, boxes)?;
    let scores = to_matrix(1, scores)?;
    debug!("候选框 {:?}, 分数矩阵 {:?}", boxes.shape(), scores.shape());

    let raw = RawDetectionSet {
      boxes: boxes.view(),
      scores: scores.view(),
    };
    // M2Det 输出归一化坐标
    let original = Size::from(input.image.dimensions());
    let result = assemble(&raw, &self.params, original, Size::UNIT)?;
    debug!("检测到 {} 个物体", result.len());

    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::CocoLabel;
  use image::{ImageBuffer, Rgb};
  use ndarray::{Array3, Array4, array};
  use std::convert::Infallible;

  struct Fixed(Vec<ArrayD<f32>>);

  impl Predictor for Fixed {
    type Error = Infallible;

    fn predict(&self, input: &Array4<f32>) -> Result<Vec<ArrayD<f32>>, Self::Error> {
      assert_eq!(input.shape(), &[1, 3, 16, 16]);
      Ok(self.0.clone())
    }
  }

  fn params() -> AssembleParams {
    AssembleParams {
      num_classes: 2,
      score_threshold: 0.4,
      overlap_threshold: 0.45,
      max_keep_per_class: 10,
    }
  }

  #[test]
  fn emits_pixel_coordinates() {
    let boxes: Array3<f32> = array![[[0.1, 0.2, 0.5, 0.6], [0.6, 0.6, 0.9, 0.9]]];
    let scores: Array3<f32> = array![[[0.1, 0.0, 0.8], [0.9, 0.1, 0.2]]];
    let model: M2Det<_, CocoLabel> = M2Det::new(
      Fixed(vec![boxes.into_dyn(), scores.into_dyn()]),
      params(),
      16,
    );
    let frame = Frame::new(ImageBuffer::from_pixel(200, 100, Rgb([0u8, 0, 0])), 0);
    let result = model.infer(&frame).unwrap();

    assert_eq!(result.len(), 1);
    let item = &result.items[0];
    assert_eq!(item.kind.to_label_id(), 2);
    let expected = [20.0, 20.0, 100.0, 60.0];
    for (got, want) in item.bbox.iter().zip(expected) {
      assert!((got - want).abs() < 1e-4, "{:?}", item.bbox);
    }
  }

  #[test]
  fn missing_scores_output_is_an_error() {
    let boxes: Array3<f32> = Array3::zeros((1, 3, 4));
    let model: M2Det<_, CocoLabel> = M2Det::new(Fixed(vec![boxes.into_dyn()]), params(), 16);
    let frame = Frame::new(ImageBuffer::from_pixel(16, 16, Rgb([0u8, 0, 0])), 0);
    assert!(matches!(
      model.infer(&frame),
      Err(ModelError::MissingOutput {
        expected: 2,
        actual: 1
      })
    ));
  }

  #[test]
  fn batched_output_must_have_batch_one() {
    let boxes: Array3<f32> = Array3::zeros((2, 3, 4));
    let scores: Array3<f32> = Array3::zeros((2, 3, 3));
    let model: M2Det<_, CocoLabel> = M2Det::new(
      Fixed(vec![boxes.into_dyn(), scores.into_dyn()]),
      params(),
      16,
    );
    let frame = Frame::new(ImageBuffer::from_pixel(16, 16, Rgb([0u8, 0, 0])), 0);
    assert!(matches!(
      model.infer(&frame),
      Err(ModelError::OutputShape { index: 0, .. })
    ));
  }
}
