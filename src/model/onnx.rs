// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 推理引擎
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

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::{Array4, ArrayD};
use ort::session::{Session, SessionInputValue};
use ort::value::Tensor;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::model::Predictor;

#[derive(Error, Debug)]
pub enum OnnxPredictorError {
  #[error("模型文件不存在: {0}")]
  ModelNotFound(PathBuf),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("推理会话锁已损坏")]
  Poisoned,
}

/// 基于 ONNX Runtime 会话的推理引擎
///
/// `Session::run` 需要可变借用，因此会话放在 `Mutex` 中。
pub struct OnnxPredictor {
  session: Mutex<Session>,
  outputs: Vec<String>,
}

impl OnnxPredictor {
  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OnnxPredictorError> {
    let path = path.as_ref();
    if !path.is_file() {
      error!("模型文件不存在: {}", path.display());
      return Err(OnnxPredictorError::ModelNotFound(path.to_path_buf()));
    }

    info!("加载模型文件: {}", path.display());
    let session = Session::builder()?.commit_from_file(path)?;
    let outputs: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
    debug!("模型输入数量: {}", session.inputs.len());
    debug!("模型输出: {:?}", outputs);
    info!("模型加载完成");

    Ok(Self {
      session: Mutex::new(session),
      outputs,
    })
  }
}

impl Predictor for OnnxPredictor {
  type Error = OnnxPredictorError;

  fn predict(&self, input: &Array4<f32>) -> Result<Vec<ArrayD<f32>>, Self::Error> {
    let value = Tensor::from_array(input.clone())?.into_dyn();
    let inputs = [SessionInputValue::from(value)];

    let mut session = self
      .session
      .lock()
      .map_err(|_| OnnxPredictorError::Poisoned)?;
    let outputs = session.run(&inputs[..])?;

    let mut tensors = Vec::with_capacity(self.outputs.len());
    for name in self.outputs.iter() {
      let tensor = outputs[name.as_str()].try_extract_array::<f32>()?;
      tensors.push(tensor.to_owned());
    }
    Ok(tensors)
  }
}
