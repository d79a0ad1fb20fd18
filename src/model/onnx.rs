// 该文件是 Malaria Detector （疟疾检测） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 推理后端
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

use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::CellTensor,
  model::{Model, ModelAsset, ModelLoader, ModelOutput},
};

const ONNX_NUM_INPUTS: usize = 1;
const ONNX_NUM_OUTPUTS: usize = 1;

#[derive(Error, Debug)]
pub enum OnnxModelError {
  #[error("会话创建错误: {0}")]
  Session(String),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("张量错误: {0}")]
  Tensor(String),
  #[error("推理错误: {0}")]
  Inference(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxLoader;

impl ModelLoader for OnnxLoader {
  type Model = OnnxModel;
  type Error = OnnxModelError;

  fn load(&self, asset: &ModelAsset) -> Result<OnnxModel, OnnxModelError> {
    info!("创建 ONNX 推理会话: {}", asset.name());
    let session = Session::builder()
      .map_err(|e| OnnxModelError::Session(e.to_string()))?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(|e| OnnxModelError::Session(e.to_string()))?
      .commit_from_memory(asset.bytes())
      .map_err(|e| OnnxModelError::Session(e.to_string()))?;

    let num_inputs = session.inputs.len();
    let num_outputs = session.outputs.len();
    debug!("模型输入数量: {}", num_inputs);
    debug!("模型输出数量: {}", num_outputs);

    if num_inputs != ONNX_NUM_INPUTS || num_outputs != ONNX_NUM_OUTPUTS {
      return Err(OnnxModelError::ModelInvalid(format!(
        "预期 {} 个输入 {} 个输出, 实际为 {} 个输入 {} 个输出",
        ONNX_NUM_INPUTS, ONNX_NUM_OUTPUTS, num_inputs, num_outputs
      )));
    }

    let output_name = session.outputs[0].name.clone();
    info!("模型加载完成");

    Ok(OnnxModel {
      session,
      output_name,
    })
  }
}

pub struct OnnxModel {
  session: Session,
  output_name: String,
}

impl Model for OnnxModel {
  type Input = CellTensor;
  type Output = ModelOutput;
  type Error = OnnxModelError;

  fn infer(&mut self, input: &CellTensor) -> Result<ModelOutput, OnnxModelError> {
    let [n, h, w, c] = input.shape();
    let array = Array4::<f32>::from_shape_vec((n, h, w, c), input.as_slice().to_vec())
      .map_err(|e| OnnxModelError::Tensor(e.to_string()))?;
    let input_tensor =
      Value::from_array(array).map_err(|e| OnnxModelError::Tensor(e.to_string()))?;

    debug!("执行模型推理");
    let outputs = self
      .session
      .run(ort::inputs![input_tensor])
      .map_err(|e| OnnxModelError::Inference(e.to_string()))?;

    let output = outputs
      .get(self.output_name.as_str())
      .ok_or_else(|| OnnxModelError::Inference(format!("缺少输出 {}", self.output_name)))?;
    let (shape, data) = output
      .try_extract_tensor::<f32>()
      .map_err(|e| OnnxModelError::Tensor(e.to_string()))?;

    let shape = shape.iter().map(|&d| d.max(0) as usize).collect();
    Ok(ModelOutput::new(shape, data.to_vec()))
  }

  fn release(self) {
    info!("释放 ONNX 推理会话");
  }
}
