// 该文件是 Malaria Detector （疟疾检测） 项目的一部分。
// src/detector.rs - 疟疾细胞图像分类器
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

use std::borrow::Cow;

use tracing::{debug, error, info, warn};

use crate::{
  frame::{CellImage, CellTensor},
  host::ModelHost,
  model::{Classification, Model, ModelAsset, ModelLoader, ModelOutput, WithLabel},
  preprocess::{build_input_tensor, fit_to_input},
};

/// 疟疾检测组件
///
/// 持有一个推理引擎，对单张血细胞图像做一次前向推理并按固定阈值给出结论。
/// 所有失败路径只记录日志，`is_infected` 与 `infection_probability` 保持原值。
pub struct MalariaDetector<M>
where
  M: Model<Input = CellTensor, Output = ModelOutput>,
{
  host: ModelHost<M>,
  /// 测试按钮使用的图像
  pub input_image: Option<CellImage>,
  is_infected: bool,
  infection_probability: f32,
  last_result: Option<Classification>,
  resize_count: u64,
  classification_count: u64,
}

impl<M> Default for MalariaDetector<M>
where
  M: Model<Input = CellTensor, Output = ModelOutput>,
{
  fn default() -> Self {
    MalariaDetector {
      host: ModelHost::new(),
      input_image: None,
      is_infected: false,
      infection_probability: 0.0,
      last_result: None,
      resize_count: 0,
      classification_count: 0,
    }
  }
}

impl<M> MalariaDetector<M>
where
  M: Model<Input = CellTensor, Output = ModelOutput>,
  M::Error: std::fmt::Display,
{
  pub fn new() -> Self {
    Self::default()
  }

  /// 加载模型；资源缺失时记录错误，之后的分类调用均为空操作。
  pub fn initialize<L>(&mut self, loader: &L, asset: Option<&ModelAsset>) -> bool
  where
    L: ModelLoader<Model = M>,
  {
    self.host.initialize(loader, asset)
  }

  pub fn is_ready(&self) -> bool {
    self.host.is_ready()
  }

  pub fn is_infected(&self) -> bool {
    self.is_infected
  }

  pub fn infection_probability(&self) -> f32 {
    self.infection_probability
  }

  pub fn last_result(&self) -> Option<Classification> {
    self.last_result
  }

  pub fn resize_count(&self) -> u64 {
    self.resize_count
  }

  pub fn classification_count(&self) -> u64 {
    self.classification_count
  }

  /// 分析一张血细胞图像。
  ///
  /// 图像为空或引擎未初始化时只记录警告并返回 `None`。
  pub fn analyze_cell_image(&mut self, image: Option<&CellImage>) -> Option<Classification> {
    let (Some(image), Some(engine)) = (image, self.host.engine_mut()) else {
      warn!("图像或推理引擎为空");
      return None;
    };

    let resized = fit_to_input(image);
    if let Cow::Owned(_) = resized {
      self.resize_count += 1;
    }

    let input = match build_input_tensor(&resized) {
      Ok(input) => input,
      Err(e) => {
        error!("构造输入张量失败: {}", e);
        return None;
      }
    };
    drop(resized);

    let output = match engine.infer(&input) {
      Ok(output) => output,
      Err(e) => {
        error!("模型推理失败: {}", e);
        return None;
      }
    };
    drop(input);
    debug!("模型输出形状: {:?}", output.shape);

    let Some(raw) = output.first() else {
      error!("模型输出为空");
      return None;
    };

    let result = Classification::from_output(raw);
    self.infection_probability = result.probability;
    self.is_infected = result.is_infected();
    self.last_result = Some(result);
    self.classification_count += 1;

    info!("原始输出 (Raw Output): {:.4}", raw);
    info!("预测类别 (Predicted Class): {}", result.label.to_label_str());
    info!(
      "结果: {} | 置信度 (Confidence): {:.4}",
      result.label.verdict(),
      raw
    );

    Some(result)
  }

  /// 对 `input_image` 执行分类
  pub fn on_test_button_click(&mut self) -> Option<Classification> {
    match self.input_image.take() {
      Some(image) => {
        let result = self.analyze_cell_image(Some(&image));
        self.input_image = Some(image);
        result
      }
      None => {
        warn!("未指定输入图像");
        None
      }
    }
  }

  pub fn shutdown(&mut self) {
    self.host.shutdown();
  }
}

impl<M> Drop for MalariaDetector<M>
where
  M: Model<Input = CellTensor, Output = ModelOutput>,
{
  fn drop(&mut self) {
    self.host.shutdown();
  }
}
