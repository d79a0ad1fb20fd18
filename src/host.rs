// 该文件是 Malaria Detector （疟疾检测） 项目的一部分。
// src/host.rs - 模型宿主：加载、持有并释放推理引擎
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

use tracing::{error, info, warn};

use crate::model::{Model, ModelAsset, ModelLoader};

/// 模型宿主
///
/// 引擎在 `initialize` 时写入一次，之后只读，`shutdown` 时释放。
/// 未初始化或已释放时 `engine_mut` 返回 `None`。
pub struct ModelHost<M: Model> {
  engine: Option<M>,
}

impl<M: Model> Default for ModelHost<M> {
  fn default() -> Self {
    Self { engine: None }
  }
}

impl<M: Model> ModelHost<M> {
  pub fn new() -> Self {
    Self::default()
  }

  /// 加载模型资源并创建推理引擎。
  ///
  /// 资源缺失或加载失败时记录错误并保持引擎未设置，返回 `false`。
  pub fn initialize<L>(&mut self, loader: &L, asset: Option<&ModelAsset>) -> bool
  where
    L: ModelLoader<Model = M>,
  {
    if self.engine.is_some() {
      warn!("推理引擎已初始化，忽略重复加载");
      return true;
    }

    let Some(asset) = asset else {
      error!("未指定模型文件，请先提供模型资源");
      return false;
    };

    match loader.load(asset) {
      Ok(engine) => {
        self.engine = Some(engine);
        info!("疟疾检测器初始化完成: {}", asset.name());
        true
      }
      Err(e) => {
        error!("模型加载失败 {}: {}", asset.name(), e);
        false
      }
    }
  }

  pub fn is_ready(&self) -> bool {
    self.engine.is_some()
  }

  pub fn engine_mut(&mut self) -> Option<&mut M> {
    self.engine.as_mut()
  }

  /// 释放推理引擎；未初始化时什么也不做。
  pub fn shutdown(&mut self) {
    if let Some(engine) = self.engine.take() {
      engine.release();
      info!("推理引擎已释放");
    }
  }
}

impl<M: Model> Drop for ModelHost<M> {
  fn drop(&mut self) {
    self.shutdown();
  }
}
