// 该文件是 Malaria Detector （疟疾检测） 项目的一部分。
// src/model.rs - 模型
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

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::CellTensor};

/// 输出阈值，由外部提供的模型决定，不可调整。
/// 输出 < 0.5 为 Parasitized（标签 0），输出 >= 0.5 为 Uninfected（标签 1）。
pub const INFECTION_THRESHOLD: f32 = 0.5;

/// 推理引擎
///
/// 加载后由宿主独占持有，`release` 在宿主关闭时恰好调用一次。
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;

  fn release(self)
  where
    Self: Sized,
  {
  }
}

/// 将模型资源加载为推理引擎
pub trait ModelLoader {
  type Model: Model<Input = CellTensor, Output = ModelOutput>;
  type Error: std::error::Error;

  fn load(&self, asset: &ModelAsset) -> Result<Self::Model, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ModelAssetError {
  #[error("模型加载错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("模型文件为空: {0}")]
  Empty(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("URI 路径解码错误: {0}")]
  PathDecode(#[from] std::string::FromUtf8Error),
}

/// 序列化的模型文件，对本组件而言是不透明的字节块
#[derive(Clone)]
pub struct ModelAsset {
  name: String,
  bytes: Vec<u8>,
}

impl std::fmt::Debug for ModelAsset {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ModelAsset")
      .field("name", &self.name)
      .field("len", &self.bytes.len())
      .finish()
  }
}

impl ModelAsset {
  pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ModelAssetError> {
    let name = name.into();
    if bytes.is_empty() {
      return Err(ModelAssetError::Empty(name));
    }
    Ok(ModelAsset { name, bytes })
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelAssetError> {
    let path = path.as_ref();
    info!("加载模型文件: {}", path.display());
    let bytes = std::fs::read(path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      bytes.len() as f64 / (1024.0 * 1024.0)
    );
    Self::from_bytes(path.display().to_string(), bytes)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }
}

impl FromUrlWithScheme for ModelAsset {
  const SCHEME: &'static str = "model";
}

impl FromUrl for ModelAsset {
  type Error = ModelAssetError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelAssetError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案，实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }
    let path = urlencoding::decode(url.path())?;
    Self::from_path(&*path)
  }
}

/// 模型输出张量
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
  pub shape: Vec<usize>,
  pub data: Box<[f32]>,
}

impl ModelOutput {
  pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
    ModelOutput {
      shape,
      data: data.into_boxed_slice(),
    }
  }

  /// 形状为 (1, 1) 的标量输出
  pub fn scalar(value: f32) -> Self {
    Self::new(vec![1, 1], vec![value])
  }

  /// 读取第一个元素
  pub fn first(&self) -> Option<f32> {
    self.data.first().copied()
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn from_label_id(id: u32) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellLabel {
  Parasitized = 0,
  Uninfected = 1,
}

impl CellLabel {
  pub fn from_output(raw: f32) -> Self {
    if raw < INFECTION_THRESHOLD {
      CellLabel::Parasitized
    } else {
      CellLabel::Uninfected
    }
  }

  pub fn id(&self) -> u32 {
    *self as u32
  }

  pub fn name(&self) -> &'static str {
    match self {
      CellLabel::Parasitized => "Parasitized",
      CellLabel::Uninfected => "Uninfected",
    }
  }

  pub fn is_infected(&self) -> bool {
    matches!(self, CellLabel::Parasitized)
  }

  pub fn verdict(&self) -> &'static str {
    if self.is_infected() { "INFECTED" } else { "HEALTHY" }
  }
}

impl WithLabel for CellLabel {
  fn to_label_str(&self) -> String {
    format!("{} (Label {})", self.name(), self.id())
  }

  fn from_label_id(id: u32) -> Option<Self> {
    match id {
      0 => Some(CellLabel::Parasitized),
      1 => Some(CellLabel::Uninfected),
      _ => None,
    }
  }
}

/// 一次分类的结果：连续概率与二值标签
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
  pub probability: f32,
  pub label: CellLabel,
}

impl Classification {
  pub fn from_output(raw: f32) -> Self {
    Classification {
      probability: raw,
      label: CellLabel::from_output(raw),
    }
  }

  pub fn is_infected(&self) -> bool {
    self.label.is_infected()
  }
}

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxLoader, OnnxModel, OnnxModelError};
