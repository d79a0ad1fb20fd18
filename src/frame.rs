// 该文件是 Malaria Detector （疟疾检测） 项目的一部分。
// src/frame.rs - 细胞图像与 NHWC 张量定义
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

use thiserror::Error;

const RGB_CHANNELS: usize = 3;

/// 模型期望的输入宽度
pub const MODEL_INPUT_WIDTH: u32 = 128;
/// 模型期望的输入高度
pub const MODEL_INPUT_HEIGHT: u32 = 128;

/// 细胞图像：RGB 浮点像素，与纹理颜色回读一致，通道取值为 [0,1]
pub type CellImage = image::Rgb32FImage;

/// 模型输入张量，形状 (1, 128, 128, 3)
pub type CellTensor = NhwcTensor<MODEL_INPUT_WIDTH, MODEL_INPUT_HEIGHT>;

#[derive(Error, Debug, PartialEq)]
pub enum TensorShapeError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 批大小为 1 的稠密 f32 张量，布局 NHWC：行 = y，列 = x，通道顺序 R,G,B
#[derive(Debug, Clone, PartialEq)]
pub struct NhwcTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> NhwcTensor<W, H> {
  pub const LEN: usize = RGB_CHANNELS * W as usize * H as usize;

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// (batch, height, width, channels)
  pub fn shape(&self) -> [usize; 4] {
    [1, H as usize, W as usize, RGB_CHANNELS]
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  fn index(y: usize, x: usize, c: usize) -> usize {
    (y * W as usize + x) * RGB_CHANNELS + c
  }

  pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f32> {
    if y >= H as usize || x >= W as usize || c >= RGB_CHANNELS {
      return None;
    }
    Some(self.data[Self::index(y, x, c)])
  }

  pub fn set(&mut self, y: usize, x: usize, c: usize, value: f32) {
    let index = Self::index(y, x, c);
    self.data[index] = value;
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn into_vec(self) -> Vec<f32> {
    self.data.into_vec()
  }
}

impl<const W: u32, const H: u32> Default for NhwcTensor<W, H> {
  fn default() -> Self {
    Self {
      data: vec![0.0f32; Self::LEN].into_boxed_slice(),
    }
  }
}

impl<const W: u32, const H: u32> TryFrom<Vec<f32>> for NhwcTensor<W, H> {
  type Error = TensorShapeError;

  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    if data.len() != Self::LEN {
      return Err(TensorShapeError::LengthMismatch {
        expected: Self::LEN,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> AsMut<[f32]> for NhwcTensor<W, H> {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}
