// 该文件是 Malaria Detector （疟疾检测） 项目的一部分。
// src/preprocess.rs - 输入预处理：缩放与张量构造
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

use image::imageops::{self, FilterType};
use thiserror::Error;
use tracing::debug;

use crate::frame::{CellImage, CellTensor, MODEL_INPUT_HEIGHT, MODEL_INPUT_WIDTH};

/// 张量构造后每个元素再除以的系数。
/// `CellImage` 的通道已位于 [0,1]，这里仍然按模型导出时的流程除以 255，
/// 修改前需要先确认模型训练时使用的像素取值范围。
pub const PIXEL_SCALE: f32 = 255.0;

/// 张量行 0 对应图像最底部一行（纹理像素从左下角开始排列），
/// 即张量行 `y` 取自图像行 `MODEL_INPUT_HEIGHT - 1 - y`，列方向不变。
pub fn source_row(tensor_row: u32) -> u32 {
  MODEL_INPUT_HEIGHT - 1 - tensor_row
}

#[derive(Error, Debug, PartialEq)]
pub enum PreprocessError {
  #[error("图像尺寸错误: 期望 {expected:?}, 实际 {actual:?}")]
  DimensionMismatch {
    expected: (u32, u32),
    actual: (u32, u32),
  },
}

pub fn needs_resize(image: &CellImage) -> bool {
  image.dimensions() != (MODEL_INPUT_WIDTH, MODEL_INPUT_HEIGHT)
}

/// 将图像调整为模型输入尺寸。
///
/// 尺寸已经匹配时直接借用原图；否则双线性缩放得到新的副本，原图不会被修改。
///
/// 放大时与 2x2 双线性采样一致；缩小时 `FilterType::Triangle` 会按缩放比例扩大采样范围，
/// 效果接近区域平均，与纹理 Blit 的 2x2 采样略有差异。
pub fn fit_to_input(image: &CellImage) -> Cow<'_, CellImage> {
  if !needs_resize(image) {
    return Cow::Borrowed(image);
  }

  let (width, height) = image.dimensions();
  debug!(
    "缩放图像 {}x{} -> {}x{}",
    width, height, MODEL_INPUT_WIDTH, MODEL_INPUT_HEIGHT
  );
  Cow::Owned(imageops::resize(
    image,
    MODEL_INPUT_WIDTH,
    MODEL_INPUT_HEIGHT,
    FilterType::Triangle,
  ))
}

/// 构造 (1, 128, 128, 3) 输入张量：行序见 `source_row`，先按 R,G,B 写入通道值，
/// 再整体除以 `PIXEL_SCALE`。
pub fn build_input_tensor(image: &CellImage) -> Result<CellTensor, PreprocessError> {
  if needs_resize(image) {
    return Err(PreprocessError::DimensionMismatch {
      expected: (MODEL_INPUT_WIDTH, MODEL_INPUT_HEIGHT),
      actual: image.dimensions(),
    });
  }

  let mut tensor = CellTensor::default();
  for y in 0..MODEL_INPUT_HEIGHT {
    for x in 0..MODEL_INPUT_WIDTH {
      let pixel = image.get_pixel(x, source_row(y));
      for c in 0..tensor.channels() {
        tensor.set(y as usize, x as usize, c, pixel[c]);
      }
    }
  }

  for value in tensor.as_mut() {
    *value /= PIXEL_SCALE;
  }

  Ok(tensor)
}
