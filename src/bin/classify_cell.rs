// 该文件是 Malaria Detector （疟疾检测） 项目的一部分。
// src/bin/classify_cell.rs - 单张血细胞图像分类
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

use anyhow::{Result, bail};
use clap::Parser;
use tracing::info;
use url::Url;

use malaria_detector::{
  FromUrl, MalariaDetector, ModelAsset, input::ImageFileInput, model::OnnxLoader,
};

/// 疟疾检测参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径，例如 model:///path/to/cells.onnx
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像，例如 image:///path/to/cell.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 以 JSON 格式输出结果
  #[arg(long)]
  pub json: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);

  let asset = ModelAsset::from_url(&args.model)?;
  let image = ImageFileInput::from_url(&args.input)?.into_image();

  let mut detector = MalariaDetector::new();
  if !detector.initialize(&OnnxLoader, Some(&asset)) {
    bail!("模型初始化失败: {}", asset.name());
  }
  detector.input_image = Some(image);

  let now = std::time::Instant::now();
  let Some(result) = detector.on_test_button_click() else {
    bail!("未得到分类结果");
  };
  info!("推理完成，耗时: {:.2?}", now.elapsed());

  if args.json {
    let value = serde_json::json!({
      "input": args.input.as_str(),
      "probability": result.probability,
      "label": result.label.name(),
      "label_id": result.label.id(),
      "is_infected": result.is_infected(),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
  } else {
    println!(
      "{}: {} (probability {:.4})",
      args.input,
      result.label.verdict(),
      result.probability
    );
  }

  detector.shutdown();
  Ok(())
}
