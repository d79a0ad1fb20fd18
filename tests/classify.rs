// 该文件是 Malaria Detector （疟疾检测） 项目的一部分。
// tests/classify.rs - 分类器集成测试
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

use std::{cell::RefCell, rc::Rc};

use image::Rgb;
use malaria_detector::{
  CellImage, CellLabel, CellTensor, MalariaDetector, ModelAsset,
  model::{Model, ModelLoader, ModelOutput},
};

#[derive(Debug, thiserror::Error)]
#[error("stub model error")]
struct StubError;

/// 总是返回固定值的模型，同时记录收到的输入张量
struct ConstantModel {
  value: f32,
  inputs: Rc<RefCell<Vec<CellTensor>>>,
  releases: Rc<RefCell<u32>>,
}

impl Model for ConstantModel {
  type Input = CellTensor;
  type Output = ModelOutput;
  type Error = StubError;

  fn infer(&mut self, input: &CellTensor) -> Result<ModelOutput, StubError> {
    self.inputs.borrow_mut().push(input.clone());
    Ok(ModelOutput::scalar(self.value))
  }

  fn release(self) {
    *self.releases.borrow_mut() += 1;
  }
}

struct ConstantLoader {
  value: f32,
  inputs: Rc<RefCell<Vec<CellTensor>>>,
  releases: Rc<RefCell<u32>>,
}

impl ConstantLoader {
  fn new(value: f32) -> Self {
    ConstantLoader {
      value,
      inputs: Rc::default(),
      releases: Rc::default(),
    }
  }
}

impl ModelLoader for ConstantLoader {
  type Model = ConstantModel;
  type Error = StubError;

  fn load(&self, _asset: &ModelAsset) -> Result<ConstantModel, StubError> {
    Ok(ConstantModel {
      value: self.value,
      inputs: self.inputs.clone(),
      releases: self.releases.clone(),
    })
  }
}

fn asset() -> ModelAsset {
  ModelAsset::from_bytes("stub.onnx", b"stub".to_vec()).unwrap()
}

fn detector_with(loader: &ConstantLoader) -> MalariaDetector<ConstantModel> {
  let mut detector = MalariaDetector::new();
  assert!(detector.initialize(loader, Some(&asset())));
  detector
}

#[test]
fn solid_red_cell_below_threshold_is_infected() {
  let loader = ConstantLoader::new(0.3);
  let mut detector = detector_with(&loader);
  let image = CellImage::from_pixel(128, 128, Rgb([1.0, 0.0, 0.0]));

  let result = detector.analyze_cell_image(Some(&image)).unwrap();

  assert_eq!(result.probability, 0.3);
  assert_eq!(result.label, CellLabel::Parasitized);
  assert_eq!(detector.infection_probability(), 0.3);
  assert!(detector.is_infected());
  assert_eq!(detector.resize_count(), 0);

  // 通道值 1.0 经过再次除以 255 后进入张量
  let inputs = loader.inputs.borrow();
  assert_eq!(inputs.len(), 1);
  assert_eq!(inputs[0].get(0, 0, 0), Some(1.0 / 255.0));
  assert_eq!(inputs[0].get(127, 127, 1), Some(0.0));
  assert_eq!(inputs[0].get(64, 64, 2), Some(0.0));
}

#[test]
fn tensor_rows_start_from_the_bottom_of_the_image() {
  let loader = ConstantLoader::new(0.3);
  let mut detector = detector_with(&loader);
  let mut image = CellImage::new(128, 128);
  for x in 0..128 {
    image.put_pixel(x, 0, Rgb([0.0, 1.0, 0.0]));
  }

  detector.analyze_cell_image(Some(&image)).unwrap();

  let inputs = loader.inputs.borrow();
  assert_eq!(inputs[0].get(127, 10, 1), Some(1.0 / 255.0));
  assert_eq!(inputs[0].get(0, 10, 1), Some(0.0));
}

#[test]
fn dropping_detector_releases_engine_once() {
  let loader = ConstantLoader::new(0.3);
  let detector = detector_with(&loader);

  drop(detector);
  assert_eq!(*loader.releases.borrow(), 1);
}

#[test]
fn small_cell_is_resized_once_and_classified_healthy() {
  let loader = ConstantLoader::new(0.7);
  let mut detector = detector_with(&loader);
  let image = CellImage::from_pixel(64, 64, Rgb([0.2, 0.4, 0.6]));
  let original = image.clone();

  let result = detector.analyze_cell_image(Some(&image)).unwrap();

  assert!(!result.is_infected());
  assert!(!detector.is_infected());
  assert_eq!(detector.resize_count(), 1);
  assert_eq!(image, original);
  assert_eq!(loader.inputs.borrow()[0].shape(), [1, 128, 128, 3]);
}

#[test]
fn probability_at_threshold_is_healthy() {
  let loader = ConstantLoader::new(0.5);
  let mut detector = detector_with(&loader);
  let image = CellImage::new(128, 128);

  let result = detector.analyze_cell_image(Some(&image)).unwrap();

  assert_eq!(result.probability, 0.5);
  assert!(!detector.is_infected());
  assert_eq!(result.label, CellLabel::Uninfected);
}

#[test]
fn verdict_tracks_probability_for_many_outputs() {
  for value in [0.0f32, 0.1, 0.499, 0.5, 0.501, 0.9, 1.0] {
    let loader = ConstantLoader::new(value);
    let mut detector = detector_with(&loader);
    detector.analyze_cell_image(Some(&CellImage::new(128, 128)));

    assert_eq!(detector.infection_probability(), value);
    assert_eq!(detector.is_infected(), value < 0.5);
  }
}

#[test]
fn missing_image_leaves_results_unchanged() {
  let loader = ConstantLoader::new(0.3);
  let mut detector = detector_with(&loader);
  detector.analyze_cell_image(Some(&CellImage::new(128, 128)));

  assert_eq!(detector.analyze_cell_image(None), None);
  assert_eq!(detector.infection_probability(), 0.3);
  assert!(detector.is_infected());
  assert_eq!(detector.classification_count(), 1);
}

#[test]
fn uninitialized_detector_behaves_like_missing_image() {
  let mut detector: MalariaDetector<ConstantModel> = MalariaDetector::new();
  let image = CellImage::new(64, 64);

  assert_eq!(detector.analyze_cell_image(Some(&image)), None);
  assert_eq!(detector.infection_probability(), 0.0);
  assert!(!detector.is_infected());
  assert_eq!(detector.resize_count(), 0);
}

#[test]
fn missing_asset_makes_classification_a_no_op() {
  let loader = ConstantLoader::new(0.1);
  let mut detector = MalariaDetector::new();

  assert!(!detector.initialize(&loader, None));
  assert_eq!(
    detector.analyze_cell_image(Some(&CellImage::new(128, 128))),
    None
  );
  assert!(loader.inputs.borrow().is_empty());
}

#[test]
fn shutdown_without_initialize_is_safe() {
  let mut detector: MalariaDetector<ConstantModel> = MalariaDetector::new();
  detector.shutdown();
  detector.shutdown();
}

#[test]
fn shutdown_releases_engine_and_disables_classification() {
  let loader = ConstantLoader::new(0.8);
  let mut detector = detector_with(&loader);

  detector.shutdown();
  assert_eq!(*loader.releases.borrow(), 1);
  assert!(!detector.is_ready());
  assert_eq!(
    detector.analyze_cell_image(Some(&CellImage::new(128, 128))),
    None
  );

  drop(detector);
  assert_eq!(*loader.releases.borrow(), 1);
}

#[test]
fn test_button_classifies_assigned_image() {
  let loader = ConstantLoader::new(0.2);
  let mut detector = detector_with(&loader);
  detector.input_image = Some(CellImage::from_pixel(32, 48, Rgb([0.9, 0.1, 0.1])));

  let result = detector.on_test_button_click().unwrap();

  assert!(result.is_infected());
  assert_eq!(detector.resize_count(), 1);
  assert!(detector.input_image.is_some());
  assert_eq!(detector.last_result(), Some(result));
}

#[test]
fn repeated_calls_are_idempotent() {
  let loader = ConstantLoader::new(0.42);
  let mut detector = detector_with(&loader);
  let image = CellImage::from_pixel(128, 128, Rgb([0.3, 0.3, 0.3]));

  let first = detector.analyze_cell_image(Some(&image));
  let second = detector.analyze_cell_image(Some(&image));

  assert_eq!(first, second);
  let inputs = loader.inputs.borrow();
  assert_eq!(inputs[0], inputs[1]);
}
