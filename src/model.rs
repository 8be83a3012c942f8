// 该文件是 Yaoshi （药识） 项目的一部分。
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

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encode::InputTensor;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
  fn spec(&self) -> &ModelSpec;
}

#[derive(Error, Debug)]
pub enum ShapeError {
  #[error("输入张量形状不匹配: 期望 {expected:?} (长度 {expected_len}), 实际长度 {actual_len}")]
  Mismatch {
    expected: [usize; 4],
    expected_len: usize,
    actual_len: usize,
  },
}

#[derive(Error, Debug)]
pub enum ModelSpecError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// 模型输入输出形状配置。
///
/// 形状是随附模型的契约而非算法属性，因此从代码中的
/// 数字字面量外提为显式配置，加载模型时与其声明校验，
/// 不一致即快速失败。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
  /// 输入形状 [batch, height, width, channels]
  pub input: [usize; 4],
  /// 输出形状 [batch, classes, detections]
  pub output: [usize; 3],
}

impl Default for ModelSpec {
  /// 随附 Medinet 模型的声明形状
  fn default() -> Self {
    Self {
      input: [1, 608, 1088, 3],
      output: [1, 9, 13566],
    }
  }
}

impl ModelSpec {
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ModelSpecError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
  }

  pub fn input_height(&self) -> usize {
    self.input[1]
  }

  pub fn input_width(&self) -> usize {
    self.input[2]
  }

  pub fn input_len(&self) -> usize {
    self.input.iter().product()
  }

  pub fn output_len(&self) -> usize {
    self.output.iter().product()
  }

  pub fn check_input(&self, tensor: &InputTensor) -> Result<(), ShapeError> {
    if tensor.len() != self.input_len() {
      return Err(ShapeError::Mismatch {
        expected: self.input,
        expected_len: self.input_len(),
        actual_len: tensor.len(),
      });
    }
    Ok(())
  }
}

#[derive(Error, Debug)]
pub enum OutputTensorError {
  #[error("输出长度 {actual} 与声明形状 {shape:?} 不符")]
  LengthMismatch { shape: [usize; 3], actual: usize },
  #[error("不支持的批大小 {batch}, 输出批大小必须为 1")]
  UnsupportedBatch { batch: usize },
}

/// 推理输出张量，形状 [batch, classes, detections]
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
  data: Box<[f32]>,
  shape: [usize; 3],
}

impl OutputTensor {
  pub fn new(data: Vec<f32>, shape: [usize; 3]) -> Result<Self, OutputTensorError> {
    // class_row 的行偏移依赖批大小为 1
    if shape[0] != 1 {
      return Err(OutputTensorError::UnsupportedBatch { batch: shape[0] });
    }
    if data.len() != shape.iter().product::<usize>() {
      return Err(OutputTensorError::LengthMismatch {
        shape,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
      shape,
    })
  }

  pub fn shape(&self) -> [usize; 3] {
    self.shape
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  /// 取指定类别行的检测分数切片，行号越界时返回 None
  pub fn class_row(&self, row: usize) -> Option<&[f32]> {
    let [_, classes, detections] = self.shape;
    if row >= classes {
      return None;
    }
    Some(&self.data[row * detections..(row + 1) * detections])
  }
}

#[cfg(feature = "model_medinet")]
mod medinet;
#[cfg(feature = "model_medinet")]
pub use self::medinet::{Medinet, MedinetBuilder, MedinetError};

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{encode::Encoder, frame::Frame};
  use image::RgbImage;

  #[test]
  fn check_input_accepts_matching_tensor() {
    let spec = ModelSpec {
      input: [1, 4, 6, 3],
      output: [1, 2, 5],
    };
    let tensor = Encoder::new(&spec).encode(&Frame::new(RgbImage::new(6, 4), 0).unwrap());
    assert!(spec.check_input(&tensor).is_ok());
  }

  #[test]
  fn check_input_rejects_wrong_length() {
    let spec = ModelSpec {
      input: [1, 4, 6, 3],
      output: [1, 2, 5],
    };
    let wrong = ModelSpec {
      input: [1, 2, 2, 3],
      output: [1, 2, 5],
    };
    let tensor = Encoder::new(&wrong).encode(&Frame::new(RgbImage::new(2, 2), 0).unwrap());

    match spec.check_input(&tensor) {
      Err(ShapeError::Mismatch {
        expected,
        expected_len,
        actual_len,
      }) => {
        assert_eq!(expected, [1, 4, 6, 3]);
        assert_eq!(expected_len, 72);
        assert_eq!(actual_len, 12);
      }
      other => panic!("期望形状不匹配错误, 得到 {:?}", other),
    }
  }

  #[test]
  fn spec_parses_from_json() {
    let json = r#"{ "input": [1, 608, 1088, 3], "output": [1, 9, 13566] }"#;
    let spec: ModelSpec = serde_json::from_str(json).unwrap();
    assert_eq!(spec, ModelSpec::default());
    assert_eq!(spec.input_len(), 608 * 1088 * 3);
    assert_eq!(spec.output_len(), 9 * 13566);
  }

  #[test]
  fn output_tensor_validates_length() {
    assert!(OutputTensor::new(vec![0.0; 6], [1, 2, 3]).is_ok());
    assert!(matches!(
      OutputTensor::new(vec![0.0; 5], [1, 2, 3]),
      Err(OutputTensorError::LengthMismatch { actual: 5, .. })
    ));
  }

  #[test]
  fn output_tensor_rejects_multi_batch() {
    assert!(matches!(
      OutputTensor::new(vec![0.0; 12], [2, 2, 3]),
      Err(OutputTensorError::UnsupportedBatch { batch: 2 })
    ));
  }

  #[test]
  fn class_row_slices_designated_row() {
    let output = OutputTensor::new(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], [1, 2, 3]).unwrap();
    assert_eq!(output.class_row(0), Some(&[0.0, 1.0, 2.0][..]));
    assert_eq!(output.class_row(1), Some(&[3.0, 4.0, 5.0][..]));
    assert_eq!(output.class_row(2), None);
  }
}
