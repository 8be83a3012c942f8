// 该文件是 Yaoshi （药识） 项目的一部分。
// src/decode.rs - 结果解码器
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
use tracing::debug;

use crate::model::OutputTensor;

/// 单次推理的预测结果
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
  pub class_id: usize,
  pub confidence: f32,
}

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("类别行 {row} 超出输出形状 {shape:?}")]
  RowOutOfRange { row: usize, shape: [usize; 3] },
  #[error("输出切片为空")]
  EmptySlice,
  #[error("输出切片中没有有限值")]
  NoFiniteValue,
}

/// 结果解码器。
///
/// 对指定类别行做稳定 arg-max：并列时取首个最大值，
/// 非有限值跳过；切片为空或全部非有限视为错误，
/// 而不是返回误导性的零置信度结果。
#[derive(Debug, Clone)]
pub struct Decoder {
  class_row: usize,
}

impl Default for Decoder {
  fn default() -> Self {
    Self { class_row: 0 }
  }
}

impl Decoder {
  pub fn new(class_row: usize) -> Self {
    Self { class_row }
  }

  pub fn decode(&self, output: &OutputTensor) -> Result<Prediction, DecodeError> {
    let slice = output
      .class_row(self.class_row)
      .ok_or(DecodeError::RowOutOfRange {
        row: self.class_row,
        shape: output.shape(),
      })?;

    if slice.is_empty() {
      return Err(DecodeError::EmptySlice);
    }

    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in slice.iter().enumerate() {
      if !value.is_finite() {
        continue;
      }
      match best {
        // 并列取首个最大值
        Some((_, max)) if value <= max => {}
        _ => best = Some((index, value)),
      }
    }

    let (class_id, confidence) = best.ok_or(DecodeError::NoFiniteValue)?;
    debug!("解码完成: 类别 {}, 置信度 {:.4}", class_id, confidence);

    Ok(Prediction {
      class_id,
      confidence,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn output(data: Vec<f32>, shape: [usize; 3]) -> OutputTensor {
    OutputTensor::new(data, shape).unwrap()
  }

  #[test]
  fn argmax_picks_maximum() {
    let tensor = output(vec![0.1, 0.9, 0.3], [1, 1, 3]);
    let prediction = Decoder::default().decode(&tensor).unwrap();
    assert_eq!(prediction.class_id, 1);
    assert_eq!(prediction.confidence, 0.9);
  }

  #[test]
  fn tie_takes_first_index() {
    let tensor = output(vec![0.5, 0.5], [1, 1, 2]);
    let prediction = Decoder::default().decode(&tensor).unwrap();
    assert_eq!(prediction.class_id, 0);
    assert_eq!(prediction.confidence, 0.5);
  }

  #[test]
  fn decodes_designated_row_only() {
    let tensor = output(vec![0.9, 0.1, 0.2, 0.8], [1, 2, 2]);
    let prediction = Decoder::new(1).decode(&tensor).unwrap();
    assert_eq!(prediction.class_id, 1);
    assert_eq!(prediction.confidence, 0.8);
  }

  #[test]
  fn row_out_of_range_is_an_error() {
    let tensor = output(vec![0.1, 0.2], [1, 1, 2]);
    assert!(matches!(
      Decoder::new(3).decode(&tensor),
      Err(DecodeError::RowOutOfRange {
        row: 3,
        shape: [1, 1, 2]
      })
    ));
  }

  #[test]
  fn empty_slice_is_an_error() {
    let tensor = output(vec![], [1, 1, 0]);
    assert!(matches!(
      Decoder::default().decode(&tensor),
      Err(DecodeError::EmptySlice)
    ));
  }

  #[test]
  fn all_non_finite_is_an_error() {
    let tensor = output(vec![f32::NAN, f32::INFINITY, f32::NEG_INFINITY], [1, 1, 3]);
    assert!(matches!(
      Decoder::default().decode(&tensor),
      Err(DecodeError::NoFiniteValue)
    ));
  }

  #[test]
  fn non_finite_values_are_skipped() {
    let tensor = output(vec![f32::NAN, 0.4, f32::INFINITY, 0.7], [1, 1, 4]);
    let prediction = Decoder::default().decode(&tensor).unwrap();
    assert_eq!(prediction.class_id, 3);
    assert_eq!(prediction.confidence, 0.7);
  }
}
