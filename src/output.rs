// 该文件是 Yaoshi （药识） 项目的一部分。
// src/output.rs - 结果输出
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

use tracing::info;

use crate::decode::Prediction;

pub trait Render: Sized {
  type Error;
  fn render_result(&self, prediction: &Prediction) -> Result<(), Self::Error>;
  fn render_failure(&self, message: &str) -> Result<(), Self::Error>;
}

/// 界面展示的药品标签文本
pub fn label_text(prediction: &Prediction) -> String {
  format!("Medicine: {}", prediction.class_id)
}

/// 界面展示的置信度文本，百分比保留两位小数
pub fn confidence_text(prediction: &Prediction) -> String {
  format!("Confidence: {:.2}", prediction.confidence * 100.0)
}

/// 控制台输出：把预测结果或失败状态写到标准输出。
/// 任何失败路径都必须落在一个可观察的输出状态上。
#[derive(Debug, Default)]
pub struct ConsoleOutput;

impl Render for ConsoleOutput {
  type Error = std::io::Error;

  fn render_result(&self, prediction: &Prediction) -> Result<(), Self::Error> {
    info!("展示预测结果");
    println!("{}", label_text(prediction));
    println!("{}", confidence_text(prediction));
    Ok(())
  }

  fn render_failure(&self, message: &str) -> Result<(), Self::Error> {
    println!("识别失败: {}", message);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn label_text_matches_ui_format() {
    let prediction = Prediction {
      class_id: 3,
      confidence: 0.9,
    };
    assert_eq!(label_text(&prediction), "Medicine: 3");
  }

  #[test]
  fn confidence_text_is_percentage_with_two_decimals() {
    let prediction = Prediction {
      class_id: 0,
      confidence: 0.9,
    };
    assert_eq!(confidence_text(&prediction), "Confidence: 90.00");

    let low = Prediction {
      class_id: 0,
      confidence: 0.12345,
    };
    assert_eq!(confidence_text(&low), "Confidence: 12.35");
  }
}
