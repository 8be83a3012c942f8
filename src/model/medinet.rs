// 该文件是 Yaoshi （药识） 项目的一部分。
// src/model/medinet.rs - Medinet 药品分类模型
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
use tract_onnx::prelude::*;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  encode::InputTensor,
  model::{Model, ModelSpec, OutputTensor, ShapeError},
};

type RunnableOnnx = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

#[derive(Error, Debug)]
pub enum MedinetError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型加载错误: {0}")]
  ModelLoadError(String),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("推理执行错误: {0}")]
  InferError(String),
  #[error("{0}")]
  ShapeError(#[from] ShapeError),
}

impl MedinetError {
  fn invalid(msg: &str, e: impl std::fmt::Display) -> Self {
    MedinetError::ModelInvalid(format!("{}: {}", msg, e))
  }
}

/// 随附的药品分类模型。
///
/// 模型在构建时加载一次，之后所有推理复用同一份已优化的
/// 执行计划；持有的资源随 drop 释放，包括出错路径。
pub struct Medinet {
  plan: RunnableOnnx,
  spec: ModelSpec,
}

pub struct MedinetBuilder {
  model_path: String,
  spec: ModelSpec,
}

impl FromUrlWithScheme for MedinetBuilder {
  const SCHEME: &'static str = "medinet";
}

impl FromUrl for MedinetBuilder {
  type Error = MedinetError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(MedinetError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(MedinetBuilder {
      model_path: url.path().to_string(),
      spec: ModelSpec::default(),
    })
  }
}

impl MedinetBuilder {
  /// 覆盖默认的形状配置
  pub fn spec(mut self, spec: ModelSpec) -> Self {
    self.spec = spec;
    self
  }

  pub fn build(self) -> Result<Medinet, MedinetError> {
    info!("加载模型文件: {}", self.model_path);
    let metadata = std::fs::metadata(&self.model_path)
      .map_err(|e| MedinetError::ModelLoadError(format!("{}: {}", self.model_path, e)))?;
    debug!(
      "模型文件大小: {:.2} MB",
      metadata.len() as f64 / (1024.0 * 1024.0)
    );

    let model = tract_onnx::onnx()
      .model_for_path(&self.model_path)
      .map_err(|e| MedinetError::ModelLoadError(e.to_string()))?
      .with_input_fact(0, f32::fact(self.spec.input).into())
      .map_err(|e| MedinetError::invalid("模型输入与配置形状不一致", e))?
      .into_optimized()
      .map_err(|e| MedinetError::invalid("模型优化失败", e))?;

    // 输出形状在加载时即与配置核对，不一致立即失败
    let output_fact = model
      .output_fact(0)
      .map_err(|e| MedinetError::invalid("无法获取输出声明", e))?;
    check_output_shape(output_fact.shape.as_concrete(), self.spec.output)?;

    let plan = model
      .into_runnable()
      .map_err(|e| MedinetError::invalid("无法生成执行计划", e))?;
    info!("模型加载完成");

    Ok(Medinet {
      plan,
      spec: self.spec,
    })
  }
}

/// 核对模型声明的输出形状。
///
/// 随附模型的形状是固定契约，符号化（无法确定）的输出
/// 形状同样视为配置错误拒绝，而不是推迟到运行时。
fn check_output_shape(
  declared: Option<&[usize]>,
  expected: [usize; 3],
) -> Result<(), MedinetError> {
  match declared {
    None => Err(MedinetError::ModelInvalid(format!(
      "模型输出形状无法确定，期望 {:?}",
      expected
    ))),
    Some(shape) if shape != expected => Err(MedinetError::ModelInvalid(format!(
      "模型输出形状 {:?} 与配置 {:?} 不一致",
      shape, expected
    ))),
    Some(shape) => {
      debug!("模型输出形状: {:?}", shape);
      Ok(())
    }
  }
}

impl Model for Medinet {
  type Input = InputTensor;
  type Output = OutputTensor;
  type Error = MedinetError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.spec.check_input(input)?;

    debug!("设置模型输入");
    let tensor = Tensor::from_shape(&self.spec.input, input.as_slice())
      .map_err(|e| MedinetError::InferError(e.to_string()))?;

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into()))
      .map_err(|e| MedinetError::InferError(e.to_string()))?;

    debug!("获取模型输出");
    let view = outputs[0]
      .to_array_view::<f32>()
      .map_err(|e| MedinetError::InferError(e.to_string()))?;
    let data: Vec<f32> = view.iter().copied().collect();

    OutputTensor::new(data, self.spec.output)
      .map_err(|e| MedinetError::invalid("模型输出与声明形状不符", e))
  }

  fn spec(&self) -> &ModelSpec {
    &self.spec
  }
}
