// 该文件是 Yaoshi （药识） 项目的一部分。
// src/task.rs - 异步任务调度
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

use std::{
  sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
    mpsc,
  },
  thread,
};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  decode::{DecodeError, Decoder, Prediction},
  encode::{Encoder, InputTensor},
  frame::Frame,
  model::{Model, OutputTensor},
};

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("模型推理失败: {0}")]
  InferError(String),
  #[error("结果解码失败: {0}")]
  DecodeError(#[from] DecodeError),
}

/// 提交的生命周期状态
#[derive(Debug, Clone)]
pub enum TaskState {
  Idle,
  Running { generation: u64 },
  Succeeded(Prediction),
  Failed(String),
}

/// 工作线程回传给交互侧的事件
#[derive(Debug)]
pub struct TaskEvent {
  pub generation: u64,
  pub outcome: Result<Prediction, TaskError>,
}

/// 异步任务调度器。
///
/// 每次提交在独立工作线程上完整执行编码、推理、解码，
/// 然后一次性回传结果；交互线程从不阻塞。帧按值传入，
/// 工作线程独占自己的一份，不存在共享可变图像状态。
///
/// 每次提交领取一个新的代号；工作线程在发布前重读计数器，
/// 代号已不是最新的结果直接丢弃，后提交的结果不会被先
/// 提交的迟到结果覆盖。所有阶段错误都在此边界转换为
/// Failed 状态和失败事件，不会以崩溃形式穿出。
pub struct Dispatcher<M> {
  model: Arc<M>,
  encoder: Encoder,
  decoder: Decoder,
  generation: Arc<AtomicU64>,
  state: Arc<Mutex<TaskState>>,
  sender: mpsc::Sender<TaskEvent>,
}

impl<M> Dispatcher<M>
where
  M: Model<Input = InputTensor, Output = OutputTensor> + Send + Sync + 'static,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(model: M, encoder: Encoder, decoder: Decoder) -> (Self, mpsc::Receiver<TaskEvent>) {
    let (sender, receiver) = mpsc::channel();
    let dispatcher = Self {
      model: Arc::new(model),
      encoder,
      decoder,
      generation: Arc::new(AtomicU64::new(0)),
      state: Arc::new(Mutex::new(TaskState::Idle)),
      sender,
    };
    (dispatcher, receiver)
  }

  /// 提交一帧图像，返回本次提交的代号。
  ///
  /// 计数器自增和 Running 状态写入在状态锁内完成，
  /// 与工作线程的检查发布互斥。
  pub fn submit(&self, frame: Frame) -> u64 {
    let generation = {
      let mut state = self.state.lock().unwrap();
      let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
      *state = TaskState::Running { generation };
      generation
    };

    let model = Arc::clone(&self.model);
    let encoder = self.encoder.clone();
    let decoder = self.decoder.clone();
    let counter = Arc::clone(&self.generation);
    let state = Arc::clone(&self.state);
    let sender = self.sender.clone();

    thread::spawn(move || {
      info!("({}) 开始处理第 {} 帧", generation, frame.index());
      let outcome = run_stages(model.as_ref(), &encoder, &decoder, &frame);

      // 检查与发布必须在同一把锁内完成：新的 submit 在锁内
      // 自增计数器，迟到结果不可能在检查通过后、发布之前
      // 被新提交插队覆盖
      let mut state = state.lock().unwrap();
      if counter.load(Ordering::SeqCst) != generation {
        debug!("({}) 结果已过期，丢弃", generation);
        return;
      }

      match &outcome {
        Ok(prediction) => {
          info!(
            "({}) 任务完成: 类别 {}, 置信度 {:.4}",
            generation, prediction.class_id, prediction.confidence
          );
          *state = TaskState::Succeeded(prediction.clone());
        }
        Err(e) => {
          warn!("({}) 任务失败: {}", generation, e);
          *state = TaskState::Failed(e.to_string());
        }
      }

      // 接收端关闭说明交互侧已经退出，丢弃即可
      let _ = sender.send(TaskEvent {
        generation,
        outcome,
      });
    });

    generation
  }

  /// 当前提交状态的快照
  pub fn state(&self) -> TaskState {
    self.state.lock().unwrap().clone()
  }

  pub fn current_generation(&self) -> u64 {
    self.generation.load(Ordering::SeqCst)
  }
}

fn run_stages<M>(
  model: &M,
  encoder: &Encoder,
  decoder: &Decoder,
  frame: &Frame,
) -> Result<Prediction, TaskError>
where
  M: Model<Input = InputTensor, Output = OutputTensor>,
  M::Error: std::error::Error,
{
  let tensor = encoder.encode(frame);
  debug!("编码完成，张量长度 {}", tensor.len());

  let output = model
    .infer(&tensor)
    .map_err(|e| TaskError::InferError(e.to_string()))?;

  Ok(decoder.decode(&output)?)
}
