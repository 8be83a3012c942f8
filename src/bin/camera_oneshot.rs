// 该文件是 Yaoshi （药识） 项目的一部分。
// src/bin/camera_oneshot.rs - 摄像头单帧识别
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

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;
use url::Url;

use yaoshi::{
  FromUrl,
  decode::Decoder,
  encode::Encoder,
  input::V4lCapture,
  model::{MedinetBuilder, ModelSpec},
  output::{ConsoleOutput, Render},
  task::Dispatcher,
};

/// 摄像头单帧识别参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型路径（medinet://{path}）
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 摄像头设备（v4l2://{device}）
  #[arg(long, default_value = "v4l2:///dev/video0", value_name = "DEVICE")]
  pub camera: Url,

  /// 解码使用的类别行
  #[arg(long, default_value = "0", value_name = "ROW")]
  pub class_row: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("摄像头设备: {}", args.camera);

  let spec = ModelSpec::default();
  let model = MedinetBuilder::from_url(&args.model)?
    .spec(spec.clone())
    .build()?;

  let mut camera = V4lCapture::from_url(&args.camera)?;
  info!("摄像头已打开: {}x{}", camera.width(), camera.height());

  let frame = camera.grab()?;
  info!("捕获完成，第 {} 帧", frame.index());

  let (dispatcher, events) = Dispatcher::new(model, Encoder::new(&spec), Decoder::new(args.class_row));
  let generation = dispatcher.submit(frame);
  let output = ConsoleOutput;

  for event in events {
    if event.generation != generation {
      continue;
    }
    return match event.outcome {
      Ok(prediction) => {
        output.render_result(&prediction)?;
        Ok(())
      }
      Err(e) => {
        output.render_failure(&e.to_string())?;
        Err(anyhow!("识别失败: {}", e))
      }
    };
  }

  Err(anyhow!("工作线程未返回结果"))
}
