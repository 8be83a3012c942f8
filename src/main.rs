// 该文件是 Yaoshi （药识） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;

use yaoshi::{
  FromUrl,
  decode::Decoder,
  encode::Encoder,
  input::InputWrapper,
  model::{MedinetBuilder, ModelSpec},
  output::{ConsoleOutput, Render},
  task::Dispatcher,
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);

  let spec = match &args.spec {
    Some(path) => ModelSpec::from_json_file(path)?,
    None => ModelSpec::default(),
  };
  info!("模型形状配置: 输入 {:?}, 输出 {:?}", spec.input, spec.output);

  let model = MedinetBuilder::from_url(&args.model)?
    .spec(spec.clone())
    .build()?;
  let encoder = Encoder::new(&spec);
  let decoder = Decoder::new(args.class_row);

  let mut input = InputWrapper::from_url(&args.input)?;
  let frame = input.grab()?;
  info!("输入帧获取成功: {}x{}", frame.width(), frame.height());

  let (dispatcher, events) = Dispatcher::new(model, encoder, decoder);
  let output = ConsoleOutput;

  info!("开始推理...");
  let now = std::time::Instant::now();
  let generation = dispatcher.submit(frame);

  for event in events {
    if event.generation != generation {
      continue;
    }
    let elapsed = now.elapsed();
    info!("推理完成，耗时: {:.2?}", elapsed);

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
