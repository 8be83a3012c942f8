// 该文件是 Yaoshi （药识） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// Yaoshi 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型路径（medinet://{path}）
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// 支持格式:
  /// - 图片: image://{path}
  /// - 摄像头: v4l2://{device}
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 形状配置 JSON 文件，缺省使用随附模型的声明形状
  #[arg(long, value_name = "FILE")]
  pub spec: Option<PathBuf>,

  /// 解码使用的类别行
  #[arg(long, default_value = "0", value_name = "ROW")]
  pub class_row: usize,
}
