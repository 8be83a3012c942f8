// 该文件是 Yaoshi （药识） 项目的一部分。
// src/frame.rs - 提交帧定义
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

use chrono::Utc;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("空图像: {0}x{1}")]
  EmptyImage(u32, u32),
}

/// 一次提交的帧数据。
///
/// 帧在构造时校验：零尺寸图像属于调用方违约，
/// 必须在进入流水线之前被拒绝。
#[derive(Debug, Clone)]
pub struct Frame {
  image: RgbImage,
  index: u64,
  timestamp_ms: u64,
}

impl Frame {
  pub fn new(image: RgbImage, index: u64) -> Result<Self, FrameError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(FrameError::EmptyImage(width, height));
    }

    Ok(Self {
      image,
      index,
      timestamp_ms: Utc::now().timestamp_millis() as u64,
    })
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  /// 帧索引
  pub fn index(&self) -> u64 {
    self.index
  }

  /// 捕获时间戳（毫秒）
  pub fn timestamp_ms(&self) -> u64 {
    self.timestamp_ms
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reject_empty_image() {
    let image = RgbImage::new(0, 0);
    assert!(matches!(
      Frame::new(image, 0),
      Err(FrameError::EmptyImage(0, 0))
    ));
  }

  #[test]
  fn reject_zero_width_image() {
    let image = RgbImage::new(0, 4);
    assert!(Frame::new(image, 0).is_err());
  }

  #[test]
  fn accept_valid_image() {
    let image = RgbImage::new(2, 2);
    let frame = Frame::new(image, 7).unwrap();
    assert_eq!(frame.index(), 7);
    assert_eq!((frame.width(), frame.height()), (2, 2));
  }
}
