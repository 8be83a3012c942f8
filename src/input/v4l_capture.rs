// 该文件是 Yaoshi （药识） 项目的一部分。
// src/input/v4l_capture.rs - V4L2 摄像头单帧捕获
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

use std::pin::Pin;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, FrameError},
};

// 曝光、白平衡需要几帧才稳定，捕获前先丢弃这些帧
const WARMUP_FRAMES: usize = 3;

#[derive(Error, Debug)]
pub enum V4lCaptureError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无法创建 RGB 图像")]
  InvalidBuffer,
  #[error("图像无效: {0}")]
  InvalidImage(#[from] FrameError),
}

/// V4L2 摄像头单帧捕获。
///
/// 由于 v4l 库的 Stream 需要引用 Device，我们使用 Pin<Box> 来保证
/// Device 的内存地址稳定，从而可以安全地创建引用它的 Stream。
pub struct V4lCapture {
  /// V4L2 设备（使用 Pin<Box> 固定内存位置）
  device: Pin<Box<Device>>,
  /// 捕获流（生命周期与 device 关联）
  stream: Option<Stream<'static>>,
  /// 帧索引
  frame_index: u64,
  /// 视频宽度
  width: u32,
  /// 视频高度
  height: u32,
}

impl FromUrlWithScheme for V4lCapture {
  const SCHEME: &'static str = "v4l2";
}

impl FromUrl for V4lCapture {
  type Error = V4lCaptureError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(V4lCaptureError::SchemeMismatch);
    }

    let device_path = if url.path().is_empty() {
      "/dev/video0"
    } else {
      url.path()
    };

    V4lCapture::open(device_path)
  }
}

impl V4lCapture {
  pub fn open(device_path: &str) -> Result<Self, V4lCaptureError> {
    let device = Box::pin(Device::with_path(device_path)?);

    // 设置视频格式
    let mut format = device.format()?;
    format.width = 1280;
    format.height = 720;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device.set_format(&format)?;
    debug!("摄像头格式: {}x{} {}", format.width, format.height, format.fourcc);

    let width = format.width;
    let height = format.height;

    let mut capture = Self {
      device,
      stream: None,
      frame_index: 0,
      width,
      height,
    };

    // 创建捕获流
    // SAFETY: device 被 Pin<Box> 固定，不会移动，所以引用始终有效
    // Stream 的生命周期通过 capture 的 Drop 来管理
    let device_ref: &Device = &capture.device;
    let stream = unsafe {
      // 将设备引用的生命周期延长到 'static
      // 这是安全的，因为:
      // 1. device 被 Pin<Box> 固定在堆上，不会移动
      // 2. stream 存储在同一个结构体中，会在 device 之前被 drop
      // 3. Drop 顺序：stream (Option::take) -> device
      let device_static: &'static Device = std::mem::transmute(device_ref);
      Stream::with_buffers(device_static, Type::VideoCapture, 4)?
    };

    capture.stream = Some(stream);
    Ok(capture)
  }

  /// 捕获一帧已实现的图像。
  ///
  /// 核心流水线只消费这里返回的帧，从不直接接触预览流。
  pub fn grab(&mut self) -> Result<Frame, V4lCaptureError> {
    let stream = self
      .stream
      .as_mut()
      .ok_or(V4lCaptureError::InvalidBuffer)?;

    for _ in 0..WARMUP_FRAMES {
      let _ = stream.next()?;
    }

    let (buffer, _meta) = stream.next()?;
    let rgb_data = yuyv_to_rgb(buffer, self.width, self.height);

    let image = RgbImage::from_raw(self.width, self.height, rgb_data)
      .ok_or(V4lCaptureError::InvalidBuffer)?;

    let frame = Frame::new(image, self.frame_index)?;
    self.frame_index += 1;
    Ok(frame)
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }
}

impl Drop for V4lCapture {
  fn drop(&mut self) {
    // 确保 stream 在 device 之前被 drop
    self.stream.take();
  }
}

/// 将 YUYV 格式转换为 RGB
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
  let mut rgb = Vec::with_capacity((width * height * 3) as usize);

  for chunk in yuyv.chunks(4) {
    if chunk.len() < 4 {
      break;
    }

    let y0 = chunk[0] as f32;
    let u = chunk[1] as f32 - 128.0;
    let y1 = chunk[2] as f32;
    let v = chunk[3] as f32 - 128.0;

    // 第一个像素
    let r = (y0 + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y0 - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y0 + 1.772 * u).clamp(0.0, 255.0) as u8;
    rgb.extend_from_slice(&[r, g, b]);

    // 第二个像素
    let r = (y1 + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y1 - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y1 + 1.772 * u).clamp(0.0, 255.0) as u8;
    rgb.extend_from_slice(&[r, g, b]);
  }

  rgb
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_foreign_scheme() {
    let url = Url::parse("image:///dev/video0").unwrap();
    assert!(matches!(
      V4lCapture::from_url(&url),
      Err(V4lCaptureError::SchemeMismatch)
    ));
  }

  #[test]
  fn yuyv_conversion_keeps_pixel_count() {
    // 2x2 的 YUYV 帧占 8 字节，转换后应得 4 个 RGB 像素
    let yuyv = [128u8; 8];
    let rgb = yuyv_to_rgb(&yuyv, 2, 2);
    assert_eq!(rgb.len(), 2 * 2 * 3);
  }

  #[test]
  fn yuyv_gray_midpoint_maps_to_gray() {
    // Y=128, U=V=128 是中性灰
    let rgb = yuyv_to_rgb(&[128, 128, 128, 128], 2, 1);
    assert_eq!(rgb, vec![128, 128, 128, 128, 128, 128]);
  }
}
