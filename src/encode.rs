// 该文件是 Yaoshi （药识） 项目的一部分。
// src/encode.rs - 张量编码器
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

use image::imageops::{self, FilterType};
use tracing::debug;

use crate::{frame::Frame, model::ModelSpec};

const RGB_CHANNELS: usize = 3;

/// 将单个字节通道值线性归一化到 [-1, 1]
#[inline]
fn normalize(byte: u8) -> f32 {
  (byte as f32 - 127.5) / 127.5
}

/// 编码后的输入张量，NHWC 布局，RGB 交错，float32。
///
/// 每次推理调用新建一个，用完即弃。
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
  data: Box<[f32]>,
  shape: [usize; 4],
}

impl InputTensor {
  pub fn shape(&self) -> [usize; 4] {
    self.shape
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  /// 本机字节序的原始字节视图，供按字节缓冲喂入的引擎使用
  pub fn to_ne_bytes(&self) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(self.data.len() * size_of::<f32>());
    for value in &self.data {
      bytes.extend_from_slice(&value.to_ne_bytes());
    }
    bytes
  }
}

/// 张量编码器。
///
/// 把一帧图像缩放到模型输入尺寸并按行主序、RGB 交错
/// 归一化为 float32 张量。缩放固定使用最近邻滤波，
/// 与训练侧的预处理保持一致。
#[derive(Debug, Clone)]
pub struct Encoder {
  width: u32,
  height: u32,
}

impl Encoder {
  pub fn new(spec: &ModelSpec) -> Self {
    Self {
      width: spec.input_width() as u32,
      height: spec.input_height() as u32,
    }
  }

  pub fn encode(&self, frame: &Frame) -> InputTensor {
    let image = frame.image();
    let resized;
    let pixels = if image.dimensions() == (self.width, self.height) {
      image
    } else {
      debug!(
        "缩放图像: {}x{} -> {}x{}",
        image.width(),
        image.height(),
        self.width,
        self.height
      );
      resized = imageops::resize(image, self.width, self.height, FilterType::Nearest);
      &resized
    };

    let height = self.height as usize;
    let width = self.width as usize;
    let mut data = Vec::with_capacity(height * width * RGB_CHANNELS);

    for y in 0..self.height {
      for x in 0..self.width {
        let pixel = pixels.get_pixel(x, y);
        data.push(normalize(pixel[0]));
        data.push(normalize(pixel[1]));
        data.push(normalize(pixel[2]));
      }
    }

    InputTensor {
      data: data.into_boxed_slice(),
      shape: [1, height, width, RGB_CHANNELS],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn spec_2x2() -> ModelSpec {
    ModelSpec {
      input: [1, 2, 2, 3],
      output: [1, 2, 3],
    }
  }

  fn frame_from(image: RgbImage) -> Frame {
    Frame::new(image, 0).unwrap()
  }

  #[test]
  fn output_length_is_three_wh() {
    let encoder = Encoder::new(&ModelSpec::default());
    let frame = frame_from(RgbImage::new(32, 16));
    let tensor = encoder.encode(&frame);
    assert_eq!(tensor.len(), 3 * 1088 * 608);
    assert_eq!(tensor.shape(), [1, 608, 1088, 3]);
  }

  #[test]
  fn values_stay_in_unit_range() {
    let mut image = RgbImage::new(16, 16);
    for (i, pixel) in image.pixels_mut().enumerate() {
      *pixel = Rgb([(i % 256) as u8, 0, 255]);
    }
    let encoder = Encoder::new(&spec_2x2());
    let tensor = encoder.encode(&frame_from(image));
    assert!(tensor.as_slice().iter().all(|v| (-1.0..=1.0).contains(v)));
  }

  #[test]
  fn midpoint_bytes_bracket_zero() {
    assert!(normalize(127) < 0.0 && normalize(127) > -0.005);
    assert!(normalize(128) > 0.0 && normalize(128) < 0.005);
    assert_eq!(normalize(0), -1.0);
    assert_eq!(normalize(255), 1.0);
  }

  #[test]
  fn interleave_order_is_row_major_rgb() {
    let mut image = RgbImage::new(2, 2);
    image.put_pixel(0, 0, Rgb([255, 0, 0]));
    image.put_pixel(1, 0, Rgb([0, 255, 0]));
    image.put_pixel(0, 1, Rgb([0, 0, 255]));
    image.put_pixel(1, 1, Rgb([255, 255, 255]));

    let encoder = Encoder::new(&spec_2x2());
    let tensor = encoder.encode(&frame_from(image));

    // 行主序：(0,0) (1,0) (0,1) (1,1)，每个像素依次 R、G、B
    let expected = [
      1.0, -1.0, -1.0, // 红
      -1.0, 1.0, -1.0, // 绿
      -1.0, -1.0, 1.0, // 蓝
      1.0, 1.0, 1.0, // 白
    ];
    assert_eq!(tensor.as_slice(), &expected);
  }

  #[test]
  fn encoding_is_deterministic() {
    let mut image = RgbImage::new(7, 5);
    for (i, pixel) in image.pixels_mut().enumerate() {
      *pixel = Rgb([(i * 3 % 256) as u8, (i * 7 % 256) as u8, (i * 11 % 256) as u8]);
    }
    let frame = frame_from(image);
    let encoder = Encoder::new(&spec_2x2());
    assert_eq!(encoder.encode(&frame), encoder.encode(&frame));
  }

  #[test]
  fn native_byte_view_matches_values() {
    let encoder = Encoder::new(&spec_2x2());
    let tensor = encoder.encode(&frame_from(RgbImage::new(2, 2)));
    let bytes = tensor.to_ne_bytes();
    assert_eq!(bytes.len(), tensor.len() * 4);
    assert_eq!(bytes[0..4], (-1.0f32).to_ne_bytes());
  }
}
