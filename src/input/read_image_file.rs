// 该文件是 Yaoshi （药识） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, FrameError},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("图像无效: {0}")]
  InvalidImage(#[from] FrameError),
  #[error("图像帧已被取走")]
  Exhausted,
}

/// 图像文件输入：从 image://{path} 读取一帧静态图像。
///
/// 零尺寸图像在加载时即被拒绝，不会进入流水线。
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch);
    }

    let path = url.path();
    let image: RgbImage = ImageReader::open(path)?.decode()?.into();
    if image.width() == 0 || image.height() == 0 {
      return Err(ImageFileInputError::InvalidImage(FrameError::EmptyImage(
        image.width(),
        image.height(),
      )));
    }

    Ok(ImageFileInput { image: Some(image) })
  }
}

impl ImageFileInput {
  /// 取出这帧图像；文件只含一帧，再次调用报错
  pub fn grab(&mut self) -> Result<Frame, ImageFileInputError> {
    let image = self.image.take().ok_or(ImageFileInputError::Exhausted)?;
    Ok(Frame::new(image, 0)?)
  }
}
