// 该文件是 Yaoshi （药识） 项目的一部分。
// src/input.rs - 图像输入
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

use crate::{FromUrl, frame::Frame};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "v4l_capture")]
mod v4l_capture;
#[cfg(feature = "v4l_capture")]
pub use self::v4l_capture::{V4lCapture, V4lCaptureError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "v4l_capture")]
  #[error("摄像头捕获错误: {0}")]
  V4lCaptureError(#[from] V4lCaptureError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 统一的捕获输入：核心流水线只消费已实现的帧，
/// 不直接接触预览流。
pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ImageFile(ImageFileInput),
  #[cfg(feature = "v4l_capture")]
  V4lCapture(V4lCapture),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ImageFile(input));
      }
    }
    #[cfg(feature = "v4l_capture")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == V4lCapture::SCHEME {
        let input = V4lCapture::from_url(url)?;
        return Ok(InputWrapper::V4lCapture(input));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl InputWrapper {
  /// 捕获一帧已实现的图像
  pub fn grab(&mut self) -> Result<Frame, InputError> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageFile(input) => input.grab().map_err(InputError::from),
      #[cfg(feature = "v4l_capture")]
      InputWrapper::V4lCapture(input) => input.grab().map_err(InputError::from),
    }
  }
}
