//! 手写图片预处理
//!
//! 固定流水线：灰度 → 高斯模糊 → 自适应阈值（反色二值化）→ 开运算去噪 → 膨胀 → 反色，
//! 输出白底黑字的二值图，交给 OCR 后端。

use std::collections::BTreeMap;
use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::{box_filter, gaussian_blur_f32};
use imageproc::morphology;
use serde_json::{json, Value as JsonValue};

use crate::error::ProviderError;

/// 预处理参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessParams {
    /// 高斯模糊核尺寸（奇数）
    pub blur_kernel: u32,
    /// 自适应阈值邻域尺寸（奇数）
    pub threshold_block_size: u32,
    /// 阈值偏移量
    pub threshold_c: i16,
    /// 去噪核尺寸
    pub noise_kernel: u8,
    /// 膨胀核尺寸
    pub dilation_kernel: u8,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            blur_kernel: 5,
            threshold_block_size: 11,
            threshold_c: 2,
            noise_kernel: 1,
            dilation_kernel: 2,
        }
    }
}

impl PreprocessParams {
    /// 根据图片亮度统计调整参数
    ///
    /// - 偏暗（均值 < 127）：加大阈值邻域和偏移
    /// - 低对比度（标准差 < 50）：减小模糊、适度加大邻域
    pub fn adapted_to(stats: &ImageStats) -> Self {
        let mut params = Self::default();
        if stats.mean < 127.0 {
            params.threshold_block_size = 15;
            params.threshold_c = 3;
        } else if stats.std_dev < 50.0 {
            params.blur_kernel = 3;
            params.threshold_block_size = 13;
        }
        params
    }

    /// 与 OpenCV 在 sigma=0 时的推导一致
    fn blur_sigma(&self) -> f32 {
        0.3 * ((self.blur_kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

/// 灰度图亮度统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl ImageStats {
    pub fn of(image: &GrayImage) -> Self {
        let count = (image.width() as f64) * (image.height() as f64);
        if count == 0.0 {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
            };
        }

        let sum: f64 = image.pixels().map(|p| p[0] as f64).sum();
        let mean = sum / count;
        let variance = image
            .pixels()
            .map(|p| {
                let d = p[0] as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / count;

        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

/// 预处理结果
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pub image: GrayImage,
    pub params: PreprocessParams,
    /// 各阶段的调试信息
    pub debug_info: BTreeMap<String, JsonValue>,
}

impl PreprocessedImage {
    /// 编码为 PNG 字节
    pub fn to_png(&self) -> Result<Vec<u8>, ProviderError> {
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(self.image.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| ProviderError::InvalidInput(format!("PNG 编码失败: {}", e)))?;
        Ok(bytes)
    }
}

/// 解码图片字节并执行预处理流水线
pub fn preprocess(image_bytes: &[u8]) -> Result<PreprocessedImage, ProviderError> {
    if image_bytes.is_empty() {
        return Err(ProviderError::InvalidInput("图片为空".to_string()));
    }

    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| ProviderError::InvalidInput(format!("无法解码图片: {}", e)))?;

    Ok(preprocess_gray(decoded.to_luma8()))
}

/// 对灰度图执行预处理流水线
pub fn preprocess_gray(gray: GrayImage) -> PreprocessedImage {
    let mut debug_info = BTreeMap::new();
    let stats = ImageStats::of(&gray);
    debug_info.insert("width".to_string(), json!(gray.width()));
    debug_info.insert("height".to_string(), json!(gray.height()));
    debug_info.insert("grayscale_mean".to_string(), json!(stats.mean));
    debug_info.insert("grayscale_std".to_string(), json!(stats.std_dev));

    let params = PreprocessParams::adapted_to(&stats);
    debug_info.insert(
        "threshold_block_size".to_string(),
        json!(params.threshold_block_size),
    );

    let blurred = gaussian_blur_f32(&gray, params.blur_sigma());
    debug_info.insert("blur_applied".to_string(), json!(true));

    let thresholded = adaptive_threshold_inv(&blurred, params.threshold_block_size, params.threshold_c);
    debug_info.insert("threshold_applied".to_string(), json!(true));

    let opened = morphology::open(&thresholded, Norm::LInf, params.noise_kernel / 2);
    debug_info.insert("noise_removed".to_string(), json!(true));

    let mut processed = morphology::dilate(&opened, Norm::LInf, params.dilation_kernel / 2);
    debug_info.insert("dilation_applied".to_string(), json!(true));

    // 恢复白底黑字
    image::imageops::invert(&mut processed);
    debug_info.insert("preprocessing_complete".to_string(), json!(true));

    PreprocessedImage {
        image: processed,
        params,
        debug_info,
    }
}

/// 均值自适应阈值（反色）
///
/// 像素低于邻域均值减 `c` 时视为笔迹（255），否则为背景（0）
fn adaptive_threshold_inv(image: &GrayImage, block_size: u32, c: i16) -> GrayImage {
    let radius = block_size / 2;
    let local_mean = box_filter(image, radius, radius);

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = image.get_pixel(x, y)[0] as i16;
        let threshold = local_mean.get_pixel(x, y)[0] as i16 - c;
        if pixel > threshold {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 白底上画一条黑色横线
    fn sample_page() -> GrayImage {
        GrayImage::from_fn(40, 40, |_, y| {
            if (18..22).contains(&y) {
                Luma([10u8])
            } else {
                Luma([245u8])
            }
        })
    }

    #[test]
    fn test_adapted_params() {
        let dark = ImageStats {
            mean: 80.0,
            std_dev: 60.0,
        };
        let flat = ImageStats {
            mean: 200.0,
            std_dev: 20.0,
        };
        let normal = ImageStats {
            mean: 200.0,
            std_dev: 70.0,
        };

        assert_eq!(PreprocessParams::adapted_to(&dark).threshold_block_size, 15);
        assert_eq!(PreprocessParams::adapted_to(&dark).threshold_c, 3);
        assert_eq!(PreprocessParams::adapted_to(&flat).blur_kernel, 3);
        assert_eq!(PreprocessParams::adapted_to(&flat).threshold_block_size, 13);
        assert_eq!(PreprocessParams::adapted_to(&normal), PreprocessParams::default());
    }

    #[test]
    fn test_blur_sigma_matches_kernel() {
        let params = PreprocessParams::default();
        assert!((params.blur_sigma() - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_pipeline_keeps_dark_ink_on_white_background() {
        let processed = preprocess_gray(sample_page());

        assert_eq!(processed.image.dimensions(), (40, 40));
        // 远离笔迹的背景保持白色
        assert_eq!(processed.image.get_pixel(5, 2)[0], 255);
        // 笔迹边缘被识别为黑色
        let ink_pixels = (0..40)
            .filter(|x| processed.image.get_pixel(*x, 17)[0] == 0
                || processed.image.get_pixel(*x, 18)[0] == 0)
            .count();
        assert!(ink_pixels > 0);
        assert_eq!(processed.debug_info["preprocessing_complete"], json!(true));
    }

    #[test]
    fn test_preprocess_rejects_garbage() {
        assert!(matches!(
            preprocess(b"definitely not an image"),
            Err(ProviderError::InvalidInput(_))
        ));
        assert!(matches!(preprocess(&[]), Err(ProviderError::InvalidInput(_))));
    }

    #[test]
    fn test_png_round_trip_decodes() {
        let processed = preprocess_gray(sample_page());
        let png = processed.to_png().unwrap();
        let again = preprocess(&png).unwrap();
        assert_eq!(again.image.dimensions(), (40, 40));
    }
}
