//! 元画像の最適化（向き補正・RGB化・縮小・JPEG再エンコード）

use crate::error::{GallerySyncError, Result};
use crate::scanner::exif;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// 画像最適化の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    /// 長辺の最大ピクセル数
    pub max_dimension: u32,
    /// JPEG品質 (1-100)
    pub quality: u8,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1600,
            quality: 85,
        }
    }
}

/// エンコード済みの画像
#[derive(Debug, Clone)]
pub struct OptimizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// EXIF の向きに合わせて画像を回転・反転
fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// 縮小後のサイズ（長辺が上限以下なら元のまま）
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }

    let ratio = max_dimension as f64 / longest as f64;
    let w = ((width as f64 * ratio) as u32).max(1);
    let h = ((height as f64 * ratio) as u32).max(1);
    (w, h)
}

/// 元画像を読み込み、最適化した JPEG をメモリ上に生成
pub fn encode_optimized(src: &Path, options: &ImageOptions) -> Result<OptimizedImage> {
    let bytes = std::fs::read(src)
        .map_err(|e| GallerySyncError::ImageLoad(format!("{}: {}", src.display(), e)))?;

    let decoded = ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .map_err(|e| GallerySyncError::ImageLoad(format!("{}: {}", src.display(), e)))?
        .decode()
        .map_err(|e| GallerySyncError::ImageLoad(format!("{}: {}", src.display(), e)))?;

    let oriented = match exif::read_orientation(&bytes) {
        Some(orientation) => apply_orientation(decoded, orientation),
        None => decoded,
    };

    // JPEG はアルファ・パレットを持てないので RGB8 に揃える
    let rgb = oriented.to_rgb8();
    let (width, height) = fit_within(rgb.width(), rgb.height(), options.max_dimension);
    let rgb = if (width, height) != rgb.dimensions() {
        image::imageops::resize(&rgb, width, height, FilterType::Lanczos3)
    } else {
        rgb
    };

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, options.quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| GallerySyncError::ImageEncode(format!("{}: {}", src.display(), e)))?;

    Ok(OptimizedImage {
        bytes: out,
        width,
        height,
    })
}

/// エンコード済み画像を書き出す
pub fn write_optimized(image: &OptimizedImage, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dst, &image.bytes)
        .map_err(|e| GallerySyncError::ImageEncode(format!("{}: {}", dst.display(), e)))
}

/// 元画像1枚を取り込む
///
/// エンコードに成功してから書き出すため、失敗時に途中のファイルは残らない。
/// 戻り値は書き出した画像のサイズ。
pub fn ingest_image(src: &Path, dst: &Path, options: &ImageOptions) -> Result<(u32, u32)> {
    let optimized = encode_optimized(src, options)?;
    write_optimized(&optimized, dst)?;
    Ok((optimized.width, optimized.height))
}
