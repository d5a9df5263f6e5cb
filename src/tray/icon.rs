//! Icon bitmaps and their conversion to the status bar's pixel layout.
//!
//! Sources are rasterized, composited into an interleaved ABGR buffer the way
//! a 4-byte ABGR canvas receives a straight copy, then reordered in place to
//! RGBA, which is what the status bar consumes.

use crate::error::ConversionError;
use image::{imageops, DynamicImage, RgbaImage};
use std::path::Path;

/// Height of the status bar in points; auto-sized icons are scaled to fit it.
pub const STATUS_BAR_ICON_SIZE: u32 = 22;

const BITS_PER_SAMPLE: u32 = 8;
const SAMPLES_PER_PIXEL: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLayout {
    Abgr8,
    Argb8,
    Rgba8,
    Bgra8,
    Rgb8,
    Bgr8,
    Gray8,
    GrayAlpha8,
}

impl SampleLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            SampleLayout::Abgr8
            | SampleLayout::Argb8
            | SampleLayout::Rgba8
            | SampleLayout::Bgra8 => 4,
            SampleLayout::Rgb8 | SampleLayout::Bgr8 => 3,
            SampleLayout::GrayAlpha8 => 2,
            SampleLayout::Gray8 => 1,
        }
    }

    /// Returns one pixel as `[a, b, g, r]`.
    fn to_abgr(self, px: &[u8]) -> [u8; 4] {
        match self {
            SampleLayout::Abgr8 => [px[0], px[1], px[2], px[3]],
            SampleLayout::Argb8 => [px[0], px[3], px[2], px[1]],
            SampleLayout::Rgba8 => [px[3], px[2], px[1], px[0]],
            SampleLayout::Bgra8 => [px[3], px[0], px[1], px[2]],
            SampleLayout::Rgb8 => [u8::MAX, px[2], px[1], px[0]],
            SampleLayout::Bgr8 => [u8::MAX, px[0], px[1], px[2]],
            SampleLayout::GrayAlpha8 => [px[1], px[0], px[0], px[0]],
            SampleLayout::Gray8 => [u8::MAX, px[0], px[0], px[0]],
        }
    }
}

/// A rasterized bitmap in some interleaved 8-bit layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub layout: SampleLayout,
    pub data: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32, layout: SampleLayout, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            layout,
            data,
        }
    }

    fn pixel_count(&self) -> Result<usize, ConversionError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConversionError::Empty {
                width: self.width,
                height: self.height,
            });
        }
        (self.width as usize)
            .checked_mul(self.height as usize)
            .filter(|n| n.checked_mul(SAMPLES_PER_PIXEL as usize).is_some())
            .ok_or(ConversionError::TooLarge {
                width: self.width,
                height: self.height,
            })
    }
}

/// Anything that can hand the converter a raster of itself.
pub trait Rasterize: Send + Sync {
    fn rasterize(&self) -> Result<Raster, ConversionError>;
}

impl Rasterize for Raster {
    fn rasterize(&self) -> Result<Raster, ConversionError> {
        Ok(self.clone())
    }
}

impl Rasterize for DynamicImage {
    fn rasterize(&self) -> Result<Raster, ConversionError> {
        let (width, height) = (self.width(), self.height());
        let raster = match self {
            DynamicImage::ImageLuma8(img) => {
                Raster::new(width, height, SampleLayout::Gray8, img.as_raw().clone())
            }
            DynamicImage::ImageLumaA8(img) => {
                Raster::new(width, height, SampleLayout::GrayAlpha8, img.as_raw().clone())
            }
            DynamicImage::ImageRgb8(img) => {
                Raster::new(width, height, SampleLayout::Rgb8, img.as_raw().clone())
            }
            DynamicImage::ImageRgba8(img) => {
                Raster::new(width, height, SampleLayout::Rgba8, img.as_raw().clone())
            }
            other => Raster::new(width, height, SampleLayout::Rgba8, other.to_rgba8().into_raw()),
        };
        Ok(raster)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    CalibratedRgb,
    DeviceRgb,
}

/// Pixel data plus the layout parameters the status bar's image API takes.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: u32,
    pub samples_per_pixel: u32,
    pub has_alpha: bool,
    pub is_planar: bool,
    pub color_space: ColorSpace,
    pub bytes_per_row: u32,
    pub bits_per_pixel: u32,
    pub is_template: bool,
}

impl NativeImage {
    fn from_rgba(width: u32, height: u32, data: Vec<u8>, is_template: bool) -> Self {
        Self {
            data,
            width,
            height,
            bits_per_sample: BITS_PER_SAMPLE,
            samples_per_pixel: SAMPLES_PER_PIXEL,
            has_alpha: true,
            is_planar: false,
            color_space: ColorSpace::CalibratedRgb,
            bytes_per_row: width * SAMPLES_PER_PIXEL,
            bits_per_pixel: SAMPLES_PER_PIXEL * BITS_PER_SAMPLE,
            is_template,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IconOptions {
    /// Hints monochrome rendering that adapts to the bar's appearance.
    pub is_template: bool,
    pub auto_size: bool,
}

pub fn convert(source: &dyn Rasterize, options: IconOptions) -> Result<NativeImage, ConversionError> {
    let raster = source.rasterize()?;
    let mut pixels = composite_abgr(&raster)?;
    abgr_to_rgba(&mut pixels);
    let image = NativeImage::from_rgba(raster.width, raster.height, pixels, options.is_template);

    if options.auto_size && image.height != STATUS_BAR_ICON_SIZE {
        return scale_to_status_bar(image);
    }
    Ok(image)
}

/// Copies `raster` onto a fresh ABGR canvas, replacing destination pixels
/// including their alpha.
pub fn composite_abgr(raster: &Raster) -> Result<Vec<u8>, ConversionError> {
    let pixels = raster.pixel_count()?;
    let stride = raster.layout.bytes_per_pixel();
    let expected = pixels * stride;
    if raster.data.len() != expected {
        return Err(ConversionError::BufferSize {
            expected,
            actual: raster.data.len(),
        });
    }

    let mut out = Vec::with_capacity(pixels * SAMPLES_PER_PIXEL as usize);
    for px in raster.data.chunks_exact(stride) {
        out.extend_from_slice(&raster.layout.to_abgr(px));
    }
    Ok(out)
}

/// Reorders each `[a, b, g, r]` group to `[r, g, b, a]` in place.
pub fn abgr_to_rgba(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.reverse();
    }
}

fn scale_to_status_bar(image: NativeImage) -> Result<NativeImage, ConversionError> {
    let target_height = STATUS_BAR_ICON_SIZE;
    let target_width = ((image.width as u64 * target_height as u64) / image.height as u64).max(1) as u32;
    let actual = image.data.len();

    let rgba = RgbaImage::from_raw(image.width, image.height, image.data).ok_or(
        ConversionError::BufferSize {
            expected: image.bytes_per_row as usize * image.height as usize,
            actual,
        },
    )?;
    let scaled = imageops::resize(&rgba, target_width, target_height, imageops::FilterType::Lanczos3);

    Ok(NativeImage::from_rgba(
        target_width,
        target_height,
        scaled.into_raw(),
        image.is_template,
    ))
}

pub fn load(path: &Path) -> Result<DynamicImage, ConversionError> {
    log::debug!("Loading icon from {}", path.display());
    Ok(image::open(path)?)
}

/// A filled orange dot on a transparent square, used when no icon is configured.
pub fn placeholder(size: u32) -> Raster {
    let mut data = vec![0u8; (size * size * 4) as usize];
    let dot_radius = (size as i32) / 2 - 2;
    let center = (size as i32) / 2;

    for y in 0..size as i32 {
        for x in 0..size as i32 {
            let dx = x - center;
            let dy = y - center;

            if dx * dx + dy * dy <= dot_radius * dot_radius {
                let idx = ((y as u32 * size + x as u32) * 4) as usize;
                data[idx] = 230;
                data[idx + 1] = 150;
                data[idx + 2] = 0;
                data[idx + 3] = 255;
            }
        }
    }

    Raster::new(size, size, SampleLayout::Rgba8, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unrasterizable;

    impl Rasterize for Unrasterizable {
        fn rasterize(&self) -> Result<Raster, ConversionError> {
            Err(ConversionError::UnsupportedColorModel("indexed".into()))
        }
    }

    #[test]
    fn abgr_pixels_come_out_as_rgba() {
        let abgr = vec![
            0xA0, 0xB0, 0xC0, 0xD0, //
            0xA1, 0xB1, 0xC1, 0xD1, //
            0xA2, 0xB2, 0xC2, 0xD2, //
            0xA3, 0xB3, 0xC3, 0xD3,
        ];
        let raster = Raster::new(2, 2, SampleLayout::Abgr8, abgr);

        let image = convert(&raster, IconOptions::default()).unwrap();

        assert_eq!(
            image.data,
            vec![
                0xD0, 0xC0, 0xB0, 0xA0, //
                0xD1, 0xC1, 0xB1, 0xA1, //
                0xD2, 0xC2, 0xB2, 0xA2, //
                0xD3, 0xC3, 0xB3, 0xA3,
            ]
        );
        assert_eq!(image.bytes_per_row, 8);
        assert_eq!(image.bits_per_pixel, 32);
    }

    #[test]
    fn output_parameters_are_fixed() {
        let raster = Raster::new(3, 1, SampleLayout::Rgb8, vec![0; 9]);

        let image = convert(
            &raster,
            IconOptions {
                is_template: true,
                auto_size: false,
            },
        )
        .unwrap();

        assert_eq!((image.width, image.height), (3, 1));
        assert_eq!(image.bits_per_sample, 8);
        assert_eq!(image.samples_per_pixel, 4);
        assert!(image.has_alpha);
        assert!(!image.is_planar);
        assert_eq!(image.color_space, ColorSpace::CalibratedRgb);
        assert_eq!(image.bytes_per_row, 12);
        assert!(image.is_template);
    }

    #[test]
    fn every_layout_lands_on_the_same_rgba_pixel() {
        let cases: Vec<(SampleLayout, Vec<u8>, [u8; 4])> = vec![
            (SampleLayout::Abgr8, vec![40, 30, 20, 10], [10, 20, 30, 40]),
            (SampleLayout::Argb8, vec![40, 10, 20, 30], [10, 20, 30, 40]),
            (SampleLayout::Rgba8, vec![10, 20, 30, 40], [10, 20, 30, 40]),
            (SampleLayout::Bgra8, vec![30, 20, 10, 40], [10, 20, 30, 40]),
            (SampleLayout::Rgb8, vec![10, 20, 30], [10, 20, 30, 255]),
            (SampleLayout::Bgr8, vec![30, 20, 10], [10, 20, 30, 255]),
            (SampleLayout::GrayAlpha8, vec![7, 40], [7, 7, 7, 40]),
            (SampleLayout::Gray8, vec![7], [7, 7, 7, 255]),
        ];

        for (layout, px, expected) in cases {
            let raster = Raster::new(1, 1, layout, px);
            let image = convert(&raster, IconOptions::default()).unwrap();
            assert_eq!(image.data, expected.to_vec(), "{:?}", layout);
        }
    }

    #[test]
    fn malformed_rasters_are_rejected() {
        let cases: Vec<(Raster, &str)> = vec![
            (Raster::new(0, 4, SampleLayout::Rgba8, vec![]), "empty"),
            (Raster::new(2, 2, SampleLayout::Rgba8, vec![0; 15]), "short"),
            (Raster::new(1, 1, SampleLayout::Rgb8, vec![0; 4]), "long"),
        ];

        for (raster, name) in cases {
            assert!(convert(&raster, IconOptions::default()).is_err(), "{}", name);
        }
    }

    #[test]
    fn rasterize_failure_is_reported() {
        let result = convert(&Unrasterizable, IconOptions::default());
        assert!(matches!(result, Err(ConversionError::UnsupportedColorModel(_))));
    }

    #[test]
    fn auto_size_scales_to_status_bar_height() {
        let raster = placeholder(64);

        let image = convert(
            &raster,
            IconOptions {
                is_template: false,
                auto_size: true,
            },
        )
        .unwrap();

        assert_eq!((image.width, image.height), (22, 22));
        assert_eq!(image.data.len(), 22 * 22 * 4);
        assert_eq!(image.bytes_per_row, 88);
    }

    #[test]
    fn dynamic_images_rasterize_with_their_layout() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(2, 1, image::Rgb([1, 2, 3])));

        let raster = img.rasterize().unwrap();

        assert_eq!(raster.layout, SampleLayout::Rgb8);
        assert_eq!(raster.data, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn placeholder_has_opaque_center_and_clear_corner() {
        let raster = placeholder(16);
        let center = ((8 * 16 + 8) * 4) as usize;

        assert_eq!(raster.data[center + 3], 255);
        assert_eq!(raster.data[3], 0);
    }
}
