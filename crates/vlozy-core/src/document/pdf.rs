//! PDF rasterization using MuPDF.

use image::RgbImage;
use mupdf::{Colorspace, Document, Matrix};
use tracing::debug;

use crate::error::DocumentError;

impl From<mupdf::Error> for DocumentError {
    fn from(err: mupdf::Error) -> Self {
        DocumentError::Pdf(err.to_string())
    }
}

/// Render the first page of a PDF to an RGB image.
///
/// Pages after the first are ignored.
pub fn rasterize_first_page(bytes: &[u8], scale: f32) -> Result<RgbImage, DocumentError> {
    let doc = Document::from_bytes(bytes, "application/pdf")?;

    let page_count = doc.page_count()?;
    if page_count <= 0 {
        return Err(DocumentError::NoPages);
    }
    if page_count > 1 {
        debug!("PDF has {} pages, rendering only the first", page_count);
    }

    let page = doc.load_page(0)?;
    let matrix = Matrix::new_scale(scale, scale);
    let pixmap = page.to_pixmap(&matrix, &Colorspace::device_rgb(), false, true)?;

    pixmap_to_rgb(&pixmap)
}

fn pixmap_to_rgb(pixmap: &mupdf::Pixmap) -> Result<RgbImage, DocumentError> {
    let stride = usize::try_from(pixmap.stride())
        .map_err(|_| DocumentError::Pdf("pixmap has a negative stride".to_string()))?;
    samples_to_rgb(
        pixmap.samples(),
        pixmap.width(),
        pixmap.height(),
        pixmap.n() as usize,
        stride,
    )
}

/// Copy the first three components of every pixel, honoring row padding.
///
/// Single-component samples are expanded to gray.
fn samples_to_rgb(
    samples: &[u8],
    width: u32,
    height: u32,
    n: usize,
    stride: usize,
) -> Result<RgbImage, DocumentError> {
    if width == 0 || height == 0 || n == 0 {
        return Err(DocumentError::Pdf(format!(
            "page rendered to an empty {}x{} pixmap",
            width, height
        )));
    }
    if stride < width as usize * n || samples.len() < stride * (height as usize - 1) + width as usize * n {
        return Err(DocumentError::Pdf(format!(
            "pixmap samples too short for {}x{} with stride {}",
            width, height, stride
        )));
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for row in samples.chunks(stride).take(height as usize) {
        for pixel in row[..width as usize * n].chunks_exact(n) {
            match pixel {
                [r, g, b, ..] => rgb.extend_from_slice(&[*r, *g, *b]),
                [gray, ..] => rgb.extend_from_slice(&[*gray, *gray, *gray]),
                [] => {}
            }
        }
    }

    debug!("Rasterized PDF page to {}x{}", width, height);

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| DocumentError::Pdf("failed to create image buffer".to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgb;

    /// Two pages: a 200x100 first page whose top-left quadrant is filled
    /// black, and a larger blank 300x400 second page.
    pub(crate) fn two_page_pdf() -> Vec<u8> {
        let content = "0 0 0 rg 0 50 100 50 re f";
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 2 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] /Contents 4 0 R >>".to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 400] >>".to_string(),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }

        let xref = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        let err = rasterize_first_page(b"definitely not a pdf", 1.0).unwrap_err();
        assert!(matches!(err, DocumentError::Pdf(_) | DocumentError::NoPages));
    }

    #[test]
    fn test_first_page_rendered_at_media_box_size() {
        let image = rasterize_first_page(&two_page_pdf(), 1.0).unwrap();

        assert_eq!(image.dimensions(), (200, 100));
        let ink = image.get_pixel(10, 10);
        assert!(ink.0.iter().all(|c| *c < 64), "expected black, got {:?}", ink);
        assert_eq!(image.get_pixel(150, 80), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_scale_multiplies_page_size() {
        let image = rasterize_first_page(&two_page_pdf(), 2.0).unwrap();
        assert_eq!(image.dimensions(), (400, 200));
    }

    #[test]
    fn test_row_padding_skipped() {
        // 2x2 RGBA with 3 padding bytes per row.
        let samples = [
            1, 2, 3, 255, 4, 5, 6, 255, 0, 0, 0, //
            7, 8, 9, 255, 10, 11, 12, 255, 0, 0, 0,
        ];
        let image = samples_to_rgb(&samples, 2, 2, 4, 11).unwrap();

        assert_eq!(image.get_pixel(1, 0), &Rgb([4, 5, 6]));
        assert_eq!(image.get_pixel(0, 1), &Rgb([7, 8, 9]));
        assert_eq!(image.get_pixel(1, 1), &Rgb([10, 11, 12]));
    }

    #[test]
    fn test_gray_samples_expanded() {
        let image = samples_to_rgb(&[40, 200], 2, 1, 1, 2).unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgb([40, 40, 40]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_short_samples_rejected() {
        assert!(samples_to_rgb(&[0; 5], 2, 1, 3, 6).is_err());
    }
}
