//! Single-point heatmap reconstruction.
//!
//! Each coordinate becomes a HEATMAP_SIZE x HEATMAP_SIZE image with value
//! 1 at the rounded pixel and 0 elsewhere, then both true and predicted
//! images receive the same Gaussian smoothing before image metrics are
//! computed. Coordinates outside the grid clamp to the border pixel.

use ndarray::Array2;

use sourcenet_core::{SourcePosition, HEATMAP_SIZE};

/// Render the one-hot heatmap for a physical coordinate.
pub fn render_point_heatmap(pos: &SourcePosition) -> Array2<f32> {
    let mut img = Array2::zeros((HEATMAP_SIZE, HEATMAP_SIZE));
    let col = clamp_to_grid(pos.x);
    let row = clamp_to_grid(pos.y);
    img[[row, col]] = 1.0;
    img
}

fn clamp_to_grid(v: f64) -> usize {
    (v.round().max(0.0) as usize).min(HEATMAP_SIZE - 1)
}

/// Separable Gaussian smoothing with kernel radius 3*sigma; pixels
/// outside the image contribute zero.
pub fn gaussian_blur(img: &Array2<f32>, sigma: f64) -> Array2<f32> {
    let kernel = gaussian_kernel(sigma);
    let horizontal = convolve_rows(img, &kernel);
    convolve_rows(&horizontal.t().to_owned(), &kernel)
        .t()
        .to_owned()
}

fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil() as i64;
    let mut kernel = Vec::with_capacity((2 * radius + 1) as usize);
    let mut sum = 0.0f64;
    for i in -radius..=radius {
        let v = (-(i as f64).powi(2) / (2.0 * sigma * sigma)).exp();
        kernel.push(v);
        sum += v;
    }
    kernel.into_iter().map(|v| (v / sum) as f32).collect()
}

fn convolve_rows(img: &Array2<f32>, kernel: &[f32]) -> Array2<f32> {
    let (rows, cols) = img.dim();
    let radius = (kernel.len() / 2) as i64;
    let mut out = Array2::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let mut acc = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let src = c as i64 + k as i64 - radius;
                if src >= 0 && (src as usize) < cols {
                    acc += w * img[[r, src as usize]];
                }
            }
            out[[r, c]] = acc;
        }
    }
    out
}
