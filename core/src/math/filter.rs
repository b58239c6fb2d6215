use ndarray::{Array2, Axis};

/// Normalized Gaussian kernel of radius `round(truncate * sigma)`.
pub fn gaussian_kernel(sigma: f64, truncate: f64) -> Vec<f64> {
    let radius = (truncate * sigma + 0.5) as usize;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-0.5 * x * x / (sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= total);
    kernel
}

/// Convolve every column of `image` with a Gaussian along axis 0.
///
/// Samples beyond the edges repeat the nearest edge value.
pub fn gaussian_blur_rows(image: &mut Array2<f64>, sigma: f64, truncate: f64) {
    if sigma <= 0.0 || image.nrows() == 0 {
        return;
    }
    let kernel = gaussian_kernel(sigma, truncate);
    let radius = (kernel.len() / 2) as isize;
    let last = image.nrows() as isize - 1;
    let mut scratch = vec![0.0; image.nrows()];

    for mut column in image.axis_iter_mut(Axis(1)) {
        for (row, out) in scratch.iter_mut().enumerate() {
            *out = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    let src = (row as isize + k as isize - radius).clamp(0, last);
                    weight * column[src as usize]
                })
                .sum();
        }
        for (dst, &value) in column.iter_mut().zip(scratch.iter()) {
            *dst = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(2.0, 10.0);
        assert_eq!(kernel.len(), 41);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((kernel[0] - kernel[40]).abs() < 1e-15);
    }

    #[test]
    fn constant_columns_are_unchanged() {
        let mut image = Array2::from_elem((30, 3), 500.0);
        gaussian_blur_rows(&mut image, 2.0, 10.0);
        assert!(image.iter().all(|&v| (v - 500.0).abs() < 1e-9));
    }

    #[test]
    fn blur_spreads_along_time_only() {
        let mut image = array![[0.0, 0.0], [0.0, 0.0], [9.0, 0.0], [0.0, 0.0], [0.0, 0.0]];
        gaussian_blur_rows(&mut image, 1.0, 4.0);
        assert!(image[[1, 0]] > 0.0);
        assert!(image[[2, 0]] < 9.0);
        assert!((image[[1, 0]] - image[[3, 0]]).abs() < 1e-12);
        assert!(image.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn zero_sigma_is_identity() {
        let mut image = array![[1.0], [5.0]];
        gaussian_blur_rows(&mut image, 0.0, 10.0);
        assert_eq!(image, array![[1.0], [5.0]]);
    }
}
