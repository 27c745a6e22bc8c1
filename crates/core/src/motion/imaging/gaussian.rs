use ndarray::Array2;

/// Sigma derived from kernel size the way OpenCV does when sigma is 0.
pub fn sigma_for_kernel(kernel_size: usize) -> f64 {
    0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Precompute a normalized 1D Gaussian kernel of the given size.
///
/// `kernel_size` must be odd and >= 1.
pub fn gaussian_kernel_1d(kernel_size: usize) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    if kernel_size == 1 {
        return vec![1.0];
    }
    let sigma = sigma_for_kernel(kernel_size);
    let half = (kernel_size / 2) as f64;
    let mut kernel: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel.iter().map(|&v| v as f32).collect()
}

/// Separable Gaussian blur of a grayscale plane. Borders are mirrored
/// without repeating the edge pixel (`dcb|abcd|cba`), matching OpenCV's
/// default `BORDER_REFLECT_101`.
///
/// `temp` is a scratch buffer reused across frames.
pub fn gaussian_blur(src: &Array2<u8>, kernel: &[f32], temp: &mut Vec<f32>) -> Array2<u8> {
    let (height, width) = src.dim();
    if kernel.len() <= 1 || width == 0 || height == 0 {
        return src.clone();
    }
    let half = (kernel.len() / 2) as isize;
    temp.clear();
    temp.resize(width * height, 0.0);

    // Horizontal pass: src -> temp
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - half, width);
                sum += src[[y, sx]] as f32 * w;
            }
            temp[y * width + x] = sum;
        }
    }

    // Vertical pass: temp -> dst
    let mut dst = Array2::<u8>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + k as isize - half, height);
                sum += temp[sy * width + x] * w;
            }
            dst[[y, x]] = sum.round().clamp(0.0, 255.0) as u8;
        }
    }
    dst
}

/// Maps an out-of-range index back into `0..len` by mirroring about the
/// edge pixels. Repeats until in range so kernels wider than the plane work.
fn reflect_101(mut i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as usize
}
