//! Common test utilities
#![allow(dead_code)]

use logcumsumexp::dtype::DType;
use logcumsumexp::runtime::Runtime;
use logcumsumexp::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
use logcumsumexp::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Create a CPU client and device for testing
pub fn create_cpu_client() -> (CpuClient, CpuDevice) {
    let device = CpuDevice::new();
    let client = CpuRuntime::default_client(&device);
    (client, device)
}

/// Seeded uniform samples in `[lo, hi)`
pub fn random_data(seed: u64, len: usize, lo: f64, hi: f64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.random_range(lo..hi)).collect()
}

/// Sequential f64 log-cumsum-exp over a row-major `[..., T, S]` buffer
///
/// Straight-line running max and rescaled sum, one time step at a time. Used
/// as ground truth for the blocked kernels.
pub fn reference_logcumsumexp(s: &[f64], shape: &[usize]) -> Vec<f64> {
    let ndim = shape.len();
    let seq_len = shape[ndim - 2];
    let width = shape[ndim - 1];
    let head = seq_len * width;
    let mut out = vec![0.0; s.len()];
    if head == 0 {
        return out;
    }

    for (src, dst) in s.chunks(head).zip(out.chunks_mut(head)) {
        for c in 0..width {
            let mut max = f64::NEG_INFINITY;
            let mut acc = 0.0;
            for t in 0..seq_len {
                let x = src[t * width + c];
                if x > max {
                    if max != f64::NEG_INFINITY {
                        acc *= (max - x).exp();
                    }
                    max = x;
                }
                if x != f64::NEG_INFINITY {
                    acc += (x - max).exp();
                }
                dst[t * width + c] = if acc == 0.0 {
                    f64::NEG_INFINITY
                } else {
                    acc.ln() + max
                };
            }
        }
    }
    out
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|. Equal infinities match.
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        if x == y {
            continue;
        }
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two f32 slices are close within tolerance
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        if x == y {
            continue;
        }
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Returns list of float dtypes to test on the CPU
pub fn supported_dtypes() -> Vec<DType> {
    let mut dtypes = vec![DType::F32, DType::F64];
    if cfg!(feature = "f16") {
        dtypes.push(DType::F16);
        dtypes.push(DType::BF16);
    }
    dtypes
}

/// Returns (rtol, atol) tolerance pair for a given dtype
pub fn tolerance_for_dtype(dtype: DType) -> (f64, f64) {
    match dtype {
        DType::F32 => (1e-5, 1e-5),
        DType::F64 => (1e-12, 1e-12),
        DType::F16 => (1e-2, 1e-2),
        DType::BF16 => (2e-2, 2e-2),
        _ => (1e-5, 1e-5),
    }
}

/// Build a tensor of `dtype` from f64 values
pub fn tensor_from_f64(
    data: &[f64],
    shape: &[usize],
    dtype: DType,
    device: &CpuDevice,
) -> Tensor<CpuRuntime> {
    match dtype {
        DType::F64 => Tensor::from_slice(data, shape, device),
        DType::F32 => {
            let v: Vec<f32> = data.iter().map(|&x| x as f32).collect();
            Tensor::from_slice(&v, shape, device)
        }
        #[cfg(feature = "f16")]
        DType::F16 => {
            let v: Vec<half::f16> = data.iter().map(|&x| half::f16::from_f64(x)).collect();
            Tensor::from_slice(&v, shape, device)
        }
        #[cfg(feature = "f16")]
        DType::BF16 => {
            let v: Vec<half::bf16> = data.iter().map(|&x| half::bf16::from_f64(x)).collect();
            Tensor::from_slice(&v, shape, device)
        }
        other => panic!("no test constructor for {other:?}"),
    }
}

/// Read any float tensor back as f64 values
pub fn tensor_to_f64(t: &Tensor<CpuRuntime>) -> Vec<f64> {
    match t.dtype() {
        DType::F64 => t.to_vec::<f64>(),
        DType::F32 => t.to_vec::<f32>().into_iter().map(f64::from).collect(),
        #[cfg(feature = "f16")]
        DType::F16 => t.to_vec::<half::f16>().into_iter().map(|x| x.to_f64()).collect(),
        #[cfg(feature = "f16")]
        DType::BF16 => t.to_vec::<half::bf16>().into_iter().map(|x| x.to_f64()).collect(),
        other => panic!("no test reader for {other:?}"),
    }
}
