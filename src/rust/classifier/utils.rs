use ndarray::{Array1, ArrayView1};

pub(crate) fn normalize_vector(vec: ArrayView1<f32>) -> Array1<f32> {
    let norm: f32 = vec.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if norm > 1e-10 {
        &vec / norm
    } else {
        Array1::zeros(vec.len())
    }
}

pub(crate) fn cosine_similarity(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    normalize_vector(a).dot(&normalize_vector(b))
}

/// Returns the prefix-free form of a label coming back from the external component.
pub(crate) fn strip_label<'a>(label: &'a str, prefix: &str) -> &'a str {
    label.strip_prefix(prefix).unwrap_or(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_normalize_vector() {
        let v = array![3.0f32, 4.0];
        let n = normalize_vector(v.view());
        assert!((n[0] - 0.6).abs() < 1e-6);
        assert!((n[1] - 0.8).abs() < 1e-6);

        let zero = array![0.0f32, 0.0];
        assert_eq!(normalize_vector(zero.view()), array![0.0f32, 0.0]);
    }

    #[test]
    fn test_cosine_similarity() {
        let a = array![1.0f32, 0.0];
        let b = array![2.0f32, 0.0];
        let c = array![0.0f32, 5.0];
        assert!((cosine_similarity(a.view(), b.view()) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(a.view(), c.view()).abs() < 1e-6);
    }

    #[test]
    fn test_strip_label() {
        assert_eq!(strip_label("__label__pos", "__label__"), "pos");
        assert_eq!(strip_label("pos", "__label__"), "pos");
    }
}
