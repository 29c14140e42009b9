use crate::TnError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, TnError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TnError::NonFinite { what, value: v })
    }
}

/// Fail fast when a caller-owned vector has the wrong length.
pub fn ensure_len(values: &[Real], expected: usize, what: &'static str) -> Result<(), TnError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(TnError::LengthMismatch {
            what,
            expected,
            actual: values.len(),
        })
    }
}

/// Max-norm; 0 for an empty slice, NaN if any entry is NaN.
pub fn norm_inf(values: &[Real]) -> Real {
    values
        .iter()
        .map(|v| v.abs())
        .fold(0.0, |acc, v| if v > acc || v.is_nan() { v } else { acc })
}

pub fn dot(a: &[Real], b: &[Real]) -> Real {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
        assert_eq!(ensure_finite(-2.5, "test"), Ok(-2.5));
    }

    #[test]
    fn ensure_len_reports_both_lengths() {
        let err = ensure_len(&[1.0, 2.0], 3, "control").unwrap_err();
        assert_eq!(
            err,
            TnError::LengthMismatch {
                what: "control",
                expected: 3,
                actual: 2
            }
        );
        assert!(ensure_len(&[1.0, 2.0, 3.0], 3, "control").is_ok());
    }

    #[test]
    fn norms() {
        assert_eq!(norm_inf(&[]), 0.0);
        assert_eq!(norm_inf(&[1.0, -4.0, 2.0]), 4.0);
        assert_eq!(dot(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
        // NaN must not hide behind a larger finite entry
        assert!(norm_inf(&[5.0, Real::NAN, 1.0]).is_nan());
        assert!(norm_inf(&[Real::NAN, 5.0]).is_nan());
        assert_eq!(norm_inf(&[Real::NEG_INFINITY]), Real::INFINITY);
    }
}
