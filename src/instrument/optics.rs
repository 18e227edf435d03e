//! # 中子光学换算
//!
//! 装配期用到的少量解析关系：波长 -> 波矢，Bragg 条件
//! 推导单色器/分析器转角。
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs`, `commands/run.rs` 使用

use crate::error::{BeamflowError, Result};
use std::f64::consts::PI;

/// 波矢大小 k = 2π/λ (Å⁻¹)
pub fn wavevector(wavelength_angstrom: f64) -> f64 {
    2.0 * PI / wavelength_angstrom
}

/// 由散射矢量大小与波长推导 Bragg 转角（度）
///
/// θ = arcsin(Q / 2k)，k = 2π/λ。|Q/2k| > 1 时 Bragg 条件
/// 在该波长下无解，显式报错。
pub fn bragg_angle_deg(q_inv_angstrom: f64, wavelength_angstrom: f64) -> Result<f64> {
    let k = wavevector(wavelength_angstrom);
    let ratio = q_inv_angstrom / (2.0 * k);

    if ratio.abs() > 1.0 {
        return Err(BeamflowError::BraggUnreachable { ratio });
    }

    Ok(ratio.asin().to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wavevector() {
        // λ = 1.2 Å -> k ≈ 5.236 Å⁻¹
        let k = wavevector(1.2);
        assert!((k - 5.235987755982988).abs() < 1e-12);
    }

    #[test]
    fn test_bragg_angle_literal_case() {
        // λ = 1.2 Å, Q = 3.355 Å⁻¹ -> k ≈ 5.236 Å⁻¹, θ ≈ 18.7°
        let theta = bragg_angle_deg(3.355, 1.2).unwrap();
        let expected = (3.355f64 / (2.0 * 2.0 * PI / 1.2)).asin().to_degrees();
        assert!((theta - expected).abs() < 1e-12);
        assert!((theta - 18.686).abs() < 0.01);
    }

    #[test]
    fn test_bragg_unreachable() {
        // Q/2k > 1：该波长无法满足 Bragg 条件
        let result = bragg_angle_deg(12.0, 1.2);
        assert!(matches!(
            result,
            Err(BeamflowError::BraggUnreachable { .. })
        ));
    }

    #[test]
    fn test_bragg_zero_q() {
        let theta = bragg_angle_deg(0.0, 1.8).unwrap();
        assert!(theta.abs() < 1e-12);
    }
}
