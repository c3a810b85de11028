// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::PcrError;

/// The three regularisation weights of the labeling energy. A zero weight
/// disables the corresponding term.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Lambdas {
    pub data: f64,
    pub smooth: f64,
    pub prior: f64,
}

impl Lambdas {
    pub fn new(data: f64, smooth: f64, prior: f64) -> Result<Self, PcrError> {
        let lambdas = Self {
            data,
            smooth,
            prior,
        };
        lambdas.validate()?;
        Ok(lambdas)
    }

    /// Inverts the CLI-facing `rho` parameters: `lambda = 1/rho` for
    /// non-zero `rho`, zero otherwise.
    pub fn from_rhos(rho_d: f64, rho_s: f64, rho_p: f64) -> Result<Self, PcrError> {
        let invert = |rho: f64| if rho != 0.0 { 1.0 / rho } else { 0.0 };
        Self::new(invert(rho_d), invert(rho_s), invert(rho_p))
    }

    fn validate(&self) -> Result<(), PcrError> {
        for (name, value) in [
            ("data", self.data),
            ("smooth", self.smooth),
            ("prior", self.prior),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PcrError::invalid_input(format!(
                    "lambda weight '{name}' must be finite and >= 0.0; got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Lambdas;

    #[test]
    fn from_rhos_inverts_non_zero_weights() {
        let lambdas = Lambdas::from_rhos(100.0, 10.0, 0.0).expect("rhos are valid");
        assert!((lambdas.data - 0.01).abs() < 1e-15);
        assert!((lambdas.smooth - 0.1).abs() < 1e-15);
        assert_eq!(lambdas.prior, 0.0);
    }

    #[test]
    fn negative_rho_is_rejected() {
        assert!(Lambdas::from_rhos(-4.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn non_finite_weight_is_rejected() {
        assert!(Lambdas::new(f64::NAN, 0.0, 0.0).is_err());
        assert!(Lambdas::new(0.0, f64::INFINITY, 0.0).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn lambdas_serde_roundtrip() {
        let lambdas = Lambdas::new(0.01, 0.1, 0.0).expect("weights are valid");
        let encoded = serde_json::to_string(&lambdas).expect("lambdas should serialize");
        let decoded: Lambdas = serde_json::from_str(&encoded).expect("lambdas should deserialize");
        assert_eq!(decoded, lambdas);
    }
}
