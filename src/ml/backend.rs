// ============================================================
// Layer 5 - Backend Selection
// ============================================================
// Which Burn backend runs the tensors. Training wraps the
// chosen backend in Autodiff; validation and inference use it
// directly.
//
//   wgpu    - GPU through WebGPU (default)
//   ndarray - CPU, always available

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub type WgpuBackend    = burn::backend::Wgpu;
pub type NdArrayBackend = burn::backend::NdArray<f32>;

pub type WgpuTrainBackend    = burn::backend::Autodiff<WgpuBackend>;
pub type NdArrayTrainBackend = burn::backend::Autodiff<NdArrayBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Wgpu,
    NdArray,
}

impl BackendKind {
    /// Name used on the command line and in saved configs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Wgpu    => "wgpu",
            Self::NdArray => "ndarray",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wgpu" | "gpu"    => Ok(Self::Wgpu),
            "ndarray" | "cpu" => Ok(Self::NdArray),
            other => Err(format!("unknown backend '{other}' (expected wgpu or ndarray)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!("wgpu".parse::<BackendKind>(), Ok(BackendKind::Wgpu));
        assert_eq!("CPU".parse::<BackendKind>(), Ok(BackendKind::NdArray));
        assert!("cuda".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&BackendKind::NdArray).unwrap(), "\"ndarray\"");
        let back: BackendKind = serde_json::from_str("\"wgpu\"").unwrap();
        assert_eq!(back, BackendKind::Wgpu);
    }
}
