/// Output dtype and device for tensors created by the samplers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    pub kind: tch::Kind,
    pub device: tch::Device,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            kind: tch::Kind::Float,
            device: tch::Device::Cpu,
        }
    }
}

impl Options {
    /// Creates options with the given kind on the CPU.
    pub fn kind(kind: tch::Kind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Returns a copy of these options placed on `device`.
    pub fn on(self, device: tch::Device) -> Self {
        Self { device, ..self }
    }

    /// Options matching an existing tensor.
    pub fn like(tensor: &tch::Tensor) -> Self {
        Self {
            kind: tensor.kind(),
            device: tensor.device(),
        }
    }

    pub(crate) fn pair(&self) -> (tch::Kind, tch::Device) {
        (self.kind, self.device)
    }
}

/// Seeds libtorch's default generator.
pub fn seed(seed: i64) {
    tracing::debug!(seed, "seeding backend generator");
    tch::manual_seed(seed);
}
