use anyhow::{ensure, Result};
use burn::{
    nn::{loss::CrossEntropyLossConfig, Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct PointCloudClassifierConfig {
    /// Points per cloud; the input width is num_points * 3
    pub num_points:   usize,
    pub num_classes:  usize,
    /// Width of each hidden layer. Empty = a single linear layer.
    pub hidden_sizes: Vec<usize>,
    #[config(default = 0.3)]
    pub dropout:      f64,
}

impl PointCloudClassifierConfig {
    /// Width of the flattened input: num_points * 3.
    pub fn input_dim(&self) -> usize {
        self.num_points * 3
    }

    /// Build the network with fresh weights on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> PointCloudClassifier<B> {
        let mut d_in   = self.input_dim();
        let mut hidden = Vec::with_capacity(self.hidden_sizes.len());
        for &d_out in &self.hidden_sizes {
            hidden.push(LinearConfig::new(d_in, d_out).init(device));
            d_in = d_out;
        }
        let output  = LinearConfig::new(d_in, self.num_classes).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        PointCloudClassifier { hidden, output, dropout }
    }
}

/// Feed-forward classifier over a flattened point cloud:
/// [Linear -> ReLU -> Dropout]* -> Linear -> logits.
#[derive(Module, Debug)]
pub struct PointCloudClassifier<B: Backend> {
    pub hidden:  Vec<Linear<B>>,
    pub output:  Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> PointCloudClassifier<B> {
    /// points: [batch, num_points * 3] -> logits: [batch, num_classes]
    pub fn forward(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = points;
        for layer in &self.hidden {
            x = self.dropout.forward(relu(layer.forward(x)));
        }
        self.output.forward(x)
    }

    /// [d_in, d_out] of every linear layer, output layer last.
    pub fn layer_shapes(&self) -> Vec<[usize; 2]> {
        self.hidden
            .iter()
            .chain(std::iter::once(&self.output))
            .map(|layer| layer.weight.val().dims())
            .collect()
    }

    /// Load a record and make sure its layers have the shapes this
    /// model was built with. Burn takes the record's tensors as they
    /// are, so weights saved for another architecture would only fail
    /// later, inside the first forward pass.
    pub fn load_record_checked(self, record: PointCloudClassifierRecord<B>) -> Result<Self> {
        // Vec<Linear> asserts on a length mismatch while loading
        ensure!(
            record.hidden.len() == self.hidden.len(),
            "Saved weights have {} hidden layers, but the configuration builds {}",
            record.hidden.len(),
            self.hidden.len(),
        );
        let expected = self.layer_shapes();
        let loaded   = self.load_record(record);
        let found    = loaded.layer_shapes();
        ensure!(
            found == expected,
            "Saved weights have layer shapes {:?}, but the configuration builds {:?}",
            found,
            expected,
        );
        Ok(loaded)
    }

    /// Cross-entropy over class logits. Returns (loss, logits).
    pub fn forward_loss(
        &self,
        points:  Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(points);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }
}
