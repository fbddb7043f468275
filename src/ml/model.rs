use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

/// Logits from a classifier forward pass.
///
/// `aux_logits` is the optional second head; the training loop adds its
/// cross-entropy scaled by the configured auxiliary weight.
pub struct ClassifierOutput<B: Backend> {
    pub logits:     Tensor<B, 2>,
    pub aux_logits: Option<Tensor<B, 2>>,
}

/// Anything that maps `[batch, features]` to `[batch, classes]` logits.
///
/// Object safe, so a distillation teacher of any architecture can be
/// passed as `&dyn Classifier<_>`.
pub trait Classifier<B: Backend> {
    fn classify(&self, inputs: Tensor<B, 2>) -> ClassifierOutput<B>;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct MlpClassifierConfig {
    pub input_size:   usize,
    pub hidden_sizes: Vec<usize>,
    pub num_classes:  usize,
    #[config(default = 0.0)]
    pub dropout:      f64,
    #[config(default = false)]
    pub aux_head:     bool,
}

impl MlpClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MlpClassifier<B> {
        let mut width  = self.input_size;
        let mut hidden = Vec::with_capacity(self.hidden_sizes.len());
        for &size in &self.hidden_sizes {
            hidden.push(LinearConfig::new(width, size).init(device));
            width = size;
        }
        let head = LinearConfig::new(width, self.num_classes).init(device);
        let aux  = self
            .aux_head
            .then(|| LinearConfig::new(width, self.num_classes).init(device));
        let dropout = DropoutConfig::new(self.dropout).init();
        MlpClassifier { hidden, head, aux, dropout }
    }
}

/// Fully connected classifier: (Linear → ReLU → Dropout)* → Linear.
#[derive(Module, Debug)]
pub struct MlpClassifier<B: Backend> {
    pub hidden:  Vec<Linear<B>>,
    pub head:    Linear<B>,
    pub aux:     Option<Linear<B>>,
    pub dropout: Dropout,
}

impl<B: Backend> MlpClassifier<B> {
    /// inputs: [batch, input_size] → logits: [batch, num_classes]
    pub fn forward(&self, inputs: Tensor<B, 2>) -> ClassifierOutput<B> {
        let mut x = inputs;
        for layer in &self.hidden {
            x = self.dropout.forward(relu(layer.forward(x)));
        }
        let aux_logits = self.aux.as_ref().map(|aux| aux.forward(x.clone()));
        let logits     = self.head.forward(x);
        ClassifierOutput { logits, aux_logits }
    }
}

impl<B: Backend> Classifier<B> for MlpClassifier<B> {
    fn classify(&self, inputs: Tensor<B, 2>) -> ClassifierOutput<B> {
        self.forward(inputs)
    }
}
