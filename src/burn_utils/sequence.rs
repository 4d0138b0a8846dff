use burn::{
    nn::{Linear, LinearConfig, Relu},
    prelude::*,
};

/// Plain feed-forward stack: `Linear -> Relu` for every hidden layer, then a
/// final linear projection with no activation.
#[derive(Module, Debug)]
pub struct Sequence<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    activation: Relu,
}

impl<B: Backend> Sequence<B> {
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let mut out = input;
        for linear in &self.hidden {
            out = self.activation.forward(linear.forward(out));
        }
        self.output.forward(out)
    }

    pub fn n_hidden(&self) -> usize {
        self.hidden.len()
    }
}

pub fn build_mlp<B: Backend>(
    input_size: usize,
    output_size: usize,
    n_layers: usize,
    hidden_dim: usize,
    device: &B::Device,
) -> Sequence<B> {
    build_mlp_by_dims(input_size, output_size, &vec![hidden_dim; n_layers], device)
}

pub fn build_mlp_by_dims<B: Backend>(
    input_size: usize,
    output_size: usize,
    layer_dims: &[usize],
    device: &B::Device,
) -> Sequence<B> {
    let mut hidden = Vec::with_capacity(layer_dims.len());
    let mut in_size = input_size;
    for hidden_dim in layer_dims {
        hidden.push(LinearConfig::new(in_size, *hidden_dim).init(device));
        in_size = *hidden_dim;
    }
    Sequence {
        hidden,
        output: LinearConfig::new(in_size, output_size).init(device),
        activation: Relu::new(),
    }
}
