//! Feed-forward intent network.
//!
//! A stack of dense layers: ReLU hidden layers with inverted dropout and an
//! optional L2 kernel penalty, followed by a softmax output layer. Inputs
//! are sparse binary bag-of-words vectors, so the forward and backward
//! passes skip zero inputs.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::HiddenLayerConfig;
use crate::error::{ModelError, ParleyError, Result};

/// Activation applied after a layer's affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Softmax,
}

/// A fully connected layer with row-major `inputs x units` weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub(crate) inputs: usize,
    pub(crate) units: usize,
    pub(crate) weights: Vec<f32>,
    pub(crate) biases: Vec<f32>,
    pub(crate) activation: Activation,
    pub(crate) dropout: f32,
    pub(crate) l2: f32,
}

impl DenseLayer {
    /// He-uniform kernel for ReLU layers, Glorot-uniform for the output
    /// layer, zero biases.
    fn new<R: Rng + ?Sized>(
        inputs: usize,
        units: usize,
        activation: Activation,
        dropout: f32,
        l2: f32,
        rng: &mut R,
    ) -> Self {
        let limit = match activation {
            Activation::Relu => (6.0 / inputs as f32).sqrt(),
            Activation::Softmax => (6.0 / (inputs + units) as f32).sqrt(),
        };
        let weights = (0..inputs * units)
            .map(|_| rng.random_range(-limit..limit))
            .collect();

        Self {
            inputs,
            units,
            weights,
            biases: vec![0.0; units],
            activation,
            dropout,
            l2,
        }
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut output = self.biases.clone();
        for (i, &x) in input.iter().enumerate() {
            if x == 0.0 {
                continue;
            }
            let row = &self.weights[i * self.units..(i + 1) * self.units];
            for (out, &w) in output.iter_mut().zip(row) {
                *out += x * w;
            }
        }

        match self.activation {
            Activation::Relu => {
                for value in &mut output {
                    *value = value.max(0.0);
                }
            }
            Activation::Softmax => softmax_in_place(&mut output),
        }
        output
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn units(&self) -> usize {
        self.units
    }
}

fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for value in values.iter_mut() {
        *value = (*value - max).exp();
        sum += *value;
    }
    for value in values.iter_mut() {
        *value /= sum;
    }
}

/// Activations recorded by a training-mode forward pass.
#[derive(Debug, Clone)]
pub struct ForwardTrace {
    /// Input seen by each layer (after the previous layer's dropout).
    inputs: Vec<Vec<f32>>,
    /// Post-activation output of each layer, before dropout.
    outputs: Vec<Vec<f32>>,
    /// Dropout scale per unit of each hidden layer (`0` or `1 / keep`).
    masks: Vec<Option<Vec<f32>>>,
}

impl ForwardTrace {
    /// Output probabilities.
    pub fn probabilities(&self) -> &[f32] {
        self.outputs.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Gradient accumulator with the same shape as a network.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub(crate) weights: Vec<Vec<f32>>,
    pub(crate) biases: Vec<Vec<f32>>,
}

impl Gradients {
    pub fn zeros_like(network: &IntentNetwork) -> Self {
        Self {
            weights: network
                .layers
                .iter()
                .map(|l| vec![0.0; l.weights.len()])
                .collect(),
            biases: network
                .layers
                .iter()
                .map(|l| vec![0.0; l.biases.len()])
                .collect(),
        }
    }

    pub fn clear(&mut self) {
        for layer in self.weights.iter_mut().chain(self.biases.iter_mut()) {
            layer.iter_mut().for_each(|g| *g = 0.0);
        }
    }
}

/// The classifier network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentNetwork {
    pub(crate) layers: Vec<DenseLayer>,
}

impl IntentNetwork {
    /// Build a freshly initialised network.
    pub fn new<R: Rng + ?Sized>(
        input_dim: usize,
        hidden: &[HiddenLayerConfig],
        output_dim: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if input_dim == 0 {
            return Err(ParleyError::configuration(
                "network input dimension must be at least 1",
            ));
        }
        if output_dim == 0 {
            return Err(ParleyError::configuration(
                "network needs at least one output class",
            ));
        }

        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut fan_in = input_dim;
        for layer in hidden {
            layers.push(DenseLayer::new(
                fan_in,
                layer.units,
                Activation::Relu,
                layer.dropout,
                layer.l2,
                rng,
            ));
            fan_in = layer.units;
        }
        layers.push(DenseLayer::new(
            fan_in,
            output_dim,
            Activation::Softmax,
            0.0,
            0.0,
            rng,
        ));

        Ok(Self { layers })
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(|l| l.inputs).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.units).unwrap_or(0)
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.biases.len())
            .sum()
    }

    /// Check internal consistency after deserialization.
    pub fn validate(&self) -> Result<()> {
        let mut expected_inputs = self.input_dim();
        for layer in &self.layers {
            if layer.inputs != expected_inputs
                || layer.weights.len() != layer.inputs * layer.units
                || layer.biases.len() != layer.units
            {
                return Err(ModelError::ShapeMismatch {
                    expected: layer.inputs * layer.units,
                    actual: layer.weights.len(),
                }
                .into());
            }
            expected_inputs = layer.units;
        }
        match self.layers.last() {
            Some(last) if last.activation == Activation::Softmax => Ok(()),
            _ => Err(ParleyError::configuration(
                "network must end in a softmax layer",
            )),
        }
    }

    /// Class probabilities for one input, without dropout.
    pub fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.input_dim() {
            return Err(ModelError::ShapeMismatch {
                expected: self.input_dim(),
                actual: input.len(),
            }
            .into());
        }

        let mut activation = input.to_vec();
        for layer in &self.layers {
            activation = layer.forward(&activation);
        }
        Ok(activation)
    }

    /// Training-mode forward pass with dropout masks drawn from `rng`.
    pub fn forward_train<R: Rng + ?Sized>(&self, input: &[f32], rng: &mut R) -> ForwardTrace {
        let mut trace = ForwardTrace {
            inputs: Vec::with_capacity(self.layers.len()),
            outputs: Vec::with_capacity(self.layers.len()),
            masks: Vec::with_capacity(self.layers.len()),
        };

        let mut current = input.to_vec();
        for layer in &self.layers {
            let output = layer.forward(&current);
            trace.inputs.push(current);

            let mask = (layer.activation == Activation::Relu && layer.dropout > 0.0).then(|| {
                let keep = 1.0 - layer.dropout;
                (0..layer.units)
                    .map(|_| {
                        if rng.random::<f32>() < keep {
                            1.0 / keep
                        } else {
                            0.0
                        }
                    })
                    .collect::<Vec<f32>>()
            });

            current = match &mask {
                Some(mask) => output.iter().zip(mask).map(|(o, m)| o * m).collect(),
                None => output.clone(),
            };
            trace.outputs.push(output);
            trace.masks.push(mask);
        }

        trace
    }

    /// Accumulate the cross-entropy gradient of one example into `grads`
    /// and return the example's loss.
    pub fn backward(&self, trace: &ForwardTrace, label: usize, grads: &mut Gradients) -> f32 {
        let probabilities = trace.probabilities();
        let loss = -probabilities
            .get(label)
            .copied()
            .unwrap_or(0.0)
            .max(1e-7)
            .ln();

        // Softmax + cross-entropy: dL/dz = p - onehot(label).
        let mut delta = probabilities.to_vec();
        if let Some(d) = delta.get_mut(label) {
            *d -= 1.0;
        }

        for l in (0..self.layers.len()).rev() {
            let layer = &self.layers[l];
            let input = &trace.inputs[l];
            let weight_grads = &mut grads.weights[l];

            for (i, &x) in input.iter().enumerate() {
                if x == 0.0 {
                    continue;
                }
                let row = &mut weight_grads[i * layer.units..(i + 1) * layer.units];
                for (g, &d) in row.iter_mut().zip(&delta) {
                    *g += x * d;
                }
            }
            for (g, &d) in grads.biases[l].iter_mut().zip(&delta) {
                *g += d;
            }

            if l == 0 {
                break;
            }

            let previous_output = &trace.outputs[l - 1];
            let previous_mask = trace.masks[l - 1].as_deref();
            let mut previous_delta = vec![0.0; layer.inputs];
            for (i, pd) in previous_delta.iter_mut().enumerate() {
                // ReLU derivative and dropout scale of the layer below.
                if previous_output[i] <= 0.0 {
                    continue;
                }
                let scale = previous_mask.map(|m| m[i]).unwrap_or(1.0);
                if scale == 0.0 {
                    continue;
                }
                let row = &layer.weights[i * layer.units..(i + 1) * layer.units];
                let sum: f32 = row.iter().zip(&delta).map(|(w, d)| w * d).sum();
                *pd = sum * scale;
            }
            delta = previous_delta;
        }

        loss
    }

    /// The L2 penalty term of the loss.
    pub fn l2_penalty(&self) -> f32 {
        self.layers
            .iter()
            .filter(|l| l.l2 > 0.0)
            .map(|l| l.l2 * l.weights.iter().map(|w| w * w).sum::<f32>())
            .sum()
    }
}

/// Index and value of the largest probability.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((i, v)),
        })
}
