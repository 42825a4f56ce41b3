//! Adam optimizer.

use crate::ml::network::{Gradients, IntentNetwork};

/// Adam with bias correction. L2 penalties are folded into the gradient of
/// each penalized kernel.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    step: i32,
    first_moment: Option<Gradients>,
    second_moment: Option<Gradients>,
}

impl Adam {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
            first_moment: None,
            second_moment: None,
        }
    }

    /// Apply one update from gradients summed over `batch_len` examples.
    pub fn step(&mut self, network: &mut IntentNetwork, grads: &Gradients, batch_len: usize) {
        if batch_len == 0 {
            return;
        }
        self.step += 1;
        let scale = 1.0 / batch_len as f32;
        let correction1 = 1.0 - self.beta1.powi(self.step);
        let correction2 = 1.0 - self.beta2.powi(self.step);
        let (beta1, beta2) = (self.beta1, self.beta2);
        let lr = self.learning_rate;
        let epsilon = self.epsilon;

        let m = self
            .first_moment
            .get_or_insert_with(|| Gradients::zeros_like(network));
        let v = self
            .second_moment
            .get_or_insert_with(|| Gradients::zeros_like(network));

        for (l, layer) in network.layers.iter_mut().enumerate() {
            let l2 = layer.l2;
            let update = |param: &mut f32, grad: f32, m: &mut f32, v: &mut f32| {
                *m = beta1 * *m + (1.0 - beta1) * grad;
                *v = beta2 * *v + (1.0 - beta2) * grad * grad;
                let m_hat = *m / correction1;
                let v_hat = *v / correction2;
                *param -= lr * m_hat / (v_hat.sqrt() + epsilon);
            };

            for (i, weight) in layer.weights.iter_mut().enumerate() {
                let grad = grads.weights[l][i] * scale + 2.0 * l2 * *weight;
                update(weight, grad, &mut m.weights[l][i], &mut v.weights[l][i]);
            }
            for (i, bias) in layer.biases.iter_mut().enumerate() {
                let grad = grads.biases[l][i] * scale;
                update(bias, grad, &mut m.biases[l][i], &mut v.biases[l][i]);
            }
        }
    }

    pub fn steps(&self) -> i32 {
        self.step
    }
}
