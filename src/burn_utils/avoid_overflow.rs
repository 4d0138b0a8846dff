use burn::{prelude::Backend, tensor::Tensor};

use crate::error::{TrainError, TrainResult};

/// Copies a tensor back to the host as `f32`, whatever the backend float type.
pub fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> TrainResult<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| TrainError::TensorData(format!("{:?}", err)))
}

/// Returns the first non-finite element as `(index, value)`.
pub fn first_non_finite(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, x)| !x.is_finite())
}

/// Fails with `NumericValidity` when any element is NaN or infinite.
pub fn check_finite(quantity: &'static str, values: &[f32]) -> TrainResult<()> {
    match first_non_finite(values) {
        Some((index, value)) => Err(TrainError::NumericValidity {
            quantity,
            index,
            value,
        }),
        None => Ok(()),
    }
}

/// Tensor flavour of [`check_finite`]; pulls the data to the host.
pub fn check_tensor_finite<B: Backend, const D: usize>(
    quantity: &'static str,
    tensor: &Tensor<B, D>,
) -> TrainResult<()> {
    let values = tensor_to_vec(tensor.clone())?;
    check_finite(quantity, &values)
}
