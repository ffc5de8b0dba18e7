//! Thin wrapper around an ONNX Runtime session with a single input and output.

use crate::core::{SubCellError, SubCellResult};
use ndarray::{Array2, Array4};
use ort::logging::LogLevel;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};

/// An ONNX Runtime session bound to one input and one output tensor.
pub struct OrtInfer {
    session: Session,
    input_name: String,
    output_name: String,
    model_path: PathBuf,
    model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Creates a session for the model file at `model_path`.
    ///
    /// When `input_name` is `None` the session's first declared input is used.
    /// The output is always the first declared output.
    pub fn new(
        model_name: &str,
        model_path: impl AsRef<Path>,
        input_name: Option<&str>,
        intra_threads: Option<usize>,
    ) -> SubCellResult<Self> {
        let path = model_path.as_ref();
        let load_error = |e: ort::Error| {
            SubCellError::inference_error(
                model_name,
                &format!("session creation from {}", path.display()),
                e,
            )
        };

        let mut builder = Session::builder()
            .and_then(|b| b.with_log_level(LogLevel::Error))
            .map_err(load_error)?;
        if let Some(intra) = intra_threads {
            builder = builder.with_intra_threads(intra).map_err(load_error)?;
        }
        let session = builder.commit_from_file(path).map_err(load_error)?;

        let input_name = match input_name {
            Some(name) => name.to_string(),
            None => session
                .inputs
                .first()
                .map(|input| input.name.clone())
                .ok_or_else(|| {
                    SubCellError::invalid_input(format!(
                        "model '{}' at {} declares no inputs",
                        model_name,
                        path.display()
                    ))
                })?,
        };
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| {
                SubCellError::invalid_input(format!(
                    "model '{}' at {} declares no outputs",
                    model_name,
                    path.display()
                ))
            })?;

        Ok(Self {
            session,
            input_name,
            output_name,
            model_path: path.to_path_buf(),
            model_name: model_name.to_string(),
        })
    }

    /// Runs the model on a `[N, C, H, W]` batch and returns the flat f32 output.
    pub fn infer_4d(&mut self, x: &Array4<f32>) -> SubCellResult<(Vec<i64>, Vec<f32>)> {
        let tensor = TensorRef::from_array_view(x.view())
            .map_err(|e| SubCellError::inference_error(&self.model_name, "tensor_conversion", e))?;
        self.run(tensor)
    }

    /// Runs the model on a `[N, D]` batch and returns the flat f32 output.
    pub fn infer_2d(&mut self, x: &Array2<f32>) -> SubCellResult<(Vec<i64>, Vec<f32>)> {
        let tensor = TensorRef::from_array_view(x.view())
            .map_err(|e| SubCellError::inference_error(&self.model_name, "tensor_conversion", e))?;
        self.run(tensor)
    }

    fn run(&mut self, tensor: TensorRef<'_, f32>) -> SubCellResult<(Vec<i64>, Vec<f32>)> {
        let inputs = ort::inputs![self.input_name.as_str() => tensor];
        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| SubCellError::inference_error(&self.model_name, "forward_pass", e))?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                SubCellError::inference_error(&self.model_name, "output_extraction", e)
            })?;

        Ok((shape.iter().copied().collect(), data.to_vec()))
    }
}
