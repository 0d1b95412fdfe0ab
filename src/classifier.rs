use image::imageops::FilterType;
use image::DynamicImage;
use thiserror::Error;
use tract_onnx::prelude::*;

use crate::models::WasteLabel;
use crate::settings::{ModelSettings, TensorLayout};

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("failed to load model {path}: {reason}")]
    Load { path: String, reason: String },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("model produced {0} scores, expected one per label")]
    UnexpectedOutput(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: WasteLabel,
    pub confidence: f32,
}

impl Prediction {
    /// Arg-max over one score per label; the first maximum wins on ties.
    pub fn from_scores(scores: &[f32]) -> Result<Self, ClassifyError> {
        if scores.len() != WasteLabel::ALL.len() {
            return Err(ClassifyError::UnexpectedOutput(scores.len()));
        }

        let mut best = 0;
        for (index, score) in scores.iter().enumerate().skip(1) {
            if *score > scores[best] {
                best = index;
            }
        }

        let label = WasteLabel::from_index(best).ok_or(ClassifyError::UnexpectedOutput(best))?;
        Ok(Prediction {
            label,
            confidence: scores[best],
        })
    }
}

/// Anything that can bucket a decoded image into a [`WasteLabel`].
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &DynamicImage) -> Result<Prediction, ClassifyError>;
}

/// Resizes to `size`x`size`, scales to `[0, 1]` and adds the batch axis.
pub fn preprocess(image: &DynamicImage, size: u32, layout: TensorLayout) -> Tensor {
    let rgb = image
        .resize_exact(size, size, FilterType::CatmullRom)
        .to_rgb8();
    let side = size as usize;
    let value = |x: usize, y: usize, c: usize| rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;

    match layout {
        TensorLayout::Nhwc => {
            tract_ndarray::Array4::from_shape_fn((1, side, side, 3), |(_, y, x, c)| value(x, y, c))
                .into_tensor()
        }
        TensorLayout::Nchw => {
            tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| value(x, y, c))
                .into_tensor()
        }
    }
}

pub fn softmax(scores: &mut [f32]) {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for score in scores.iter_mut() {
        *score = (*score - max).exp();
        sum += *score;
    }
    for score in scores.iter_mut() {
        *score /= sum;
    }
}

/// ONNX model run through tract, loaded and optimized once at startup.
pub struct OnnxClassifier {
    plan: OnnxPlan,
    input_size: u32,
    layout: TensorLayout,
    apply_softmax: bool,
}

impl OnnxClassifier {
    pub fn load(settings: &ModelSettings) -> Result<Self, ClassifyError> {
        let side = settings.input_size as usize;
        let shape = match settings.layout {
            TensorLayout::Nhwc => tvec!(1, side, side, 3),
            TensorLayout::Nchw => tvec!(1, 3, side, side),
        };

        let plan = tract_onnx::onnx()
            .model_for_path(&settings.path)
            .and_then(|model| {
                model.with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), shape))
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ClassifyError::Load {
                path: settings.path.display().to_string(),
                reason: format!("{e:#}"),
            })?;

        tracing::info!(
            path = %settings.path.display(),
            input_size = settings.input_size,
            layout = ?settings.layout,
            "model loaded"
        );

        Ok(Self {
            plan,
            input_size: settings.input_size,
            layout: settings.layout,
            apply_softmax: settings.apply_softmax,
        })
    }

    fn scores(&self, input: Tensor) -> TractResult<Vec<f32>> {
        let outputs = self.plan.run(tvec!(input.into()))?;
        let view = outputs[0].to_array_view::<f32>()?;
        Ok(view.iter().copied().collect())
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Prediction, ClassifyError> {
        let input = preprocess(image, self.input_size, self.layout);
        let mut scores = self
            .scores(input)
            .map_err(|e| ClassifyError::Inference(format!("{e:#}")))?;
        if self.apply_softmax {
            softmax(&mut scores);
        }
        Prediction::from_scores(&scores)
    }
}
