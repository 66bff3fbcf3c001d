//! Offline least-squares fitting of angle→speed models against reference logs.

pub mod models;

pub use models::{
    fit_models, fit_power_law, fit_single, FitMetrics, FitOptions, FitReport, FittedModel,
    ModelKind, ModelSelection,
};
