//! Data model and preparation
//!
//! - [`Dataset`] - ordered feature matrix plus target
//! - [`StandardScaler`] - per-column mean/std normalization
//! - [`DataPartitioner`] - deterministic train/test split and scaling
//! - [`DatasetLoader`] - CSV/Parquet loading with column cleaning

mod dataset;
mod loader;
mod partition;
mod scaler;

pub use dataset::Dataset;
pub use loader::{load_dataframe, DatasetLoader, DEFAULT_DROP_COLUMNS};
pub use partition::{DataPartitioner, PartitionedData};
pub use scaler::StandardScaler;
