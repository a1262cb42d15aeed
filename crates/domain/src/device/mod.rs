mod classifier;
mod dialect;
mod entity;

pub use classifier::DeviceClassifier;
pub use dialect::{Dialect, LabelLanguage};
pub use entity::Device;
