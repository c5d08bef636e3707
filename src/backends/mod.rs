/// Google Cloud Vision text recognizer.
#[cfg(feature = "vision")]
pub mod vision;
