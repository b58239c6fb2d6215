pub mod image;
pub mod record;

pub use image::{DetectorImage, EventStats};
pub use record::{DepositRecord, DepositTable};
