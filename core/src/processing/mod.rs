pub mod background;
pub mod imaging;
pub mod pipeline;
pub mod smearing;
pub mod spectrum;
pub mod transport;

pub use background::BackgroundStage;
pub use imaging::{FormedImage, ImageGeometry, ImagingStage};
pub use pipeline::Pipeline;
pub use smearing::{BetaTrackSmearer, SmearingStage};
pub use spectrum::SpectrumSampler;
pub use transport::{DriftModel, TransportStage};
