pub mod calibration;
pub mod error;
pub mod io;
pub mod math;
pub mod model;
pub mod phase;
pub mod scenario;

pub use error::{NumericalWarning, PhError, Result};
pub use model::sir::{SirConfig, SirModel};
pub use model::sir_ph::{SirPhConfig, SirPhModel, SirPhResult};
pub use model::trajectory::Trajectory;
pub use phase::{ContinuousDistribution, PhaseType, Scale};
