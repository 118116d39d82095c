//! Detection pipeline: the phase contract, the five phases and the
//! scheduler that runs them.

mod phase;
pub mod phases;
mod scheduler;

pub use phase::{Availability, Phase, PhaseContext, PhaseId, PhaseOutcome, SeenPage};
pub use phases::default_phases;
pub use scheduler::Detector;
