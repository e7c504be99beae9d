mod engine;
mod event;
mod types;

pub use engine::{RetirementPlanner, run_projection};
pub use event::{Event, EventError, EventSchedule, Field, Operator};
pub use types::{PlannerConfig, Projection, YearSnapshot};
