mod dataset;
mod day_status;
mod decimated;
mod reading;
mod resolution;

pub use dataset::{combined_extrema, Dataset, DisplayPoint, SeriesData};
pub use day_status::{DayOutcome, DayStatus, DayTally};
pub use decimated::{DayResult, DecimatedPoint, TIMESTAMP_FORMAT};
pub use reading::Reading;
pub use resolution::{Resolution, RESOLUTION_THRESHOLDS};
