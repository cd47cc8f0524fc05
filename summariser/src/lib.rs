mod grade;
mod recommendations;
mod score;

pub use grade::{grade, response_time_band_score, success_rate_band_score};
pub use score::{PerformanceOverview, PolicyError, ScoreCalculator, ScoreContext, ScorePolicy};
