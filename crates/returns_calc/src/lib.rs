pub mod presentation;
pub mod returns;

pub use presentation::{ChartFrame, StatusLines};
pub use returns::{InvestmentPoint, InvestmentSeries, ReturnsError, Summary, normalize, round2, summarize};
