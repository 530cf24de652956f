//! Statistical utilities for the tictac workspace.
//!
//! - [`descriptive`]: per-column summaries (mean, variance, range) used to fit scalers
//! - [`classification`]: confusion counts and precision / recall / F1 reports
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use tictac_stats::descriptive::DescriptiveStats;
//!
//! let stats = DescriptiveStats::new([1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! assert_eq!(stats.variance, 2.0);
//! ```
//!
//! ## Scoring predictions
//!
//! ```
//! use tictac_stats::classification::ClassificationReport;
//!
//! let truth = [0, 0, 1, 1];
//! let predicted = [0, 1, 1, 1];
//! let report = ClassificationReport::new(&truth, &predicted);
//! assert_eq!(report.accuracy, 0.75);
//! assert_eq!(report.classes.len(), 2);
//! ```

pub mod classification;
pub mod descriptive;
