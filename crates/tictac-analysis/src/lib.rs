//! Dataset handling and feature engineering for game-state classifiers.
//!
//! # Overview
//!
//! 1. **Load** ([`dataset::Dataset`]): read labeled boards from a headerless table
//! 2. **Encode** ([`encoding`]): fit categorical encoders once, then transform
//!    - [`encoding::OrdinalEncoder`]: one integer feature per cell, for tree models
//!    - [`encoding::OneHotEncoder`]: one indicator per (cell, value), for distance and neural models
//!    - [`encoding::LabelEncoder`]: game-state label <-> class code
//! 3. **Scale** ([`scaling::StandardScaler`]): standardize indicator features with
//!    statistics from the training partition only
//! 4. **Split** ([`split::three_way_split`]): seeded train / validation / test row partition
//!
//! # Example
//!
//! ```
//! use tictac_analysis::{
//!     dataset::Dataset,
//!     encoding::OneHotEncoder,
//!     scaling::StandardScaler,
//!     split::{SplitRatios, three_way_split},
//! };
//! use tictac_engine::{Board, enumerate, rules};
//!
//! let dataset = Dataset::from_boards(enumerate::reachable_boards(), rules::label_of).unwrap();
//! let one_hot = OneHotEncoder::fit(Board::CELL_COUNT, dataset.boards().map(Board::cells));
//! let partition = three_way_split(dataset.len(), 42, SplitRatios::default()).unwrap();
//!
//! let train_rows = dataset.select(&partition.train);
//! let train = one_hot.transform(train_rows.iter().map(|r| r.board.cells()));
//! let scaler = StandardScaler::fit(&train);
//! assert_eq!(scaler.n_features(), 27);
//! ```

pub mod dataset;
pub mod encoding;
pub mod features;
pub mod scaling;
pub mod split;
