//! # defect-fit
//!
//! Defect-rate statistics and goodness-of-fit testing for manufacturing
//! batches.
//!
//! Given `(batch_size, defect_count)` pairs, the crate computes summary
//! statistics and tests whether the defect counts are consistent with a
//! single binomial defect rate, or whether the per-batch defect rates look
//! normally distributed.
//!
//! ## Modules
//!
//! - [`dataset`] — Raw rows, validated batch records, the dataset
//! - [`validation`] — Row checks reporting every offending row at once
//! - [`aggregate`] — Totals and pooled defect rate
//! - [`fit`] — Binomial χ², quantile-binned normal χ², Shapiro-Wilk fallback
//! - [`plot`] — Observed-vs-expected and rate-distribution series
//! - [`report`] — Export report and verdict text
//! - [`analysis`] — The whole pipeline in one call
//! - [`io`] — CSV import/export (`batch_size`, `defect_count`)
//! - [`config`] — TOML-loadable analysis settings
//! - [`testing`], [`distribution`] — Statistical building blocks
//!
//! ## Design Philosophy
//!
//! - **Typed at the boundary**: column names exist only in [`io`]
//! - **No panics on data**: degenerate inputs produce inconclusive results
//! - **Numerical stability**: Leverages `u-numflow` for statistics and
//!   special functions

pub mod aggregate;
pub mod analysis;
pub mod config;
pub mod dataset;
pub mod distribution;
pub mod fit;
pub mod io;
pub mod plot;
pub mod report;
pub mod testing;
pub mod validation;
