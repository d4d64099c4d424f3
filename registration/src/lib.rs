//! Chain-wise registration of frame sequences onto their first frame.
//!
//! Consecutive pairs are matched and fitted independently, the relative
//! homographies are folded into anchor-relative ones, and every frame is
//! resampled once onto the anchor's canvas.

pub mod chain;
pub mod config;
pub mod io;
pub mod pipeline;
pub mod warp;

pub use chain::{compose, compose_outcomes, ChainPolicy, ChainReport, Substitution};
pub use config::AlignConfig;
pub use io::{ImageSink, ImageSource, MemorySink, VecSource};
pub use pipeline::{AlignmentOutput, AlignmentPipeline, PairEstimate, PairReport};
pub use warp::FrameWarper;
