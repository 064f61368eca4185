//! Dubkit - Video Dubbing Backend Test Harness
//!
//! An interactive CLI for exercising the video dubbing backend by hand:
//! downloading tweet videos with yt-dlp, extracting audio with ffmpeg,
//! driving the Murf dubbing API directly, and running the complete flow
//! through the locally emulated backend functions.

pub mod cli;
pub mod config;
pub mod dubbing;
pub mod emulator;
pub mod error;
pub mod harness;
pub mod locale;
pub mod logs;
pub mod media;
pub mod storage;
