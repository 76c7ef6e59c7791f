//! Small helpers shared by the leaderboard crates.

pub mod env;
