pub mod delta;
pub mod fade;
pub mod judgment;
pub mod playback;
pub mod replay;
pub mod stage_stats;
pub mod timing_stats;
pub mod timing_windows;
