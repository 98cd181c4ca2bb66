pub mod beats;
pub mod chart;
pub mod easing;
pub mod event;
pub mod frame;
pub mod judge_line;
pub mod judgment;
pub mod note;
pub mod scroll;
pub mod timing;
pub mod timing_windows;
