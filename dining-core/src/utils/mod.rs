//! 工具模块
//!
//! - [`clock`] - 时钟抽象 (系统时钟 / 手动时钟)
//! - [`logger`] - 日志初始化

pub mod clock;
pub mod logger;

pub use clock::{Clock, ManualClock, SystemClock};
