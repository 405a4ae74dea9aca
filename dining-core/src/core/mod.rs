//! 核心模块 - 配置、状态、错误和后台任务
//!
//! # 模块结构
//!
//! - [`Config`] - 服务配置
//! - [`DiningState`] - 组件集合
//! - [`DiningError`] - 错误定义
//! - [`tasks`] - 后台任务管理

pub mod config;
pub mod error;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::{DiningError, DiningResult, EntityKind};
pub use state::DiningState;
pub use tasks::{BackgroundTasks, TaskKind};
