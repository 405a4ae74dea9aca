//! Dining Core - 桌台占用、购物车、订单与加料互斥
//!
//! # 架构概述
//!
//! 一个被 HTTP 层调用的库：会话令牌由外层解析后作为普通参数传入，
//! 核心从不读取全局会话状态。
//!
//! - **桌台** (`tables`): 按会话令牌独占桌台，超时回收
//! - **购物车** (`cart`): 每桌一个购物车，添加时校验加料互斥
//! - **订单** (`orders`): 购物车结算、员工改单、柜台收款
//! - **目录** (`catalog`): 分类、菜品编号、加料互斥图
//! - **清扫** (`sweeper`): 购物车 / 桌台超时清扫
//!
//! # 模块结构
//!
//! ```text
//! dining-core/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── db/            # redb 存储
//! ├── tables/        # 桌台锁
//! ├── cart/          # 购物车
//! ├── orders/        # 订单生命周期
//! ├── catalog/       # 分类、菜品、加料
//! ├── sweeper/       # 超时清扫
//! ├── money.rs       # 金额计算
//! └── utils/         # 时钟、日志
//! ```

pub mod cart;
pub mod catalog;
pub mod core;
pub mod db;
pub mod money;
pub mod orders;
pub mod sweeper;
pub mod tables;
pub mod utils;

// Re-export 公共类型
pub use cart::{CartEngine, CartView};
pub use catalog::{AddonConflictGraph, Catalog, IdentifierAllocator};
pub use core::{BackgroundTasks, Config, DiningError, DiningResult, DiningState, EntityKind};
pub use db::Storage;
pub use money::Totals;
pub use orders::{Checkout, OrderLifecycle};
pub use sweeper::{CartSweep, Sweep, SweepReport, Sweeper, TableSweep};
pub use tables::TableLockManager;
pub use utils::{Clock, ManualClock, SystemClock};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
