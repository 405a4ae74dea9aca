use std::sync::Arc;

use crate::cart::CartEngine;
use crate::catalog::{AddonConflictGraph, Catalog, IdentifierAllocator};
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, DiningResult};
use crate::db::Storage;
use crate::orders::OrderLifecycle;
use crate::sweeper::{CartSweep, Sweeper, TableSweep};
use crate::tables::TableLockManager;
use crate::utils::{Clock, SystemClock};

/// 服务状态 - 持有所有组件的共享引用
///
/// 所有组件共用一个 [`Storage`] 和一个 [`Clock`]，克隆成本很低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | tables | 桌台占用 |
/// | carts | 购物车 |
/// | orders | 订单生命周期 |
/// | addons | 加料互斥关系 |
/// | ids | 菜品编号分配 |
/// | catalog | 分类 / 菜品 |
#[derive(Clone)]
pub struct DiningState {
    pub config: Config,
    pub storage: Storage,
    pub clock: Arc<dyn Clock>,
    pub tables: TableLockManager,
    pub carts: CartEngine,
    pub orders: OrderLifecycle,
    pub addons: AddonConflictGraph,
    pub ids: IdentifierAllocator,
    pub catalog: Catalog,
}

impl DiningState {
    /// Open the database under `config.work_dir` with the system clock
    ///
    /// The work directory must already exist.
    pub fn open(config: Config) -> DiningResult<Self> {
        let storage = Storage::open(config.db_path())?;
        tracing::info!(path = %config.db_path().display(), "Database opened");
        Ok(Self::new(storage, Arc::new(SystemClock), config))
    }

    pub fn new(storage: Storage, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            tables: TableLockManager::new(storage.clone(), clock.clone()),
            carts: CartEngine::new(storage.clone(), clock.clone()),
            orders: OrderLifecycle::new(storage.clone(), clock.clone()),
            addons: AddonConflictGraph::new(storage.clone()),
            ids: IdentifierAllocator::new(storage.clone()),
            catalog: Catalog::new(storage.clone()),
            config,
            storage,
            clock,
        }
    }

    pub fn cart_sweeper(&self) -> Sweeper {
        Sweeper::new(
            Arc::new(CartSweep::new(
                self.storage.clone(),
                self.config.cart_timeout_millis(),
            )),
            self.clock.clone(),
            self.config.sweep_interval(),
        )
    }

    pub fn table_sweeper(&self) -> Sweeper {
        Sweeper::new(
            Arc::new(TableSweep::new(
                self.storage.clone(),
                self.config.table_timeout_millis(),
            )),
            self.clock.clone(),
            self.config.sweep_interval(),
        )
    }

    /// 注册两个清扫任务
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let token = tasks.shutdown_token();
        tasks.spawn(
            "cart_sweeper",
            TaskKind::Periodic,
            self.cart_sweeper().run(token.clone()),
        );
        tasks.spawn(
            "table_sweeper",
            TaskKind::Periodic,
            self.table_sweeper().run(token),
        );
        tasks.log_summary();
    }
}
