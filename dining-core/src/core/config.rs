use std::path::PathBuf;
use std::time::Duration;

/// 服务配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/dining | 工作目录 |
/// | DB_FILE | dining.redb | 数据库文件 (相对 WORK_DIR) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (none) | 日志目录，未设置时输出到 stdout |
/// | SWEEP_INTERVAL_SECS | 300 | 清扫周期 (秒) |
/// | CART_TIMEOUT_SECS | 1800 | 购物车超时 (秒) |
/// | TABLE_TIMEOUT_SECS | 1800 | 桌台占用超时 (秒) |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/dining SWEEP_INTERVAL_SECS=60 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存放数据库和日志
    pub work_dir: String,
    /// 数据库文件名
    pub db_file: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// 两个清扫任务的轮询周期
    pub sweep_interval_secs: u64,
    /// 购物车自创建起的存活时间
    pub cart_timeout_secs: u64,
    /// 桌台自占用起的存活时间
    pub table_timeout_secs: u64,
    /// 运行环境: development | staging | production
    pub environment: String,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 未设置或无法解析时使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/dining".into()),
            db_file: std::env::var("DB_FILE").unwrap_or_else(|_| "dining.redb".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", 300),
            cart_timeout_secs: env_parse("CART_TIMEOUT_SECS", 1800),
            table_timeout_secs: env_parse("TABLE_TIMEOUT_SECS", 1800),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 使用自定义工作目录覆盖
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, sweep_interval_secs: u64) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.sweep_interval_secs = sweep_interval_secs;
        config
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(&self.db_file)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn cart_timeout_millis(&self) -> i64 {
        (self.cart_timeout_secs as i64).saturating_mul(1000)
    }

    pub fn table_timeout_millis(&self) -> i64 {
        (self.table_timeout_secs as i64).saturating_mul(1000)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_and_derived_values() {
        let mut config = Config::with_overrides("/tmp/dining-test", 0);
        config.cart_timeout_secs = 1800;
        config.table_timeout_secs = 60;

        assert_eq!(config.db_path(), PathBuf::from("/tmp/dining-test").join(&config.db_file));
        // zero interval is clamped
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
        assert_eq!(config.cart_timeout_millis(), 1_800_000);
        assert_eq!(config.table_timeout_millis(), 60_000);
    }

    #[test]
    fn test_env_parse_falls_back() {
        assert_eq!(env_parse("DINING_TEST_SURELY_UNSET_VAR", 42u64), 42);
    }
}
