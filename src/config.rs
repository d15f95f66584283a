use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub raffle: RaffleConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许跨域的来源, 为空时不限制
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 令牌由身份服务签发, 这里只校验
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

/// 引擎参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaffleConfig {
    /// 预留单有效期 (秒)
    pub reservation_window_secs: i64,
    /// 距离活动结束少于该值时拒绝新预留
    pub reservation_min_buffer_secs: i64,
    /// 截短后的过期时间距活动结束的余量
    pub reservation_end_margin_secs: i64,
    pub min_tickets_per_transaction: i32,
    pub max_tickets_per_transaction: i32,
    pub instant_win_claim_window_hours: i64,
    pub draw_claim_window_hours: i64,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            reservation_window_secs: 300,
            reservation_min_buffer_secs: 120,
            reservation_end_margin_secs: 60,
            min_tickets_per_transaction: 1,
            max_tickets_per_transaction: 100,
            instant_win_claim_window_hours: 24,
            draw_claim_window_hours: 168,
        }
    }
}

/// 后台任务间隔 (秒)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub reservation_sweep_secs: u64,
    pub claim_sweep_secs: u64,
    pub raffle_close_sweep_secs: u64,
    pub purchase_count_repair_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reservation_sweep_secs: 60,
            claim_sweep_secs: 300,
            raffle_close_sweep_secs: 60,
            purchase_count_repair_secs: 86_400,
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                        allowed_origins: Vec::new(),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                    },
                    raffle: RaffleConfig::default(),
                    scheduler: SchedulerConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(toml::from_str(config_str).map_err(|e| format!("解析配置文件失败: {e}"))?)
    }

    /// 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            env::var(name).ok().and_then(|v| v.parse().ok())
        }

        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = parsed("SERVER_PORT") {
            self.server.port = p;
        }
        if let Ok(v) = env::var("CORS_ALLOWED_ORIGINS") {
            self.server.allowed_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = parsed("DB_MAX_CONNECTIONS") {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }

        // Raffle
        if let Some(n) = parsed("RESERVATION_WINDOW_SECS") {
            self.raffle.reservation_window_secs = n;
        }
        if let Some(n) = parsed("RESERVATION_MIN_BUFFER_SECS") {
            self.raffle.reservation_min_buffer_secs = n;
        }
        if let Some(n) = parsed("RESERVATION_END_MARGIN_SECS") {
            self.raffle.reservation_end_margin_secs = n;
        }
        if let Some(n) = parsed("MIN_TICKETS_PER_TRANSACTION") {
            self.raffle.min_tickets_per_transaction = n;
        }
        if let Some(n) = parsed("MAX_TICKETS_PER_TRANSACTION") {
            self.raffle.max_tickets_per_transaction = n;
        }
        if let Some(n) = parsed("INSTANT_WIN_CLAIM_WINDOW_HOURS") {
            self.raffle.instant_win_claim_window_hours = n;
        }
        if let Some(n) = parsed("DRAW_CLAIM_WINDOW_HOURS") {
            self.raffle.draw_claim_window_hours = n;
        }

        // Scheduler
        if let Some(n) = parsed("RESERVATION_SWEEP_SECS") {
            self.scheduler.reservation_sweep_secs = n;
        }
        if let Some(n) = parsed("CLAIM_SWEEP_SECS") {
            self.scheduler.claim_sweep_secs = n;
        }
        if let Some(n) = parsed("RAFFLE_CLOSE_SWEEP_SECS") {
            self.scheduler.raffle_close_sweep_secs = n;
        }
        if let Some(n) = parsed("PURCHASE_COUNT_REPAIR_SECS") {
            self.scheduler.purchase_count_repair_secs = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_sections_fall_back_to_defaults() {
        let config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/raffle"
            max_connections = 5

            [jwt]
            secret = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.raffle.reservation_window_secs, 300);
        assert_eq!(config.raffle.reservation_min_buffer_secs, 120);
        assert_eq!(config.raffle.max_tickets_per_transaction, 100);
        assert_eq!(config.scheduler.claim_sweep_secs, 300);
    }

    #[test]
    fn partial_raffle_section_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            url = "postgres://localhost/raffle"
            max_connections = 10

            [jwt]
            secret = "x"

            [raffle]
            reservation_window_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.raffle.reservation_window_secs, 600);
        assert_eq!(config.raffle.reservation_end_margin_secs, 60);
        assert_eq!(config.raffle.draw_claim_window_hours, 168);
    }

    #[test]
    fn malformed_file_is_rejected() {
        assert!(Config::parse("[server]\nport = \"not a number\"").is_err());
    }
}
