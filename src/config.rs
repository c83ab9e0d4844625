use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（未设置 RUST_LOG 时生效）
    pub level: String,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_any")]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_any")]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_any")]
    pub allowed_headers: Vec<String>,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_any() -> Vec<String> {
        vec!["*".to_string()]
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Self::default_any(),
            allowed_methods: Self::default_any(),
            allowed_headers: Self::default_any(),
            max_age_secs: None,
        }
    }
}

/// 风险评估服务（表格模型）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// 是否在本进程中启动该服务
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// ONNX 模型路径（相对工作目录）
    pub model_path: String,
    /// 高风险判定阈值（概率 >= 阈值即为高风险）
    #[serde(default = "RiskConfig::default_threshold")]
    pub threshold: f64,
}

impl RiskConfig {
    fn default_threshold() -> f64 {
        0.5
    }

    /// 获取监听地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 5002,
            model_path: "./models/lung_risk.onnx".to_string(),
            threshold: Self::default_threshold(),
        }
    }
}

/// 上传文件保留策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UploadRetention {
    /// 推理结束后保留在工作目录
    Keep,
    /// 推理结束后删除
    #[default]
    Delete,
}

/// 上传文件落盘命名方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UploadNaming {
    /// 直接使用客户端声明的文件名（仅 `Keep` 策略下生效，同名上传后写覆盖）
    #[default]
    Original,
    /// 在文件名前追加 UUID，每个请求独立
    Unique,
}

/// 影像分诊服务（图像模型）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// 是否在本进程中启动该服务
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// ONNX 模型路径（相对工作目录）
    pub model_path: String,
    /// 上传文件工作目录
    pub upload_dir: String,
    /// 上传文件保留策略
    #[serde(default)]
    pub retention: UploadRetention,
    /// 上传文件命名方式
    #[serde(default)]
    pub naming: UploadNaming,
    /// 单次上传体积上限（字节）
    #[serde(default = "TriageConfig::default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// 模型输入边长（像素）
    #[serde(default = "TriageConfig::default_image_size")]
    pub image_size: u32,
}

impl TriageConfig {
    fn default_max_upload_bytes() -> usize {
        32 * 1024 * 1024
    }

    fn default_image_size() -> u32 {
        150
    }

    /// 获取监听地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 获取上传目录
    pub fn upload_path(&self) -> PathBuf {
        PathBuf::from(&self.upload_dir)
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 5000,
            model_path: "./models/lung_cancer_model.onnx".to_string(),
            upload_dir: "./uploads".to_string(),
            retention: UploadRetention::default(),
            naming: UploadNaming::default(),
            max_upload_bytes: Self::default_max_upload_bytes(),
            image_size: Self::default_image_size(),
        }
    }
}

/// 推理执行配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InferenceConfig {
    /// 并发推理许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
}

impl InferenceConfig {
    /// 实际生效的并发许可数
    pub fn permits(&self) -> usize {
        if self.max_parallel == 0 {
            num_cpus::get()
        } else {
            self.max_parallel as usize
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 风险评估服务
    #[serde(default)]
    pub risk: RiskConfig,
    /// 影像分诊服务
    #[serde(default)]
    pub triage: TriageConfig,
    /// 推理执行配置
    #[serde(default)]
    pub inference: InferenceConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 依次叠加：内置默认值 → config.toml（可缺省）→ 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        let builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&AppConfig::default())?)
            .add_source(File::from(config_path).required(false))
            // 支持环境变量覆盖，例如：APP_RISK__PORT、APP_TRIAGE__UPLOAD_DIR
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取配置文件路径（可通过 APP_CONFIG_PATH 指定）
    fn get_config_path() -> PathBuf {
        std::env::var("APP_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            cors: CorsConfig::default(),
            risk: RiskConfig::default(),
            triage: TriageConfig::default(),
            inference: InferenceConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}
