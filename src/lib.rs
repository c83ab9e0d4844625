/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// 启动期模型加载与状态组装
pub mod startup;

/// 功能聚合模块
pub mod features;

/// 应用状态聚合模块
pub mod state;

/// 模型加载状态
pub mod model;

/// 路由与中间件装配
pub mod app;

/// OpenAPI 文档
pub mod openapi;

/// 优雅退出管理模块
pub mod shutdown;

/// CORS 中间件构建
pub mod cors;

/// 请求追踪 ID 中间件
pub mod request_id;

// 导出常用类型供外部使用
pub use config::AppConfig;
pub use error::{AppError, RiskError, TriageError};
pub use model::ModelState;
pub use shutdown::{ShutdownManager, ShutdownReason};
