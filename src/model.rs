//! 模型产物的加载状态
//!
//! 模型只在进程启动时加载一次，结果固化为 [`ModelState`] 并注入到各服务的状态中。
//! 加载失败是终态：进程存活期间不会重试，所有推理请求都会得到“模型不可用”错误。

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// 模型加载结果
#[derive(Debug)]
pub enum ModelState<M: ?Sized> {
    /// 已就绪
    Loaded(Arc<M>),
    /// 加载失败（附原因）
    Failed(String),
}

impl<M: ?Sized> Clone for ModelState<M> {
    fn clone(&self) -> Self {
        match self {
            ModelState::Loaded(m) => ModelState::Loaded(Arc::clone(m)),
            ModelState::Failed(reason) => ModelState::Failed(reason.clone()),
        }
    }
}

impl<M: ?Sized> ModelState<M> {
    /// 取出就绪的模型
    pub fn ready(&self) -> Option<&Arc<M>> {
        match self {
            ModelState::Loaded(m) => Some(m),
            ModelState::Failed(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Loaded(_))
    }

    /// 转换持有的模型句柄（通常用于擦除为 trait object）
    pub fn map<N: ?Sized>(self, f: impl FnOnce(Arc<M>) -> Arc<N>) -> ModelState<N> {
        match self {
            ModelState::Loaded(m) => ModelState::Loaded(f(m)),
            ModelState::Failed(reason) => ModelState::Failed(reason),
        }
    }
}

impl<M> ModelState<M> {
    /// 直接以一个已构造的模型初始化
    pub fn loaded(model: M) -> Self {
        ModelState::Loaded(Arc::new(model))
    }

    /// 执行加载函数并记录结果；路径不存在时不会调用加载函数。
    pub fn load_with<E, F>(label: &str, path: &Path, load: F) -> Self
    where
        E: std::fmt::Display,
        F: FnOnce(&Path) -> Result<M, E>,
    {
        if !path.exists() {
            let reason = format!("模型文件不存在: {}", path.display());
            tracing::error!(model = label, "{}", reason);
            return ModelState::Failed(reason);
        }

        let t = Instant::now();
        match load(path) {
            Ok(model) => {
                tracing::info!(
                    model = label,
                    path = %path.display(),
                    elapsed_ms = t.elapsed().as_millis() as u64,
                    "模型加载成功"
                );
                ModelState::Loaded(Arc::new(model))
            }
            Err(e) => {
                let reason = format!("模型加载失败: {e}");
                tracing::error!(model = label, path = %path.display(), "{}", reason);
                ModelState::Failed(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ModelState;
    use std::path::Path;

    #[test]
    fn missing_path_is_failed_without_calling_loader() {
        let path = Path::new("./definitely/not/here.onnx");
        let state: ModelState<u8> = ModelState::load_with("test", path, |_| -> Result<u8, String> {
            panic!("loader must not run for a missing path")
        });
        assert!(!state.is_ready());
        match state {
            ModelState::Failed(reason) => assert!(reason.contains("not/here.onnx")),
            ModelState::Loaded(_) => panic!("expected Failed"),
        }
    }

    #[test]
    fn loader_error_becomes_failed_state() {
        let dir = std::env::temp_dir();
        let state: ModelState<u8> =
            ModelState::load_with("test", &dir, |_| Err::<u8, _>("bad magic"));
        match state {
            ModelState::Failed(reason) => assert!(reason.contains("bad magic")),
            ModelState::Loaded(_) => panic!("expected Failed"),
        }
    }

    #[test]
    fn loaded_state_exposes_model() {
        let state = ModelState::loaded(7u8);
        assert_eq!(state.ready().map(|m| **m), Some(7));
    }
}
