use axum::http::{HeaderName, HeaderValue, Method};
use std::str::FromStr;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

/// 根据配置构建 CORS 中间件；未启用或 Origin 列表无效时返回 None。
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let origin = match parse_list::<HeaderValue>("allowed_origins", &cors.allowed_origins) {
        Wildcard::Any => AllowOrigin::any(),
        Wildcard::List(v) if !v.is_empty() => AllowOrigin::list(v),
        Wildcard::List(_) => {
            tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
            return None;
        }
    };

    let methods = match parse_list::<Method>("allowed_methods", &upper(&cors.allowed_methods)) {
        Wildcard::Any => AllowMethods::any(),
        Wildcard::List(v) => AllowMethods::list(v),
    };

    let headers = match parse_list::<HeaderName>("allowed_headers", &cors.allowed_headers) {
        Wildcard::Any => AllowHeaders::any(),
        Wildcard::List(v) => AllowHeaders::list(v),
    };

    let mut layer = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers);

    if let Some(secs) = cors.max_age_secs
        && secs > 0
    {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Some(layer)
}

enum Wildcard<T> {
    Any,
    List(Vec<T>),
}

fn upper(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_ascii_uppercase()).collect()
}

fn parse_list<T: FromStr>(label: &str, values: &[String]) -> Wildcard<T> {
    let mut out = Vec::new();
    for raw in values {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        if value == "*" {
            return Wildcard::Any;
        }
        match value.parse::<T>() {
            Ok(v) => out.push(v),
            Err(_) => tracing::warn!("CORS {} 含无效值: {}", label, value),
        }
    }
    Wildcard::List(out)
}
