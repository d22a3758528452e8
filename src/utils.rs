//! 通用辅助函数：
//! - 安全的子路径处理
//! - 远端 shell 参数转义与路径拼接

use std::path::{Path, PathBuf};

/// 将 URL 路径转为安全子路径（过滤 `.` / `..` 等危险片段）。
pub(crate) fn safe_subpath(s: &str) -> Option<PathBuf> {
    let mut p = PathBuf::new();
    for seg in s.split('/') {
        let t = seg.trim();
        if t.is_empty() || t == "." || t == ".." { continue; }
        p.push(t);
    }
    if p.components().next().is_none() { None } else { Some(p) }
}

/// 相对路径转为 `/` 分隔的字符串（用于 glob 匹配与远端路径）。
pub(crate) fn slash_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// 拼接远端 POSIX 路径，去掉多余的 `/`。
pub(crate) fn remote_join(base: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), rel)
}

/// 单引号转义，供远端 shell 命令使用。
pub(crate) fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
