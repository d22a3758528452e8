//! `hoody remove`：删除 www 目录与配置文件，两步互不影响

use std::{fs, io, path::Path};

use crate::config::Project;

/// 删除 www 与 config.json；不存在或删除失败都只报告，不中断
pub(crate) fn remove_project(project: &Project) {
    for (path, what) in [(&project.www_dir, "www 目录"), (&project.pref_file, "配置文件")] {
        match remove_entry(path) {
            Ok(true) => println!("🗑️  已删除{}: {}", what, path.display()),
            Ok(false) => eprintln!("{} {} 不存在，无需删除", what, path.display()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "remove failed");
                eprintln!("❌ 删除{}失败: {}: {}", what, path.display(), e);
            }
        }
    }
}

/// 返回 false 表示路径本就不存在
fn remove_entry(path: &Path) -> io::Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}
