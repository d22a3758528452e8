//! 错误分类与退出码：
//! - 每个子命令在边界处把内部错误（anyhow）归类为 `HoodyError`
//! - `main` 根据错误类型选择进程退出码

use std::{io, path::PathBuf};

use thiserror::Error;

/// 调用方式错误（缺少或未知的子命令）
pub(crate) const EXIT_BAD_SYNTAX: u8 = 1;
/// `run` 时当前目录下没有 www
pub(crate) const EXIT_WWW_NOT_FOUND: u8 = 2;
/// `run` 的端口参数非法
pub(crate) const EXIT_BAD_PORT: u8 = 3;
/// 其它致命错误
pub(crate) const EXIT_FAILURE: u8 = 4;

#[derive(Debug, Error)]
pub(crate) enum HoodyError {
    #[error("Hoody 调用方式不正确")]
    BadSyntax,

    #[error("当前目录下不存在 www 目录: {}\n请先运行 hoody init", .0.display())]
    MissingProject(PathBuf),

    #[error("端口无效: {0}（端口必须是 0 到 65535 之间的整数）")]
    BadPort(String),

    #[error("配置文件 {} 不存在，请先运行 hoody init", .0.display())]
    ConfigMissing(PathBuf),

    #[error("配置文件 {} 无法解析", .path.display())]
    ConfigInvalid {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("写入配置文件 {} 失败，请检查文件权限", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("复制模板目录到 {} 失败", .path.display())]
    CopyFailure {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("交互输入被中断")]
    PromptAborted(#[source] io::Error),

    #[error("部署失败")]
    DeployFailure(#[source] anyhow::Error),

    #[error("启动本地服务失败")]
    ServeFailure(#[source] anyhow::Error),
}

impl HoodyError {
    pub(crate) fn exit_code(&self) -> u8 {
        match self {
            HoodyError::BadSyntax => EXIT_BAD_SYNTAX,
            HoodyError::MissingProject(_) => EXIT_WWW_NOT_FOUND,
            HoodyError::BadPort(_) => EXIT_BAD_PORT,
            _ => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedicated_codes_are_distinct_from_generic_failure() {
        assert_eq!(HoodyError::BadSyntax.exit_code(), 1);
        assert_eq!(HoodyError::MissingProject(PathBuf::from("www")).exit_code(), 2);
        assert_eq!(HoodyError::BadPort("99999".into()).exit_code(), 3);
        assert_eq!(HoodyError::ConfigMissing(PathBuf::from("config.json")).exit_code(), 4);
        let deploy = HoodyError::DeployFailure(anyhow::anyhow!("auth rejected"));
        assert_eq!(deploy.exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn chain_includes_source() {
        let err = HoodyError::DeployFailure(anyhow::anyhow!("连接被拒绝"));
        let rendered = format!("{:#}", anyhow::Error::from(err));
        assert!(rendered.contains("部署失败"));
        assert!(rendered.contains("连接被拒绝"));
    }
}
