//! CLI 定义模块：仅负责命令行参数结构体与解析
//! 子命令按首个参数匹配（忽略大小写），其余位置参数交给具体子命令。

use clap::{Parser, ValueEnum};

/// 顶层 CLI 入口
#[derive(Parser, Debug)]
#[command(name = "hoody", about = "静态文档站脚手架：初始化、本地预览、SSH 发布", version)]
pub(crate) struct Cli {
    /// 子命令：init | run | deploy | remove | help
    #[arg(value_enum, ignore_case = true, value_name = "VERB")]
    pub(crate) verb: Option<Verb>,
    /// 子命令参数（run 可指定端口，默认 8080）
    #[arg(value_name = "ARGS", allow_negative_numbers = true)]
    pub(crate) args: Vec<String>,
    /// run：启动后自动在浏览器打开
    #[arg(long)]
    pub(crate) open: bool,
    /// run：监视 www 变更并自动刷新页面
    #[arg(long)]
    pub(crate) watch: bool,
}

/// 子命令
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Verb {
    /// 询问部署参数并生成 www
    Init,
    /// 本地预览 www
    Run,
    /// 通过 SSH 发布 release
    Deploy,
    /// 删除 www 与 config.json
    Remove,
    /// 显示用法
    Help,
}

/// 用法说明（help 与调用错误时输出）
pub(crate) fn usage() -> String {
    format!(
        "Hoody version {}\n\
         用法:\n  \
           hoody init\n  \
           hoody run [端口] [--watch] [--open]   (例如 hoody run 8081)\n  \
           hoody deploy\n  \
           hoody remove\n  \
           hoody help",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("hoody").chain(args.iter().copied()))
    }

    #[test]
    fn verb_is_case_insensitive() {
        assert_eq!(parse(&["INIT"]).unwrap().verb, Some(Verb::Init));
        assert_eq!(parse(&["Deploy"]).unwrap().verb, Some(Verb::Deploy));
        assert_eq!(parse(&["remove"]).unwrap().verb, Some(Verb::Remove));
    }

    #[test]
    fn missing_verb_parses_as_none() {
        assert_eq!(parse(&[]).unwrap().verb, None);
    }

    #[test]
    fn unknown_verb_is_rejected() {
        assert!(parse(&["publish"]).is_err());
    }

    #[test]
    fn run_takes_port_and_flags() {
        let cli = parse(&["run", "8081", "--watch"]).unwrap();
        assert_eq!(cli.verb, Some(Verb::Run));
        assert_eq!(cli.args, vec!["8081"]);
        assert!(cli.watch);
        assert!(!cli.open);
    }

    #[test]
    fn negative_port_reaches_the_command() {
        let cli = parse(&["run", "-1"]).unwrap();
        assert_eq!(cli.args, vec!["-1"]);
    }

    #[test]
    fn usage_lists_every_verb() {
        let text = usage();
        for verb in ["init", "run", "deploy", "remove", "help"] {
            assert!(text.contains(&format!("hoody {}", verb)), "{verb}");
        }
    }
}
