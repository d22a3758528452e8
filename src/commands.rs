//! 命令调度模块：
//! - 接收解析好的 CLI 参数
//! - 调用初始化、预览、发布、删除等模块

use crate::{
    cli::{usage, Cli, Verb},
    config::Project,
    deploy::{deploy_project, SshDeployer},
    error::HoodyError,
    init::init_project,
    preview::{run_server, RunOptions},
    prompt::LinePrompter,
    remove::remove_project,
};

/// 运行指定的子命令
pub(crate) fn run(cli: Cli, project: &Project) -> Result<(), HoodyError> {
    let Some(verb) = cli.verb else { return Err(HoodyError::BadSyntax) };
    tracing::debug!(?verb, root = %project.root.display(), "dispatch");
    match verb {
        Verb::Init => init_project(project, &mut LinePrompter::stdio()),
        Verb::Run => {
            let opts = RunOptions {
                port: cli.args.into_iter().next(),
                open: cli.open,
                watch: cli.watch,
            };
            run_server(project, &opts)
        }
        Verb::Deploy => deploy_project(project, &SshDeployer),
        Verb::Remove => {
            remove_project(project);
            Ok(())
        }
        Verb::Help => {
            println!("{}", usage());
            Ok(())
        }
    }
}
