//! 项目初始化模块
//! - `hoody init`：询问部署参数写出 config.json，并从内置模板生成 www 目录

use anyhow::{Context, Result};
use include_dir::{include_dir, Dir, DirEntry};
use serde_json::Value;
use std::{fs, path::Path};

use crate::{
    config::{self, Project, DEFAULT_SSH_PORT},
    error::HoodyError,
    prompt::{self, non_empty, Answers, Choice, Prompter, Question},
};

// 内置模板（用于 init）
static TEMPLATE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/template");

const AUTH_PASSWORD: &str = "password";
const AUTH_PRIVATE_KEY: &str = "privateKey";

const AUTH_CHOICES: &[Choice] = &[
    Choice { label: "password", value: AUTH_PASSWORD },
    Choice { label: "private-key", value: AUTH_PRIVATE_KEY },
];

fn uses_password(answers: &Answers) -> bool {
    answers.get("authType").and_then(Value::as_str) == Some(AUTH_PASSWORD)
}

fn uses_private_key(answers: &Answers) -> bool {
    answers.get("authType").and_then(Value::as_str) == Some(AUTH_PRIVATE_KEY)
}

/// 部署参数问卷
pub(crate) const QUESTIONS: &[Question] = &[
    Question::text("host", "服务器地址（域名或 IP）").default_value("localhost").validate(non_empty),
    Question::text("port", "SSH 端口").default_value(DEFAULT_SSH_PORT),
    Question::text("deployPath", "远端部署目录").default_value("/var/www/hoody").validate(non_empty),
    Question::select("authType", "使用哪种方式登录服务器？", AUTH_CHOICES),
    Question::text("username", "用户名").when(uses_password).validate(non_empty),
    Question::secret("password", "密码").when(uses_password).validate(non_empty),
    Question::text("privateKeyFile", "私钥文件路径").when(uses_private_key).validate(non_empty),
    Question::secret("privateKeyPassphrase", "私钥口令（可选）").when(uses_private_key),
];

/// 初始化项目：缺少配置时先问卷，随后确保 www 存在
pub(crate) fn init_project(project: &Project, prompter: &mut dyn Prompter) -> Result<(), HoodyError> {
    if project.pref_file.exists() {
        println!("已找到配置文件: {}", project.pref_file.display());
        println!("运行 hoody run 或 hoody deploy 继续");
    } else {
        println!("配置文件 {} 不存在，开始初始化", project.pref_file.display());
        ask_preferences(project, prompter)?;
    }
    copy_template(project);
    Ok(())
}

/// 询问部署参数并整份写入 config.json
pub(crate) fn ask_preferences(project: &Project, prompter: &mut dyn Prompter) -> Result<(), HoodyError> {
    println!();
    let answers = prompt::collect(QUESTIONS, prompter).map_err(HoodyError::PromptAborted)?;
    let write_failure = |source: anyhow::Error| HoodyError::WriteFailure { path: project.pref_file.clone(), source };
    let prefs = config::merge_answers(project.default_preferences(), answers).map_err(write_failure)?;
    config::save_preferences(&project.pref_file, &prefs).map_err(write_failure)?;
    println!("写入: {}", project.pref_file.display());
    Ok(())
}

/// 复制模板到 www；www 已存在时跳过，失败仅报告（不回滚）
pub(crate) fn copy_template(project: &Project) {
    let www = &project.www_dir;
    if www.exists() {
        println!("跳过: {} 已存在", www.display());
        return;
    }
    let result = fs::create_dir(www)
        .with_context(|| format!("创建目录失败: {}", www.display()))
        .and_then(|_| {
            println!("创建目录: {}", www.display());
            write_template(&TEMPLATE_DIR, www)
        });
    match result {
        Ok(()) => println!("✅ 模板已复制到 {}", www.display()),
        Err(source) => {
            let err = HoodyError::CopyFailure { path: www.clone(), source };
            eprintln!("❌ {:#}", anyhow::Error::from(err));
        }
    }
}

/// 将内置模板（含子目录）写出到指定目录
pub(crate) fn write_template(dir: &Dir<'_>, target_dir: &Path) -> Result<()> {
    for entry in dir.entries() {
        let out_path = target_dir.join(entry.path());
        match entry {
            DirEntry::Dir(sub) => {
                fs::create_dir_all(&out_path)
                    .with_context(|| format!("创建目录失败: {}", out_path.display()))?;
                write_template(sub, target_dir)?;
            }
            DirEntry::File(f) => {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&out_path, f.contents())
                    .with_context(|| format!("写出模板文件失败: {}", out_path.display()))?;
                tracing::debug!(path = %out_path.display(), "template file written");
            }
        }
    }
    Ok(())
}
