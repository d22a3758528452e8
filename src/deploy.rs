//! SSH 发布模块（`hoody deploy`）
//! - 按 exclude 规则规划待上传文件
//! - 通过 SSH/SFTP 上传到远端新的时间戳 release 目录
//! - 原子切换 currentReleaseLink 软链接，并清理多余的旧 release

use std::{
    collections::BTreeSet,
    fs::{self, File},
    io::{self, Read},
    net::TcpStream,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use ssh2::Session;
use walkdir::WalkDir;

use crate::{
    config::{self, Auth, Preferences, Project},
    error::HoodyError,
    utils::{remote_join, shell_quote, slash_path},
};

/// 待上传内容：目录按父目录在前排序，文件带相对路径（`/` 分隔）
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct UploadPlan {
    pub(crate) dirs: Vec<String>,
    pub(crate) files: Vec<UploadFile>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct UploadFile {
    pub(crate) local: PathBuf,
    pub(crate) rel: String,
}

/// 发布完成后的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReleaseReport {
    pub(crate) release: String,
    pub(crate) release_dir: String,
    pub(crate) link: String,
    pub(crate) uploaded: usize,
    pub(crate) removed: Vec<String>,
}

/// 发布一个 release 的执行者
pub(crate) trait ReleaseDeployer {
    fn deploy_release(&self, prefs: &Preferences, plan: &UploadPlan) -> Result<ReleaseReport>;
}

/// 发布当前项目：读取配置、规划上传、交给 deployer
pub(crate) fn deploy_project(project: &Project, deployer: &dyn ReleaseDeployer) -> Result<(), HoodyError> {
    let prefs = config::load_preferences(&project.pref_file)?;
    println!("📦 部署 {} -> {}:{}", prefs.local_path.display(), prefs.host, prefs.deploy_path);

    let plan = plan_upload(&prefs.local_path, &prefs.exclude, &[project.pref_file.as_path()])
        .map_err(HoodyError::DeployFailure)?;
    tracing::info!(files = plan.files.len(), dirs = plan.dirs.len(), "upload planned");

    let report = deployer.deploy_release(&prefs, &plan).map_err(HoodyError::DeployFailure)?;
    for old in &report.removed {
        println!("🧹 已清理旧 release: {}", old);
    }
    println!("✅ release {} 发布完成（{} 个文件），{} -> {}", report.release, report.uploaded, report.link, report.release_dir);
    Ok(())
}

/// 遍历本地目录，过滤 exclude 命中的文件与 `skip` 中的文件
pub(crate) fn plan_upload(local: &Path, exclude: &[String], skip: &[&Path]) -> Result<UploadPlan> {
    if !local.is_dir() {
        bail!("本地目录不存在: {}", local.display());
    }
    // skip 按规范路径比较，与 localPath 的写法无关
    let local = fs::canonicalize(local).with_context(|| format!("解析路径失败: {}", local.display()))?;
    let local = local.as_path();
    let skip: Vec<PathBuf> = skip.iter().filter_map(|p| fs::canonicalize(p).ok()).collect();
    let patterns = exclude
        .iter()
        .map(|p| glob::Pattern::new(p).with_context(|| format!("exclude 规则无效: {}", p)))
        .collect::<Result<Vec<_>>>()?;

    let mut dirs = BTreeSet::new();
    let mut files = Vec::new();
    for entry in WalkDir::new(local).sort_by_file_name() {
        let entry = entry.with_context(|| format!("遍历失败: {}", local.display()))?;
        if !entry.file_type().is_file() || skip.iter().any(|s| s == entry.path()) {
            continue;
        }
        let rel_path = entry.path().strip_prefix(local)?;
        let rel = slash_path(rel_path);
        if patterns.iter().any(|p| p.matches(&rel)) {
            tracing::debug!(path = %rel, "excluded");
            continue;
        }
        let mut parent = rel_path.parent();
        while let Some(p) = parent.filter(|p| !p.as_os_str().is_empty()) {
            dirs.insert(slash_path(p));
            parent = p.parent();
        }
        files.push(UploadFile { local: entry.path().to_path_buf(), rel });
    }
    Ok(UploadPlan { dirs: dirs.into_iter().collect(), files })
}

/// release 目录名，例如 `2024-05-01-08-30-00-123-UTC`
pub(crate) fn release_name(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d-%H-%M-%S-%3f-UTC").to_string()
}

/// 需要删除的旧 release（按名称即时间排序，保留最新的 `keep` 个）
pub(crate) fn stale_releases(listing: &str, keep: usize) -> Vec<String> {
    let mut names: Vec<&str> = listing.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    names.sort_unstable();
    let excess = names.len().saturating_sub(keep);
    names.into_iter().take(excess).map(str::to_string).collect()
}

/// `user@host` 形式拆分出用户名
pub(crate) fn split_user_host(host: &str) -> (Option<&str>, &str) {
    match host.rsplit_once('@') {
        Some((user, h)) if !user.is_empty() => (Some(user), h),
        _ => (None, host),
    }
}

/// 原子切换软链接：先建临时链接，再 `mv -T` 覆盖
pub(crate) fn swap_link_command(deploy_path: &str, link: &str, target: &str) -> String {
    let tmp = format!("{}.tmp", link);
    format!(
        "cd {} && ln -sfn {} {} && mv -Tf {} {}",
        shell_quote(deploy_path),
        shell_quote(target),
        shell_quote(&tmp),
        shell_quote(&tmp),
        shell_quote(link),
    )
}

/// 基于 libssh2 的发布实现
pub(crate) struct SshDeployer;

impl ReleaseDeployer for SshDeployer {
    fn deploy_release(&self, prefs: &Preferences, plan: &UploadPlan) -> Result<ReleaseReport> {
        let session = connect(prefs)?;

        let release = release_name(Utc::now());
        let releases_dir = remote_join(&prefs.deploy_path, prefs.releases_folder());
        let release_dir = remote_join(&releases_dir, &release);
        exec(&session, &format!("mkdir -p {}", shell_quote(&release_dir)))?;
        println!("📁 创建 release 目录: {}", release_dir);

        let sftp = session.sftp().context("打开 SFTP 通道失败")?;
        for d in &plan.dirs {
            let remote = remote_join(&release_dir, d);
            sftp.mkdir(Path::new(&remote), 0o755)
                .with_context(|| format!("创建远端目录失败: {}", remote))?;
        }
        for f in &plan.files {
            let remote = remote_join(&release_dir, &f.rel);
            let mut src = File::open(&f.local).with_context(|| format!("读取失败: {}", f.local.display()))?;
            let mut dst = sftp.create(Path::new(&remote)).with_context(|| format!("创建远端文件失败: {}", remote))?;
            io::copy(&mut src, &mut dst).with_context(|| format!("上传失败: {}", f.rel))?;
            tracing::debug!(file = %f.rel, "uploaded");
        }
        println!("⬆️  已上传 {} 个文件", plan.files.len());

        let target = format!("{}/{}", prefs.releases_folder().trim_matches('/'), release);
        exec(&session, &swap_link_command(&prefs.deploy_path, &prefs.current_release_link, &target))?;
        let link = remote_join(&prefs.deploy_path, &prefs.current_release_link);

        let listing = exec(&session, &format!("ls -1 {}", shell_quote(&releases_dir)))?;
        let removed = stale_releases(&listing, prefs.releases_to_keep());
        for old in &removed {
            exec(&session, &format!("rm -rf {}", shell_quote(&remote_join(&releases_dir, old))))?;
        }

        Ok(ReleaseReport { release, release_dir, link, uploaded: plan.files.len(), removed })
    }
}

fn connect(prefs: &Preferences) -> Result<Session> {
    let (host_user, host) = split_user_host(&prefs.host);
    let port = prefs.ssh_port()?;
    let tcp = TcpStream::connect((host, port)).with_context(|| format!("连接 {}:{} 失败", host, port))?;
    let mut session = Session::new().context("创建 SSH 会话失败")?;
    session.set_tcp_stream(tcp);
    session.handshake().context("SSH 握手失败")?;

    match &prefs.auth {
        Auth::Password { username, password } => {
            session
                .userauth_password(username, password)
                .with_context(|| format!("用户 {} 密码认证失败", username))?;
        }
        Auth::PrivateKey { private_key_file, private_key_passphrase } => {
            let user = host_user.unwrap_or("root");
            let passphrase = private_key_passphrase.as_deref().filter(|p| !p.is_empty());
            session
                .userauth_pubkey_file(user, None, private_key_file, passphrase)
                .with_context(|| format!("用户 {} 私钥认证失败: {}", user, private_key_file.display()))?;
        }
    }
    if !session.authenticated() {
        bail!("SSH 认证未通过");
    }
    tracing::info!(host, port, "ssh session established");
    Ok(session)
}

/// 执行远端命令，非零退出码视为失败，返回标准输出
fn exec(session: &Session, command: &str) -> Result<String> {
    tracing::debug!(command, "remote exec");
    let mut channel = session.channel_session().context("打开 SSH 通道失败")?;
    channel.exec(command).with_context(|| format!("远端命令执行失败: {}", command))?;
    let mut stdout = String::new();
    channel.read_to_string(&mut stdout)?;
    let mut stderr = String::new();
    channel.stderr().read_to_string(&mut stderr)?;
    channel.wait_close()?;
    let status = channel.exit_status()?;
    if status != 0 {
        bail!("远端命令退出码 {}: {}\n{}", status, command, stderr.trim());
    }
    Ok(stdout)
}
