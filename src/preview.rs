//! 本地预览模块（`hoody run`）
//! - 校验端口与 www 目录
//! - 内置极简 HTTP 静态文件服务器，可选监视 www 变更并热刷新

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::Result;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::{config::Project, error::HoodyError, utils::safe_subpath};

pub(crate) const DEFAULT_HTTP_PORT: u16 = 8080;
const VERSION_ENDPOINT: &str = "/__hoody__/version";
const RELOAD_SCRIPT: &str = "\n<script>(function(){var c=null;async function t(){try{var r=await fetch('/__hoody__/version',{cache:'no-store'});var v=await r.text();if(c===null)c=v;else if(v!==c) location.reload();}catch(e){} setTimeout(t,1000);} t();})();</script>\n";

/// 预览选项
#[derive(Debug, Clone, Default)]
pub(crate) struct RunOptions {
    pub(crate) port: Option<String>,
    pub(crate) open: bool,
    pub(crate) watch: bool,
}

/// 解析端口参数；缺省 8080，必须是 0-65535 的整数
pub(crate) fn parse_port(arg: Option<&str>) -> Result<u16, HoodyError> {
    let Some(raw) = arg else { return Ok(DEFAULT_HTTP_PORT) };
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| HoodyError::BadPort(raw.to_string()))
}

/// 启动预览服务，直到进程被外部终止
pub(crate) fn run_server(project: &Project, opts: &RunOptions) -> Result<(), HoodyError> {
    let port = parse_port(opts.port.as_deref())?;
    if !project.www_dir.is_dir() {
        return Err(HoodyError::MissingProject(project.www_dir.clone()));
    }

    let addr = format!("0.0.0.0:{}", port);
    let server = tiny_http::Server::http(&addr)
        .map_err(|e| HoodyError::ServeFailure(anyhow::anyhow!("绑定地址失败: {}: {}", addr, e)))?;
    let bound = server
        .server_addr()
        .to_ip()
        .map(|a| a.port())
        .unwrap_or(port);
    let url = format!("http://localhost:{}", bound);
    println!("🔎 预览目录: {}", project.www_dir.display());
    println!("🚀 服务已启动: {}", url);
    if opts.open {
        if let Err(e) = webbrowser::open(&url) {
            tracing::warn!(error = %e, "failed to open browser");
        }
    }

    let version = Arc::new(AtomicU64::new(0));
    // watcher 需要活到服务结束
    let _watcher = if opts.watch {
        Some(watch_dir(&project.www_dir, version.clone()).map_err(HoodyError::ServeFailure)?)
    } else {
        None
    };
    serve(&server, &project.www_dir, opts.watch.then_some(version.as_ref()));
    Ok(())
}

/// 监视目录，任意变更都会递增版本号
fn watch_dir(dir: &Path, version: Arc<AtomicU64>) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if res.is_ok() {
            let v = version.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(version = v, "www changed");
        }
    })?;
    watcher.watch(dir, RecursiveMode::Recursive)?;
    println!("👀 监视变更: {}", dir.display());
    Ok(watcher)
}

fn serve(server: &tiny_http::Server, root: &Path, version: Option<&AtomicU64>) {
    for rq in server.incoming_requests() {
        let reply = handle(root, rq.url(), version.map(|v| v.load(Ordering::SeqCst)));
        tracing::debug!(method = %rq.method(), url = rq.url(), status = reply.status, "request");
        let mut resp = tiny_http::Response::from_data(reply.body).with_status_code(reply.status);
        if let Ok(h) = tiny_http::Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
            resp = resp.with_header(h);
        }
        let _ = rq.respond(resp);
    }
}

#[derive(Debug)]
struct Reply {
    status: u16,
    content_type: String,
    body: Vec<u8>,
}

impl Reply {
    fn not_found() -> Self {
        Reply { status: 404, content_type: "text/plain; charset=utf-8".into(), body: b"Not Found".to_vec() }
    }
}

/// `version` 为 Some 时启用热刷新：暴露版本接口并向 HTML 注入轮询脚本
fn handle(root: &Path, url: &str, version: Option<u64>) -> Reply {
    if let Some(v) = version {
        if url == VERSION_ENDPOINT {
            return Reply { status: 200, content_type: "text/plain; charset=utf-8".into(), body: v.to_string().into_bytes() };
        }
    }
    let fpath = resolve_path(root, url);
    if !fpath.is_file() {
        return Reply::not_found();
    }
    let content_type = content_type_for_path(&fpath);
    let Ok(mut body) = fs::read(&fpath) else { return Reply::not_found() };
    if version.is_some() && content_type.starts_with("text/html") {
        body.extend_from_slice(RELOAD_SCRIPT.as_bytes());
    }
    Reply { status: 200, content_type: content_type.to_string(), body }
}

/// 请求路径映射到 root 下的文件；目录请求指向 index.html
fn resolve_path(root: &Path, url: &str) -> PathBuf {
    let raw = url.split(['?', '#']).next().unwrap_or("/");
    // 非法的百分号编码按原样处理
    let path_only = urlencoding::decode(raw).map(|p| p.into_owned()).unwrap_or_else(|_| raw.to_string());
    let mut fpath = root.to_path_buf();
    if let Some(sub) = safe_subpath(&path_only) {
        fpath.push(sub);
    }
    if path_only.ends_with('/') || fpath.is_dir() {
        fpath.push("index.html");
    }
    fpath
}

fn content_type_for_path(p: &Path) -> &'static str {
    match p.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "md" | "markdown" => "text/markdown; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "map" | "json" => "application/json; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}
