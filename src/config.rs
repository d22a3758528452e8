//! 项目上下文与偏好配置模块：
//! - `Project`：进程启动时根据工作目录构造一次，传给各子命令
//! - `Preferences`：`config.json` 的数据结构（SSH 部署参数）
//! - 提供 `load_preferences` / `save_preferences`，整份读写，不做局部更新

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::error::HoodyError;

pub(crate) const PREF_FILE_NAME: &str = "config.json";
pub(crate) const WWW_DIR_NAME: &str = "www";

pub(crate) const DEFAULT_SSH_PORT: &str = "9222";
pub(crate) const DEFAULT_RELEASE_LINK: &str = "htdocs";
pub(crate) const DEFAULT_EXCLUDE: [&str; 2] = [".svn/**", ".git/**"];
pub(crate) const DEFAULT_RELEASES_FOLDER: &str = "releases";
pub(crate) const DEFAULT_RELEASES_TO_KEEP: usize = 3;

/// 当前项目（即运行 hoody 的工作目录）
#[derive(Debug, Clone)]
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) www_dir: PathBuf,
    pub(crate) pref_file: PathBuf,
}

impl Project {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            www_dir: root.join(WWW_DIR_NAME),
            pref_file: root.join(PREF_FILE_NAME),
            root,
        }
    }

    /// 以当前工作目录作为项目根目录
    pub(crate) fn from_current_dir() -> Result<Self> {
        let cwd = std::env::current_dir().context("无法获取当前工作目录")?;
        Ok(Self::new(cwd))
    }

    /// 部署默认值；问卷答案合并在其之上
    pub(crate) fn default_preferences(&self) -> Map<String, Value> {
        let defaults = json!({
            "localPath": self.root.display().to_string(),
            "currentReleaseLink": DEFAULT_RELEASE_LINK,
            "exclude": DEFAULT_EXCLUDE,
        });
        match defaults {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// `config.json` 的内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Preferences {
    pub(crate) host: String,
    #[serde(default = "default_port", deserialize_with = "port_from_string_or_number")]
    pub(crate) port: String,
    pub(crate) deploy_path: String,
    #[serde(flatten)]
    pub(crate) auth: Auth,
    pub(crate) local_path: PathBuf,
    #[serde(default = "default_release_link")]
    pub(crate) current_release_link: String,
    #[serde(default)]
    pub(crate) exclude: Vec<String>,
    /// 远端存放各个 release 的子目录，缺省为 `releases`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) releases_folder: Option<String>,
    /// 部署后远端保留的 release 数量，缺省为 3
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) releases_to_keep: Option<usize>,
}

/// 认证方式；`authType` 决定另一组字段必然缺失
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "authType", rename_all = "camelCase")]
pub(crate) enum Auth {
    #[serde(rename_all = "camelCase")]
    Password { username: String, password: String },
    #[serde(rename_all = "camelCase")]
    PrivateKey {
        private_key_file: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        private_key_passphrase: Option<String>,
    },
}

impl Preferences {
    pub(crate) fn releases_folder(&self) -> &str {
        self.releases_folder
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_RELEASES_FOLDER)
    }

    pub(crate) fn releases_to_keep(&self) -> usize {
        self.releases_to_keep.unwrap_or(DEFAULT_RELEASES_TO_KEEP).max(1)
    }

    pub(crate) fn ssh_port(&self) -> Result<u16> {
        self.port
            .trim()
            .parse::<u16>()
            .with_context(|| format!("SSH 端口无效: {}", self.port))
    }
}

fn default_port() -> String {
    DEFAULT_SSH_PORT.to_string()
}

fn default_release_link() -> String {
    DEFAULT_RELEASE_LINK.to_string()
}

// 手工编辑的配置可能把端口写成数字
fn port_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u64),
    }
    Ok(match Port::deserialize(deserializer)? {
        Port::Text(s) => s,
        Port::Number(n) => n.to_string(),
    })
}

/// 将问卷答案合并到默认值之上（答案优先），并校验成 `Preferences`
pub(crate) fn merge_answers(defaults: Map<String, Value>, answers: Map<String, Value>) -> Result<Preferences> {
    let mut merged = defaults;
    merged.extend(answers);
    serde_json::from_value(Value::Object(merged)).context("问卷答案不完整")
}

/// 整份写入配置文件（制表符缩进）
pub(crate) fn save_preferences(path: &Path, prefs: &Preferences) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    prefs.serialize(&mut ser).context("序列化配置失败")?;
    fs::write(path, &buf).with_context(|| format!("写入失败: {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = buf.len(), "preferences written");
    Ok(())
}

/// 读取配置文件；缺失与格式错误分别归类
pub(crate) fn load_preferences(path: &Path) -> Result<Preferences, HoodyError> {
    if !path.is_file() {
        return Err(HoodyError::ConfigMissing(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|e| HoodyError::ConfigInvalid {
        path: path.to_path_buf(),
        source: anyhow::Error::from(e).context("读取失败"),
    })?;
    serde_json::from_str(&text).map_err(|e| HoodyError::ConfigInvalid {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password_answers() -> Map<String, Value> {
        match json!({
            "host": "h",
            "port": "22",
            "deployPath": "/d",
            "authType": "password",
            "username": "u",
            "password": "p",
        }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn merge_fills_defaults_and_keeps_password_branch_only() {
        let project = Project::new("/tmp/site");
        let prefs = merge_answers(project.default_preferences(), password_answers()).unwrap();
        assert_eq!(prefs.current_release_link, "htdocs");
        assert_eq!(prefs.exclude, vec![".svn/**", ".git/**"]);
        assert_eq!(prefs.local_path, PathBuf::from("/tmp/site"));

        let value = serde_json::to_value(&prefs).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj["authType"], "password");
        assert_eq!(obj["username"], "u");
        assert_eq!(obj["password"], "p");
        assert!(!obj.contains_key("privateKeyFile"));
        assert!(!obj.contains_key("privateKeyPassphrase"));
        assert!(!obj.contains_key("releasesFolder"));
    }

    #[test]
    fn answers_win_on_collision() {
        let project = Project::new("/tmp/site");
        let mut answers = password_answers();
        answers.insert("currentReleaseLink".into(), json!("current"));
        let prefs = merge_answers(project.default_preferences(), answers).unwrap();
        assert_eq!(prefs.current_release_link, "current");
    }

    #[test]
    fn private_key_branch_has_no_password_fields() {
        let json = r#"{
            "host": "h", "port": 2222, "deployPath": "/d",
            "authType": "privateKey", "privateKeyFile": "~/.ssh/id_ed25519",
            "localPath": "/p", "currentReleaseLink": "htdocs", "exclude": []
        }"#;
        let prefs: Preferences = serde_json::from_str(json).unwrap();
        assert_eq!(prefs.port, "2222");
        assert_eq!(prefs.ssh_port().unwrap(), 2222);
        assert!(matches!(prefs.auth, Auth::PrivateKey { private_key_passphrase: None, .. }));
        let out = serde_json::to_value(&prefs).unwrap();
        assert!(out.get("username").is_none());
        assert!(out.get("password").is_none());
    }

    #[test]
    fn save_then_load_is_tab_indented() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path());
        let prefs = merge_answers(project.default_preferences(), password_answers()).unwrap();
        save_preferences(&project.pref_file, &prefs).unwrap();

        let text = fs::read_to_string(&project.pref_file).unwrap();
        assert!(text.contains("\n\t\"host\": \"h\""));
        assert_eq!(load_preferences(&project.pref_file).unwrap(), prefs);
    }

    #[test]
    fn load_distinguishes_missing_from_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREF_FILE_NAME);
        assert!(matches!(load_preferences(&path), Err(HoodyError::ConfigMissing(_))));
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_preferences(&path), Err(HoodyError::ConfigInvalid { .. })));
    }

    #[test]
    fn release_settings_fall_back_to_defaults() {
        let project = Project::new("/p");
        let mut prefs = merge_answers(project.default_preferences(), password_answers()).unwrap();
        assert_eq!(prefs.releases_folder(), "releases");
        assert_eq!(prefs.releases_to_keep(), 3);
        prefs.releases_to_keep = Some(0);
        assert_eq!(prefs.releases_to_keep(), 1);
    }
}
