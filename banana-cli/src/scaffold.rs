//! 新应用脚手架

use crate::template::{Template, TemplateSources};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("Please specify the app name.")]
    MissingName,

    #[error("Invalid app name \"{0}\": it must be a single directory name")]
    InvalidName(String),

    #[error("App \"{0}\" already exists!")]
    AlreadyExists(String),

    #[error("Failed to clone template {url}: {reason}")]
    CloneFailed { url: String, reason: String },

    #[error("Template selection aborted: {0}")]
    Prompt(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// 在 `root` 下创建新应用
pub struct Scaffolder {
    root: PathBuf,
    git: OsString,
    sources: TemplateSources,
}

impl Scaffolder {
    pub fn new(root: impl Into<PathBuf>, sources: TemplateSources) -> Self {
        Self {
            root: root.into(),
            git: OsString::from("git"),
            sources,
        }
    }

    /// 指定 git 可执行文件
    pub fn git_program(mut self, program: impl Into<OsString>) -> Self {
        self.git = program.into();
        self
    }

    /// 创建应用目录，返回它的路径
    ///
    /// 目录已存在时不做任何修改；克隆或清理 `.git` 失败时删除残留目录
    pub fn create_app(&self, name: &str, template: Template) -> Result<PathBuf, ScaffoldError> {
        let name = validate_name(name)?;
        let target = self.root.join(name);
        if target.exists() {
            return Err(ScaffoldError::AlreadyExists(name.to_string()));
        }

        match self.sources.url(template) {
            None => create_bare(&target, name)?,
            Some(url) => {
                if let Err(err) = self.clone_template(url, &target) {
                    remove_partial(&target);
                    return Err(err);
                }
                if let Err(err) = strip_git_history(&target) {
                    remove_partial(&target);
                    return Err(err.into());
                }
            }
        }

        tracing::debug!(app = name, template = %template, path = %target.display(), "App scaffolded");
        Ok(target)
    }

    fn clone_template(&self, url: &str, target: &Path) -> Result<(), ScaffoldError> {
        tracing::info!(url, "Cloning template");
        let output = Command::new(&self.git)
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg(url)
            .arg(target)
            .output()
            .map_err(|e| ScaffoldError::CloneFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ScaffoldError::CloneFailed {
                url: url.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// 应用名必须是单个目录名
pub(crate) fn validate_name(name: &str) -> Result<&str, ScaffoldError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ScaffoldError::MissingName);
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ScaffoldError::InvalidName(name.to_string()));
    }
    Ok(name)
}

fn create_bare(target: &Path, name: &str) -> io::Result<()> {
    fs::create_dir_all(target)?;
    fs::write(target.join("README.md"), format!("# {} App\n", name))
}

fn remove_partial(target: &Path) {
    if !target.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(target) {
        tracing::warn!(path = %target.display(), error = %e, "Failed to remove partially created app");
    }
}

/// 删除克隆下来的 `.git`，新应用不带模板的提交历史
fn strip_git_history(target: &Path) -> io::Result<()> {
    let git_dir = target.join(".git");
    if git_dir.exists() {
        fs::remove_dir_all(git_dir)?;
    }
    Ok(())
}
