//! 项目模板

use crate::scaffold::ScaffoldError;
use banana_core::Environment;
use clap::ValueEnum;
use std::fmt;
use std::io::{BufRead, Write};

pub const BASIC_TEMPLATE_URL: &str = "https://github.com/banana-universe/bananajs-basic-template.git";
pub const ADVANCED_TEMPLATE_URL: &str =
    "https://github.com/banana-universe/bananajs-advanced-template.git";

/// 覆盖基础模板地址的配置键（环境变量 `BANANA_TEMPLATE_BASIC_URL`）
pub const BASIC_TEMPLATE_URL_KEY: &str = "template.basic-url";
/// 覆盖高级模板地址的配置键（环境变量 `BANANA_TEMPLATE_ADVANCED_URL`）
pub const ADVANCED_TEMPLATE_URL_KEY: &str = "template.advanced-url";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Template {
    /// 只包含 README 的空项目
    Bare,
    /// 基础模板
    Basic,
    /// 高级模板
    Advanced,
}

impl Template {
    pub const ALL: [Template; 3] = [Template::Bare, Template::Basic, Template::Advanced];

    pub fn description(&self) -> &'static str {
        match self {
            Template::Bare => "Bare project (README only)",
            Template::Basic => "Basic template",
            Template::Advanced => "Advanced template",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Template::Bare => "bare",
            Template::Basic => "basic",
            Template::Advanced => "advanced",
        };
        f.write_str(name)
    }
}

/// 模板仓库地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSources {
    pub basic: String,
    pub advanced: String,
}

impl Default for TemplateSources {
    fn default() -> Self {
        Self {
            basic: BASIC_TEMPLATE_URL.to_string(),
            advanced: ADVANCED_TEMPLATE_URL.to_string(),
        }
    }
}

impl TemplateSources {
    pub fn from_environment(env: &Environment) -> Self {
        Self {
            basic: env.get_string_or(BASIC_TEMPLATE_URL_KEY, BASIC_TEMPLATE_URL),
            advanced: env.get_string_or(ADVANCED_TEMPLATE_URL_KEY, ADVANCED_TEMPLATE_URL),
        }
    }

    /// 模板对应的仓库地址，`Bare` 不需要克隆
    pub fn url(&self, template: Template) -> Option<&str> {
        match template {
            Template::Bare => None,
            Template::Basic => Some(&self.basic),
            Template::Advanced => Some(&self.advanced),
        }
    }
}

/// 交互式选择模板
///
/// 接受序号或模板名，空输入选择 `Bare`，无法识别的输入会重新提示
pub fn prompt_template<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<Template, ScaffoldError> {
    writeln!(output, "Which template would you like to use?")?;
    for (index, template) in Template::ALL.iter().enumerate() {
        writeln!(output, "  {}) {}", index + 1, template.description())?;
    }

    loop {
        write!(output, "Select a template [1]: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(ScaffoldError::Prompt("no template selected".to_string()));
        }

        let answer = line.trim().to_lowercase();
        let choice = match answer.as_str() {
            "" | "1" => Some(Template::Bare),
            "2" => Some(Template::Basic),
            "3" => Some(Template::Advanced),
            other => Template::from_str(other, true).ok(),
        };

        match choice {
            Some(template) => return Ok(template),
            None => writeln!(output, "Unknown template: {}", line.trim())?,
        }
    }
}
