use crate::app::BananaApp;
use crate::server::{BananaServer, ServerProperties};
use banana_core::prelude::*;

/// Banana 应用程序
///
/// 加载配置、初始化日志、装配路由并启动服务器：
///
/// ```rust,ignore
/// #[tokio::main]
/// async fn main() -> ApplicationResult<()> {
///     BananaApplication::new("user-demo")
///         .run(|_env| {
///             let mut registry = ControllerRegistry::new();
///             registry.register::<UserController>()?;
///             Ok(BananaApp::new(registry).controller::<UserController>())
///         })
///         .await
/// }
/// ```
pub struct BananaApplication {
    /// 应用名称
    name: String,

    /// 配置文件路径
    config_files: Vec<String>,

    /// 环境变量前缀
    env_prefix: String,

    /// 是否显示 banner
    show_banner: bool,

    /// 日志配置
    logging_config: Option<LoggingConfig>,
}

impl BananaApplication {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_files: vec!["application.toml".to_string()],
            env_prefix: "BANANA_".to_string(),
            show_banner: true,
            logging_config: None,
        }
    }

    /// 设置配置文件路径
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_files = vec![path.into()];
        self
    }

    /// 设置多个配置文件，后加载的优先级更高
    pub fn config_files(mut self, paths: Vec<String>) -> Self {
        self.config_files = paths;
        self
    }

    /// 设置环境变量前缀
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// 设置是否显示 banner
    pub fn banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }

    /// 设置日志配置，未设置时从环境变量读取
    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 加载配置并解析运行模式与服务器配置
    pub fn prepare(&self) -> ApplicationResult<(Environment, RuntimeMode, ServerProperties)> {
        let environment = Environment::load(&self.config_files, &self.env_prefix)?;
        let mode = RuntimeMode::from_environment(&environment);
        let properties = ServerProperties::from_environment(&environment);
        Ok((environment, mode, properties))
    }

    /// 运行应用直到收到退出信号
    ///
    /// `configure` 返回挂载好控制器的 `BananaApp`，运行模式和服务器配置由配置文件决定
    pub async fn run<F>(self, configure: F) -> ApplicationResult<()>
    where
        F: FnOnce(&Environment) -> Result<BananaApp>,
    {
        let logging_config = self
            .logging_config
            .clone()
            .unwrap_or_else(LoggingConfig::from_env);
        logging_config.init()?;

        if self.show_banner {
            self.print_banner();
        }

        let start_time = std::time::Instant::now();
        tracing::info!("Starting {} application", self.name);

        let (environment, mode, properties) = self.prepare()?;
        tracing::info!(mode = %mode, "Runtime mode resolved");

        let router = configure(&environment)?
            .runtime_mode(mode)
            .properties(properties.clone())
            .build()?;

        tracing::info!(
            "{} started in {:.2}s",
            self.name,
            start_time.elapsed().as_secs_f64()
        );

        BananaServer::new(properties).serve(router).await
    }

    fn print_banner(&self) {
        println!();
        println!(r"  ____                                 ");
        println!(r" | __ )  __ _ _ __   __ _ _ __   __ _  ");
        println!(r" |  _ \ / _` | '_ \ / _` | '_ \ / _` | ");
        println!(r" | |_) | (_| | | | | (_| | | | | (_| | ");
        println!(r" |____/ \__,_|_| |_|\__,_|_| |_|\__,_| ");
        println!();
        println!("  :: Banana ::        (v{})", env!("CARGO_PKG_VERSION"));
        println!();
    }
}

impl Default for BananaApplication {
    fn default() -> Self {
        Self::new("BananaApplication")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_prepare_reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "env = \"development\"\n\n[server]\nport = 9090\nenable-cors = true"
        )
        .unwrap();

        let application = BananaApplication::new("test")
            .config_file(file.path().to_string_lossy().to_string())
            .env_prefix("BANANA_APPLICATION_TEST_");
        let (_, mode, properties) = application.prepare().unwrap();

        assert_eq!(mode, RuntimeMode::Development);
        assert_eq!(properties.port, 9090);
        assert!(properties.enable_cors);
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let application = BananaApplication::new("test")
            .config_file("does-not-exist.toml")
            .env_prefix("BANANA_APPLICATION_TEST_");
        let (_, mode, properties) = application.prepare().unwrap();

        assert_eq!(mode, RuntimeMode::Production);
        assert_eq!(properties, ServerProperties::default());
    }
}
