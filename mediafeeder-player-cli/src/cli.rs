use clap::{Parser, Subcommand};
use serde::Deserialize;
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_NAME: &str = "MediaFeeder Player";

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, env = "MEDIAFEEDER_NAME")]
    /// Name shown for this player in the coordination service.
    name: Option<String>,

    #[clap(short, long, env = "MEDIAFEEDER_SERVER")]
    /// Address of the session stream, as host:port.
    server: Option<String>,

    #[clap(short, long, env = "MEDIAFEEDER_API_URL")]
    /// Base URL of the coordination HTTP API.
    api_url: Option<String>,

    #[clap(short, long, env = "MEDIAFEEDER_TOKEN", hide_env_values = true)]
    /// Bearer token for the coordination service.
    token: Option<String>,

    #[clap(short, long, env = "MEDIAFEEDER_VERBOSITY")]
    /// Log level
    verbosity: Option<tracing::Level>,

    #[clap(long, env = "MEDIAFEEDER_CONFIG")]
    /// Read settings from this file instead of the default location.
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the queue with the built-in GStreamer player
    Local,
    /// Print the configuration file location
    Config,
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{error}"))]
    ClientError { error: String },
    #[snafu(display("{error}"))]
    SessionError { error: String },
    #[snafu(display("{error}"))]
    PlayerError { error: String },
    #[snafu(display("failed to read {}: {message}", path.display()))]
    ConfigError { path: PathBuf, message: String },
    #[snafu(display("no configuration directory on this system"))]
    NoConfigDir,
    #[snafu(display("no {option} given. Set it in the config file or with --{option}"))]
    MissingOption { option: &'static str },
    #[snafu(display("built without the gstreamer feature"))]
    NoLocalBackend,
}

impl From<mediafeeder_client::Error> for Error {
    fn from(error: mediafeeder_client::Error) -> Self {
        Error::ClientError {
            error: error.to_string(),
        }
    }
}

impl From<mediafeeder_sync::Error> for Error {
    fn from(error: mediafeeder_sync::Error) -> Self {
        Error::SessionError {
            error: error.to_string(),
        }
    }
}

impl From<mediafeeder_local::Error> for Error {
    fn from(error: mediafeeder_local::Error) -> Self {
        Error::PlayerError {
            error: error.to_string(),
        }
    }
}

/// Defaults read from `config.toml`. Command line and environment win.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
struct Config {
    name: Option<String>,
    server: Option<String>,
    api_url: Option<String>,
    token: Option<String>,
}

impl Config {
    async fn load(path: &Path) -> Result<Config, Error> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file");
                return Ok(Config::default());
            }
            Err(error) => {
                return ConfigSnafu {
                    path,
                    message: error.to_string(),
                }
                .fail();
            }
        };

        toml::from_str(&contents).map_err(|error| Error::ConfigError {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }
}

#[derive(Debug, PartialEq)]
struct Settings {
    name: String,
    server: String,
    api_url: String,
    token: Option<String>,
}

impl Settings {
    fn resolve(cli: Cli, config: Config) -> Result<Settings, Error> {
        Ok(Settings {
            name: cli
                .name
                .or(config.name)
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            server: cli
                .server
                .or(config.server)
                .context(MissingOptionSnafu { option: "server" })?,
            api_url: cli
                .api_url
                .or(config.api_url)
                .context(MissingOptionSnafu { option: "api-url" })?,
            token: cli.token.or(config.token),
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mediafeeder").join("config.toml"))
}

fn config_path(cli: &Cli) -> Result<PathBuf, Error> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => default_config_path().context(NoConfigDirSnafu),
    }
}

pub async fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_target(false)
        .compact()
        .init();

    let path = config_path(&cli)?;

    match cli.command {
        Commands::Config => {
            println!("{}", path.display());
            Ok(())
        }
        Commands::Local => {
            let config = Config::load(&path).await?;
            let settings = Settings::resolve(cli, config)?;
            play_local(settings).await
        }
    }
}

#[cfg(feature = "gstreamer")]
async fn play_local(settings: Settings) -> Result<(), Error> {
    use mediafeeder_local::LocalPlayer;
    use mediafeeder_sync::{
        events,
        synchronizer::{SessionOptions, Synchronizer},
        transport::TcpConnector,
    };

    let client = mediafeeder_client::client::new(&settings.api_url, settings.token)?;
    let (sender, receiver) = events::channel();
    let player = LocalPlayer::new(sender.clone())?;

    tracing::info!(name = %settings.name, server = %settings.server, "starting session");

    let mut synchronizer = Synchronizer::new(
        player,
        client,
        Box::new(TcpConnector::new(settings.server)),
        (sender, receiver),
        SessionOptions::new(settings.name),
    );

    let quit = synchronizer.events();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, ending session");
            quit.quit();
        }
    });

    synchronizer.session_loop().await?;
    Ok(())
}

#[cfg(not(feature = "gstreamer"))]
async fn play_local(_settings: Settings) -> Result<(), Error> {
    NoLocalBackendSnafu.fail()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mediafeeder-player").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_config_file_fills_missing_options() {
        let config: Config = toml::from_str(
            r#"
            name = "Living room"
            server = "feeder.local:5001"
            api-url = "https://feeder.local/api/"
            "#,
        )
        .unwrap();

        let settings = Settings::resolve(parse(&["local"]), config).unwrap();

        assert_eq!(
            settings,
            Settings {
                name: "Living room".into(),
                server: "feeder.local:5001".into(),
                api_url: "https://feeder.local/api/".into(),
                token: None,
            }
        );
    }

    #[test]
    fn test_command_line_overrides_config_file() {
        let config = Config {
            server: Some("feeder.local:5001".into()),
            api_url: Some("https://feeder.local/api/".into()),
            ..Default::default()
        };

        let settings = Settings::resolve(
            parse(&["--server", "other:6000", "--name", "Bedroom", "local"]),
            config,
        )
        .unwrap();

        assert_eq!(settings.server, "other:6000");
        assert_eq!(settings.name, "Bedroom");
        assert_eq!(settings.api_url, "https://feeder.local/api/");
    }

    #[test]
    fn test_missing_server_is_an_error() {
        let error = Settings::resolve(parse(&["local"]), Config::default()).unwrap_err();

        assert!(matches!(error, Error::MissingOption { option: "server" }));
    }

    #[tokio::test]
    async fn test_missing_config_file_is_empty() {
        let config = Config::load(Path::new("/nonexistent/mediafeeder/config.toml"))
            .await
            .unwrap();

        assert_eq!(config, Config::default());
    }
}
