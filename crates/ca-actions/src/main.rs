//! `creative-agent` command-line interface

use anyhow::Context;
use base64::Engine;
use ca_actions::{Actions, AppConfig, GenerateImageRequest, GenerateStoryRequest};
use ca_core::{AgentError, ConfigError, CreativeAgentInput};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "creative-agent", version, about = "Story and image generation pipeline")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "CREATIVE_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Workers AI account id
    #[arg(long, global = true, env = "CLOUDFLARE_ACCOUNT_ID")]
    account_id: Option<String>,

    /// Workers AI API token
    #[arg(long, global = true, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a random scene prompt
    RandomPrompt,

    /// Generate an image from a prompt
    Image {
        #[arg(long)]
        prompt: String,
        /// Write the decoded image here instead of printing base64
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate a story from a prompt
    Story {
        #[arg(long)]
        prompt: String,
    },

    /// Run the full creative pipeline
    Agent(AgentArgs),
}

#[derive(Debug, Args)]
struct AgentArgs {
    #[arg(long)]
    instruction: String,
    #[arg(long)]
    tone: Option<String>,
    #[arg(long)]
    style: Option<String>,
    #[arg(long)]
    art_style: Option<String>,
    #[arg(long)]
    lighting: Option<String>,
    #[arg(long)]
    color_palette: Option<String>,
    #[arg(long)]
    lens: Option<String>,
    #[arg(long)]
    rendering: Option<String>,
    #[arg(long)]
    detail_level: Option<String>,
    /// Also render the image prompt
    #[arg(long)]
    generate_image: bool,
    /// Write the decoded image here instead of printing base64
    #[arg(long, requires = "generate_image")]
    image_out: Option<PathBuf>,
}

impl AgentArgs {
    fn into_input(self) -> CreativeAgentInput {
        CreativeAgentInput {
            instruction: self.instruction,
            tone: self.tone,
            style: self.style,
            generate_image: self.generate_image,
            image_art_style: self.art_style,
            image_lighting: self.lighting,
            image_color_palette: self.color_palette,
            image_lens: self.lens,
            image_rendering: self.rendering,
            detail_level: self.detail_level,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = error_code(&err);
            // Agent errors already carry their cause in the message
            if err.downcast_ref::<AgentError>().is_some() {
                eprintln!("error[{code}]: {err}");
            } else {
                eprintln!("error[{code}]: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(err) = err.downcast_ref::<AgentError>() {
        err.code()
    } else if err.downcast_ref::<ConfigError>().is_some() {
        "config"
    } else {
        "internal"
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(account_id) = &cli.account_id {
        config.workers.account_id.clone_from(account_id);
    }
    if let Some(api_token) = &cli.api_token {
        config.workers.api_token.clone_from(api_token);
    }
    Ok(config.with_env())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let actions = Actions::from_config(&config);

    let output = match cli.command {
        Command::RandomPrompt => Value::String(actions.create_random_prompt()),
        Command::Image { prompt, out } => {
            let response = actions.generate_image(GenerateImageRequest { prompt }).await?;
            match out {
                Some(path) => serde_json::json!({
                    "imageFile": path,
                    "bytes": write_image(&path, &response.image_base64)?,
                }),
                None => serde_json::to_value(response)?,
            }
        }
        Command::Story { prompt } => {
            serde_json::to_value(actions.generate_story(GenerateStoryRequest { prompt }).await?)?
        }
        Command::Agent(args) => {
            let image_out = args.image_out.clone();
            let mut output = actions.run_creative_agent(args.into_input()).await?;
            let written = match (&image_out, output.image_base64.take()) {
                (Some(path), Some(image)) => Some((path, write_image(path, &image)?)),
                (None, image) => {
                    output.image_base64 = image;
                    None
                }
                (Some(_), None) => None,
            };

            let mut value = serde_json::to_value(output)?;
            if let Some((path, bytes)) = written {
                value["imageFile"] = serde_json::json!(path);
                value["imageBytes"] = serde_json::json!(bytes);
            }
            value
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn write_image(path: &Path, image_base64: &str) -> anyhow::Result<usize> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(image_base64)
        .context("image is not valid base64")?;
    std::fs::write(path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "image written");
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn agent_args_map_to_input() {
        let cli = Cli::try_parse_from([
            "creative-agent",
            "agent",
            "--instruction",
            "A lighthouse keeper befriends a sea monster",
            "--tone",
            "eerie",
            "--lens",
            "fisheye",
            "--generate-image",
        ])
        .unwrap();

        let Command::Agent(args) = cli.command else {
            panic!("expected agent subcommand");
        };
        let input = args.into_input();
        assert_eq!(input.tone.as_deref(), Some("eerie"));
        assert_eq!(input.image_lens.as_deref(), Some("fisheye"));
        assert_eq!(input.style, None);
        assert!(input.generate_image);
    }

    #[test]
    fn image_out_requires_generate_image() {
        let result = Cli::try_parse_from([
            "creative-agent",
            "agent",
            "--instruction",
            "x",
            "--image-out",
            "/tmp/x.png",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn log_format_parses() {
        let cli = Cli::try_parse_from(["creative-agent", "--log-format", "json", "random-prompt"])
            .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn error_codes() {
        let err = anyhow::Error::from(AgentError::Validation("x".to_string()));
        assert_eq!(error_code(&err), "validation");
        assert_eq!(error_code(&anyhow::anyhow!("boom")), "internal");
    }

    #[test]
    fn write_image_decodes_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        assert_eq!(write_image(&path, "aGVsbG8=").unwrap(), 5);
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert!(write_image(&path, "***").is_err());
    }
}
