use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kb_chat::commands::{ask, build, chat, init_config, inspect, show_config, visualize};

#[derive(Parser)]
#[command(name = "kb-chat")]
#[command(about = "Chat with a markdown knowledge base using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed the knowledge base into the vector store
    Build {
        /// Append to the existing store instead of replacing it
        #[arg(long)]
        append: bool,
    },
    /// Start an interactive chat session
    Chat,
    /// Ask a single question and exit
    Ask {
        /// The question to answer
        question: String,
    },
    /// Show what is stored in the vector store
    Inspect,
    /// Render the stored embeddings as an interactive scatter plot
    Visualize {
        /// Target dimensions of the projection (2 or 3)
        #[arg(long, default_value_t = 2)]
        dims: usize,
        /// Output HTML file
        #[arg(long, default_value = "visualization.html")]
        output: PathBuf,
    },
    /// Show or initialize the configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { append } => {
            build(append).await?;
        }
        Commands::Chat => {
            chat().await?;
        }
        Commands::Ask { question } => {
            ask(&question).await?;
        }
        Commands::Inspect => {
            inspect().await?;
        }
        Commands::Visualize { dims, output } => {
            visualize(dims, &output).await?;
        }
        Commands::Config { init } => {
            if init {
                init_config()?;
            } else {
                show_config()?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["kb-chat", "inspect"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Inspect);
        }
    }

    #[test]
    fn build_defaults_to_overwrite() {
        let cli = Cli::try_parse_from(["kb-chat", "build"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Build { append } = parsed.command {
                assert!(!append);
            }
        }
    }

    #[test]
    fn build_append_flag() {
        let cli = Cli::try_parse_from(["kb-chat", "build", "--append"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Build { append } = parsed.command {
                assert!(append);
            }
        }
    }

    #[test]
    fn ask_requires_a_question() {
        let cli = Cli::try_parse_from(["kb-chat", "ask"]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from(["kb-chat", "ask", "What skills are listed?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question } = parsed.command {
                assert_eq!(question, "What skills are listed?");
            }
        }
    }

    #[test]
    fn visualize_defaults() {
        let cli = Cli::try_parse_from(["kb-chat", "visualize"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Visualize { dims, output } = parsed.command {
                assert_eq!(dims, 2);
                assert_eq!(output, PathBuf::from("visualization.html"));
            }
        }
    }

    #[test]
    fn visualize_three_dimensions() {
        let cli = Cli::try_parse_from([
            "kb-chat",
            "visualize",
            "--dims",
            "3",
            "--output",
            "plot.html",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Visualize { dims, output } = parsed.command {
                assert_eq!(dims, 3);
                assert_eq!(output, PathBuf::from("plot.html"));
            }
        }
    }

    #[test]
    fn config_init_flag() {
        let cli = Cli::try_parse_from(["kb-chat", "config", "--init"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { init } = parsed.command {
                assert!(init);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["kb-chat", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["kb-chat", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
