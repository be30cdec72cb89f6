//! PromptGate CLI - validate prompts from the command line

use clap::Parser;
use promptgate_core::{
    CustomRules, GateConfig, PromptGate, Tier, ValidationMode, ValidationOptions,
};

#[derive(Parser)]
#[command(name = "promptgate")]
#[command(about = "PromptGate - Validation firewall for LLM-bound text")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Validate a prompt and print the decision as JSON
    Check {
        /// The prompt text to validate
        prompt: String,

        /// Completion API key; falls back to PROMPTGATE_API_KEY. Without
        /// one, prompts needing AI arbitration fail closed.
        #[arg(long)]
        api_key: Option<String>,

        /// Use tight AI timeouts
        #[arg(long)]
        fast: bool,

        /// Tier for custom-rule quotas
        #[arg(long, default_value = "internal")]
        tier: String,

        /// Extra blacklist phrase (repeatable)
        #[arg(long = "blacklist")]
        blacklist: Vec<String>,

        /// Extra whitelist phrase (repeatable)
        #[arg(long = "whitelist")]
        whitelist: Vec<String>,
    },
    /// Print the configured model fallback chains
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    match cli.command {
        Some(Commands::Check {
            prompt,
            api_key,
            fast,
            tier,
            blacklist,
            whitelist,
        }) => {
            let config = GateConfig {
                mode: if fast {
                    ValidationMode::Fast
                } else {
                    ValidationMode::Standard
                },
                api_key: api_key.or_else(|| std::env::var("PROMPTGATE_API_KEY").ok()),
                ..Default::default()
            };

            let tier: Tier = serde_json::from_value(serde_json::Value::String(tier))
                .map_err(|_| anyhow::anyhow!("unknown tier"))?;

            let custom_rules = (!blacklist.is_empty() || !whitelist.is_empty()).then_some(
                CustomRules {
                    whitelist,
                    blacklist,
                },
            );

            let options = ValidationOptions {
                tier,
                custom_rules,
                ..Default::default()
            };

            let gate = PromptGate::new(config);
            let decision = gate.validate(&prompt, &options).await?;
            println!("{}", serde_json::to_string_pretty(&decision)?);

            if !decision.safe {
                std::process::exit(1);
            }
        }
        Some(Commands::Models) => {
            let config = ValidationMode::Standard.escalator_config();
            println!("pass 1 fallback chain:");
            for model in &config.pass1_models {
                println!("  {}. {} (${}/M)", model.priority, model.name, model.cost_per_million);
            }
            println!("pass 2 fallback chain:");
            for model in &config.pass2_models {
                println!("  {}. {} (${}/M)", model.priority, model.name, model.cost_per_million);
            }
        }
        None => {
            println!("PromptGate v0.1.0 - Use --help for commands");
        }
    }

    Ok(())
}
