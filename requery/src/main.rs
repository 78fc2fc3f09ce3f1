use anyhow::Result;
use clap::{Parser, Subcommand};
use requery::{AgentKind, RequeryConfig};

/// Train and evaluate query rewriting agents
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// YAML configuration, defaults are used if not given
    #[arg(short, long)]
    config: Option<String>,

    /// Agent, overrides the configuration
    #[arg(short, long, value_enum)]
    agent: Option<AgentKind>,

    /// Checkpoint path, overrides the configuration
    #[arg(long)]
    checkpoint: Option<String>,

    /// Domain of the corpus, overrides the configuration
    #[arg(short, long)]
    domain: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the agent and save its parameters
    Train {
        /// Number of episodes, overrides the configuration
        #[arg(short, long)]
        episodes: Option<usize>,

        /// Continue from the checkpoint if it exists
        #[arg(short, long, default_value_t = false)]
        resume: bool,
    },

    /// Compare rewriting methods and append the metrics
    Evaluate,

    /// Rewrite a query once with the trained agent
    Rewrite {
        /// Query to rewrite
        #[arg(default_value = "treatment for diabetes")]
        query: String,
    },
}

fn load_config(args: &Args) -> Result<RequeryConfig> {
    let mut config = match &args.config {
        Some(path) => RequeryConfig::load(path)?,
        None => RequeryConfig::default(),
    };
    if let Some(agent) = args.agent {
        config = config.agent(agent);
    }
    if let Some(path) = &args.checkpoint {
        config = config.checkpoint_path(path.clone());
    }
    if let Some(domain) = &args.domain {
        config = config.domain(domain.clone());
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Command::Train { episodes, resume } => {
            let resume = resume || config.resume;
            let mut config = config.resume(resume);
            if let Some(n) = episodes {
                config = config.num_episodes(n);
            }
            requery::train(&config)?;
        }
        Command::Evaluate => {
            println!("\nEvaluation Results");
            println!("------------------");
            for row in requery::evaluate(&config)? {
                println!(
                    "{:<16} recall@k {:.3}  mean rank {:.3}",
                    row.method, row.recall_at_k, row.mean_rank
                );
            }
        }
        Command::Rewrite { query } => {
            let outcome = requery::rewrite(&config, &query)?;
            println!("\nInitial Query: {}", query);
            if let Some(doc) = &outcome.top_before {
                println!("Initial Top Result: {}", doc);
            }
            println!("\nChosen Action: {}", outcome.action);
            println!("Rewritten Query: {}", outcome.rewritten_query);
            if let Some(doc) = &outcome.top_after {
                println!("Top Result After Rewrite: {}", doc);
            }
            println!("Reward: {:.3}", outcome.reward);
        }
    }

    Ok(())
}
