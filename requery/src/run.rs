//! Training, evaluation and one-shot rewriting.
use crate::{AgentKind, RequeryConfig};
use anyhow::Result;
use log::info;
use requery_candle_agent::actor_critic::ActorCritic;
use requery_core::{
    record::{LogRecorder, Recorder},
    util::load_params_or_warn,
    Agent, Configurable, DefaultEvaluator, Env, Evaluator, Trainer,
};
use requery_env::{
    default_queries,
    eval::{append_metrics, evaluate_methods, MetricsRow},
    load_domain_corpus, load_queries, Bm25Retriever, QueryRewriteEnv,
};
use requery_tabular_agent::{QTableAgent, ReinforcePolicy};

/// Environment over the corpus of the configured domain.
pub fn build_env(config: &RequeryConfig) -> Result<QueryRewriteEnv<Bm25Retriever>> {
    config.validate()?;
    let corpus = load_domain_corpus(&config.data_dir, &config.domain)?;
    let retriever = Bm25Retriever::new(corpus)?;
    Ok(QueryRewriteEnv::new(
        retriever,
        config.catalogue.clone(),
        config.env_config(),
    ))
}

/// Labelled queries of the evaluation, the built-in medical query if none are configured.
pub fn eval_queries(config: &RequeryConfig) -> Result<Vec<(String, String)>> {
    match &config.queries_path {
        Some(path) => load_queries(path),
        None => Ok(default_queries()),
    }
}

/// Builds the agent of type `A` with the catalogue of `config`.
pub fn build_agent<A: Agent + Configurable>(
    config: &RequeryConfig,
    agent_config: A::Config,
) -> Result<A> {
    config.validate()?;
    A::build(agent_config, config.catalogue.clone())
}

/// Trains an agent of type `A` and saves it to the checkpoint path.
///
/// With `resume`, the checkpoint is loaded first if it exists.
pub fn train_agent<A: Agent + Configurable>(
    config: &RequeryConfig,
    agent_config: A::Config,
    recorder: &mut dyn Recorder,
) -> Result<A> {
    let mut env = build_env(config)?;
    let mut agent: A = build_agent(config, agent_config)?;
    if config.resume && load_params_or_warn(&mut agent, &config.checkpoint())? {
        info!("Resuming from {:?}", config.checkpoint());
    }

    let mut evaluator = match config.eval_interval {
        0 => None,
        _ => {
            let queries = eval_queries(config)?.into_iter().map(|(q, _)| q).collect();
            Some(DefaultEvaluator::new(build_env(config)?, queries))
        }
    };

    let mut trainer = Trainer::build(config.trainer_config());
    trainer.train(
        &mut agent,
        &mut env,
        recorder,
        evaluator.as_mut().map(|e| e as &mut dyn Evaluator<A>),
    )?;
    Ok(agent)
}

/// Trains the configured agent, logging records.
pub fn train(config: &RequeryConfig) -> Result<()> {
    let mut recorder = LogRecorder::new();
    match config.agent {
        AgentKind::Reinforce => {
            train_agent::<ReinforcePolicy>(config, config.reinforce_config(), &mut recorder)?;
        }
        AgentKind::ActorCritic => {
            train_agent::<ActorCritic>(config, config.actor_critic_config(), &mut recorder)?;
        }
        AgentKind::QTable => {
            train_agent::<QTableAgent>(config, config.qtable_config(), &mut recorder)?;
        }
    }
    Ok(())
}

/// Loads the checkpoint into a new agent of type `A` in evaluation mode.
///
/// A missing checkpoint leaves the agent untrained.
pub fn load_agent<A: Agent + Configurable>(
    config: &RequeryConfig,
    agent_config: A::Config,
) -> Result<A> {
    let mut agent: A = build_agent(config, agent_config)?;
    load_params_or_warn(&mut agent, &config.checkpoint())?;
    agent.eval();
    Ok(agent)
}

/// Evaluates the four rewriting methods with `agent` as the learned policy and appends
/// the metrics to the metrics file.
pub fn evaluate_agent<A: Agent>(config: &RequeryConfig, agent: &mut A) -> Result<Vec<MetricsRow>> {
    let mut env = build_env(config)?;
    let queries = eval_queries(config)?;
    let rows = evaluate_methods(&mut env, agent, &queries, &config.domain, config.seed)?;
    append_metrics(&config.metrics_path, &rows)?;
    Ok(rows)
}

/// Evaluates the configured agent.
pub fn evaluate(config: &RequeryConfig) -> Result<Vec<MetricsRow>> {
    match config.agent {
        AgentKind::Reinforce => {
            let mut agent: ReinforcePolicy = load_agent(config, config.reinforce_config())?;
            evaluate_agent(config, &mut agent)
        }
        AgentKind::ActorCritic => {
            let mut agent: ActorCritic = load_agent(config, config.actor_critic_config())?;
            evaluate_agent(config, &mut agent)
        }
        AgentKind::QTable => {
            let mut agent: QTableAgent = load_agent(config, config.qtable_config())?;
            evaluate_agent(config, &mut agent)
        }
    }
}

/// Result of a single rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutcome {
    /// Name of the chosen action.
    pub action: String,

    /// The rewritten query.
    pub rewritten_query: String,

    /// Top document for the original query.
    pub top_before: Option<String>,

    /// Top document for the rewritten query.
    pub top_after: Option<String>,

    /// Reward of the rewrite.
    pub reward: f32,
}

/// Applies one action chosen by `agent` to `query`.
pub fn rewrite_with<A: Agent>(
    config: &RequeryConfig,
    agent: &mut A,
    query: &str,
) -> Result<RewriteOutcome> {
    let mut env = build_env(config)?;
    let state = env.reset(query)?;
    let sample = agent.sample(&state)?;
    let (step, _) = env.step(&state, sample.index)?;

    Ok(RewriteOutcome {
        action: env.catalogue().get(sample.index)?.name().to_string(),
        rewritten_query: step.info.rewritten_query,
        top_before: step.info.before.first().map(|d| d.doc.clone()),
        top_after: step.info.after.first().map(|d| d.doc.clone()),
        reward: step.reward,
    })
}

/// Rewrites `query` once with the configured agent.
pub fn rewrite(config: &RequeryConfig, query: &str) -> Result<RewriteOutcome> {
    match config.agent {
        AgentKind::Reinforce => {
            let mut agent: ReinforcePolicy = load_agent(config, config.reinforce_config())?;
            rewrite_with(config, &mut agent, query)
        }
        AgentKind::ActorCritic => {
            let mut agent: ActorCritic = load_agent(config, config.actor_critic_config())?;
            rewrite_with(config, &mut agent, query)
        }
        AgentKind::QTable => {
            let mut agent: QTableAgent = load_agent(config, config.qtable_config())?;
            rewrite_with(config, &mut agent, query)
        }
    }
}
