use anyhow::Result;
use requery::{
    run::{build_env, load_agent, rewrite_with, train_agent},
    AgentKind, RequeryConfig,
};
use requery_candle_agent::actor_critic::ActorCritic;
use requery_core::{
    record::{BufferedRecorder, NullRecorder},
    Agent, Env, EpisodeState,
};
use requery_env::token_overlap;
use requery_tabular_agent::{QTableAgent, ReinforcePolicy};
use std::fs;
use tempdir::TempDir;

const GOLD: &str = "Metformin is the first line treatment for type 2 diabetes.";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Writes a corpus for the `medical` domain and returns a configuration using it.
fn setup(dir: &TempDir, docs: &[&str]) -> Result<RequeryConfig> {
    let domain_dir = dir.path().join("data").join("medical");
    fs::create_dir_all(&domain_dir)?;
    fs::write(domain_dir.join("corpus.txt"), docs.join("\n"))?;

    Ok(RequeryConfig::default()
        .data_dir(dir.path().join("data").to_string_lossy())
        .checkpoint_path(dir.path().join("models").join("policy").to_string_lossy())
        .metrics_path(dir.path().join("results").join("metrics.csv").to_string_lossy()))
}

fn corpus() -> Vec<&'static str> {
    vec![
        GOLD,
        "Insulin therapy is recommended when glucose targets are not met.",
        "Aspirin is used for pain relief.",
    ]
}

fn state() -> EpisodeState {
    EpisodeState::new("treatment for diabetes", &[], 0)
}

#[test]
fn test_identity_rewrite_on_single_document() -> Result<()> {
    init_logger();
    let dir = TempDir::new("requery")?;
    let config = setup(&dir, &[GOLD])?;
    let mut env = build_env(&config)?;
    let identity = env.catalogue().identity_index();

    let state = env.reset("treatment for diabetes")?;
    let (step, record) = env.step(&state, identity)?;

    let grounding = token_overlap("treatment for diabetes", GOLD);
    assert!((grounding - 2.0 / 3.0).abs() < 1e-6);
    assert_eq!(record.get_scalar("rank_gain")?, 0.0);
    assert_eq!(record.get_scalar("length_penalty")?, 0.0);
    assert!((step.reward - (0.5 + 0.3 * grounding)).abs() < 1e-6);
    assert!((step.reward - 0.7).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_end_to_end_each_agent() -> Result<()> {
    init_logger();
    for kind in [AgentKind::Reinforce, AgentKind::ActorCritic, AgentKind::QTable] {
        let dir = TempDir::new("requery")?;
        let config = setup(&dir, &corpus())?.agent(kind).num_episodes(4);

        requery::train(&config)?;
        assert!(config.checkpoint().exists(), "{:?}", kind);

        let rows = requery::evaluate(&config)?;
        assert_eq!(rows.len(), 4);
        for row in rows.iter() {
            assert!((0.0..=1.0).contains(&row.recall_at_k));
            assert!(row.mean_rank >= 1.0 && row.mean_rank <= 4.0);
        }
        let text = fs::read_to_string(&config.metrics_path)?;
        assert_eq!(text.lines().count(), 5);

        let outcome = requery::rewrite(&config, "treatment for diabetes")?;
        assert!(outcome.top_before.is_some());
        assert!(outcome.rewritten_query.starts_with("treatment for diabetes"));
    }
    Ok(())
}

#[test]
fn test_training_records_every_episode() -> Result<()> {
    init_logger();
    let dir = TempDir::new("requery")?;
    let config = setup(&dir, &corpus())?.num_episodes(5);
    let mut recorder = BufferedRecorder::new();
    train_agent::<ReinforcePolicy>(&config, config.reinforce_config(), &mut recorder)?;

    assert_eq!(recorder.len(), 5);
    for (i, record) in recorder.iter().enumerate() {
        assert_eq!(record.get_scalar("episode")?, i as f32);
        assert_eq!(record.get_scalar("episode_len")?, 3.0);
        assert!(record.get_scalar("episode_return")?.is_finite());
    }
    Ok(())
}

#[test]
fn test_zero_episodes_saves_initial_params() -> Result<()> {
    init_logger();
    let dir = TempDir::new("requery")?;

    // tabular policy: the checkpoint holds the uniform distribution
    let config = setup(&dir, &corpus())?.num_episodes(0);
    train_agent::<ReinforcePolicy>(&config, config.reinforce_config(), &mut NullRecorder::new())?;
    let agent: ReinforcePolicy = load_agent(&config, config.reinforce_config())?;
    assert_eq!(agent.action_probs(), &[0.25; 4]);

    // network: the checkpoint equals a freshly built agent
    let config = config.agent(AgentKind::ActorCritic);
    train_agent::<ActorCritic>(&config, config.actor_critic_config(), &mut NullRecorder::new())?;
    let fresh: ActorCritic = requery::run::build_agent(&config, config.actor_critic_config())?;
    let loaded: ActorCritic = load_agent(&config, config.actor_critic_config().seed(1))?;
    assert_eq!(fresh.probs(&state().features)?, loaded.probs(&state().features)?);
    Ok(())
}

#[test]
fn test_resume_from_checkpoint() -> Result<()> {
    init_logger();
    let dir = TempDir::new("requery")?;
    let config = setup(&dir, &corpus())?.agent(AgentKind::QTable).num_episodes(6);
    let trained: QTableAgent =
        train_agent(&config, config.qtable_config(), &mut NullRecorder::new())?;
    let n_states = trained.n_states();
    assert!(n_states > 0);

    // resuming without further episodes keeps the learned table
    let config = config.num_episodes(0).resume(true);
    let resumed: QTableAgent =
        train_agent(&config, config.qtable_config(), &mut NullRecorder::new())?;
    assert_eq!(resumed.n_states(), n_states);
    let s = build_env(&config)?.reset("treatment for diabetes")?.features;
    assert!(trained.q_values(&s).is_some());
    assert_eq!(resumed.q_values(&s), trained.q_values(&s));

    // further training continues from there
    let config = config.num_episodes(3);
    let continued: QTableAgent =
        train_agent(&config, config.qtable_config(), &mut NullRecorder::new())?;
    assert!(continued.n_states() >= n_states);
    Ok(())
}

#[test]
fn test_intermediate_and_best_checkpoints() -> Result<()> {
    init_logger();
    let dir = TempDir::new("requery")?;
    let config = setup(&dir, &corpus())?
        .num_episodes(4)
        .save_interval(2)
        .eval_interval(2);
    let mut recorder = BufferedRecorder::new();
    train_agent::<ReinforcePolicy>(&config, config.reinforce_config(), &mut recorder)?;

    let checkpoint = config.checkpoint_path.clone();
    for suffix in [".ep2", ".ep4", ".best"] {
        assert!(fs::metadata(format!("{}{}", checkpoint, suffix)).is_ok(), "{}", suffix);
    }
    assert!(fs::metadata(format!("{}.ep3", checkpoint)).is_err());

    let evaluated: Vec<_> = recorder
        .iter()
        .filter_map(|r| r.get_scalar("eval_return").ok())
        .collect();
    assert_eq!(evaluated.len(), 2);
    assert!(evaluated.iter().all(|x| x.is_finite()));
    Ok(())
}

#[test]
fn test_missing_checkpoint_falls_back_to_untrained() -> Result<()> {
    init_logger();
    let dir = TempDir::new("requery")?;
    let config = setup(&dir, &corpus())?;
    assert!(!config.checkpoint().exists());

    let mut agent: ReinforcePolicy = load_agent(&config, config.reinforce_config())?;
    assert!(!agent.is_train());
    assert_eq!(agent.action_probs(), &[0.25; 4]);

    let outcome = rewrite_with(&config, &mut agent, "treatment for diabetes")?;
    assert!(outcome.reward.is_finite());
    assert_eq!(requery::evaluate(&config)?.len(), 4);
    Ok(())
}

#[test]
fn test_missing_corpus_is_error() -> Result<()> {
    let dir = TempDir::new("requery")?;
    let config = RequeryConfig::default()
        .data_dir(dir.path().to_string_lossy())
        .checkpoint_path(dir.path().join("policy").to_string_lossy());
    assert!(requery::train(&config).is_err());
    assert!(!config.checkpoint().exists());
    Ok(())
}

#[test]
fn test_zero_max_steps_is_rejected() -> Result<()> {
    let dir = TempDir::new("requery")?;
    let config = RequeryConfig {
        max_steps: 0,
        ..setup(&dir, &corpus())?
    };
    assert!(build_env(&config).is_err());
    assert!(requery::train(&config).is_err());
    assert!(!config.checkpoint().exists());
    Ok(())
}
