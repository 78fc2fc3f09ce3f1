//! Utilities for interaction of agents and environments.
use crate::{
    record::{NullRecorder, Record, RecordValue, Recorder},
    Agent, Env, Policy, Trajectory, Transition,
};
use anyhow::Result;
use log::{trace, warn};
use std::path::Path;

/// Runs an episode from `query` until the environment reports the end.
pub fn rollout<P, E>(policy: &mut P, env: &mut E, query: &str) -> Result<Trajectory>
where
    P: Policy + ?Sized,
    E: Env,
{
    rollout_with_recorder(policy, env, query, &mut NullRecorder::new())
}

/// Runs an episode like [`rollout`] and writes the record of every step to `recorder`.
///
/// Each step record holds the environment's record together with `step_index`,
/// `action_index` and `reward`.
pub fn rollout_with_recorder<P, E>(
    policy: &mut P,
    env: &mut E,
    query: &str,
    recorder: &mut dyn Recorder,
) -> Result<Trajectory>
where
    P: Policy + ?Sized,
    E: Env,
{
    let mut trajectory = Trajectory::new();
    let mut state = env.reset(query)?;

    loop {
        let sample = policy.sample(&state)?;
        let (step, record_env) = env.step(&state, sample.index)?;
        let mut record = Record::from_slice(&[
            ("step_index", RecordValue::Scalar(step.obs.step_index as f32)),
            ("action_index", RecordValue::Scalar(step.act as f32)),
            ("reward", RecordValue::Scalar(step.reward)),
        ]);
        record.merge_inplace(record_env);
        recorder.write(record);

        trace!(
            "step {}: action {} -> {:?}, reward {:.3}",
            step.obs.step_index,
            step.act,
            step.obs.current_query,
            step.reward
        );
        trajectory.push(Transition {
            state: state.features,
            action_index: step.act,
            log_prob: sample.log_prob,
            reward: step.reward,
            next_state: step.obs.features,
        });

        let is_done = step.is_done();
        state = step.obs;
        if is_done {
            break;
        }
    }

    Ok(trajectory)
}

/// Loads parameters from `path` if the file exists.
///
/// A missing checkpoint is not an error: the agent keeps its current (e.g. untrained)
/// parameters and a warning is logged. Returns `true` if parameters were loaded.
pub fn load_params_or_warn<A: Agent + ?Sized>(agent: &mut A, path: &Path) -> Result<bool> {
    if path.exists() {
        agent.load_params(path)?;
        Ok(true)
    } else {
        warn!(
            "No trained policy found at {:?}, using the untrained policy",
            path
        );
        Ok(false)
    }
}
