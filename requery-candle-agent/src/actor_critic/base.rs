//! Actor-critic agent.
use super::ActorCriticConfig;
use crate::{
    mlp::Mlp,
    model::SubModel1,
    opt::Optimizer,
    util::{init_uniform, OutDim},
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{
    ops::{log_softmax, softmax},
    VarBuilder, VarMap,
};
use log::{info, trace};
use rand::{distributions::WeightedIndex, rngs::SmallRng, Rng, SeedableRng};
use requery_core::{
    error::RequeryError,
    record::{Record, RecordValue},
    ActionCatalogue, ActionSample, Agent, Configurable, EpisodeState, Policy, Trajectory,
    FEATURE_DIM,
};
use std::path::Path;

/// Actor-critic agent with a softmax policy and a learned value baseline.
///
/// Both networks share one [`VarMap`] and one optimizer. The update walks the transitions
/// of an episode in order and takes one optimizer step per transition on
///
/// `-log pi(a_t|s_t) * (G_t - V(s_t)) + 0.5 * (V(s_t) - G_t)^2`
///
/// where the advantage `G_t - V(s_t)` is treated as a constant. Log-probabilities are
/// recomputed with the current parameters rather than taken from the trajectory.
///
/// In training mode actions are sampled from the policy. In evaluation mode the most
/// probable action is taken.
pub struct ActorCritic {
    catalogue: ActionCatalogue,
    device: Device,
    varmap: VarMap,
    policy: Mlp,
    value: Mlp,
    opt: Optimizer,
    discount_factor: f64,
    train: bool,
    n_updates: usize,
    rng: SmallRng,
}

impl ActorCritic {
    fn input(&self, features: &[f32; FEATURE_DIM]) -> Result<Tensor> {
        Ok(Tensor::from_slice(features, (1, FEATURE_DIM), &self.device)?)
    }

    /// Action probabilities for the given state features.
    pub fn probs(&self, features: &[f32; FEATURE_DIM]) -> Result<Vec<f32>> {
        let logits = self.policy.forward(&self.input(features)?)?;
        Ok(softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()?)
    }

    /// Estimated return of the given state features.
    pub fn value(&self, features: &[f32; FEATURE_DIM]) -> Result<f32> {
        let v = self.value.forward(&self.input(features)?)?;
        Ok(v.flatten_all()?.get(0)?.to_scalar::<f32>()?)
    }

    /// The actions of the agent.
    pub fn catalogue(&self) -> &ActionCatalogue {
        &self.catalogue
    }

    fn update_transition(
        &mut self,
        features: &[f32; FEATURE_DIM],
        action_index: usize,
        ret: f32,
    ) -> Result<(f32, f32)> {
        if action_index >= self.catalogue.len() {
            return Err(RequeryError::InvalidAction {
                index: action_index,
                count: self.catalogue.len(),
            }
            .into());
        }

        let x = self.input(features)?;
        let logp = log_softmax(&self.policy.forward(&x)?, D::Minus1)?
            .squeeze(0)?
            .get(action_index)?;
        let v = self.value.forward(&x)?.flatten_all()?.get(0)?;
        let advantage = ret - v.to_scalar::<f32>()?;

        let loss_actor = logp.affine(-advantage as f64, 0.0)?;
        let loss_critic = v.affine(1.0, -ret as f64)?.sqr()?.affine(0.5, 0.0)?;
        self.opt.backward_step(&(&loss_actor + &loss_critic)?)?;

        Ok((loss_actor.to_scalar()?, loss_critic.to_scalar()?))
    }
}

impl Policy for ActorCritic {
    fn sample(&mut self, state: &EpisodeState) -> Result<ActionSample> {
        let probs = self.probs(&state.features)?;
        let index = match self.train {
            true => self.rng.sample(WeightedIndex::new(&probs)?),
            false => probs
                .iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(best, max), (i, &p)| match p > max {
                    true => (i, p),
                    false => (best, max),
                })
                .0,
        };
        trace!("ActorCritic::sample: probs {:?}, index {}", probs, index);

        Ok(ActionSample {
            index,
            log_prob: Some(probs[index].ln()),
        })
    }
}

impl Configurable for ActorCritic {
    type Config = ActorCriticConfig;

    fn build(config: Self::Config, catalogue: ActionCatalogue) -> Result<Self> {
        let device = config.device.to_candle()?;
        let mut policy_config = config.policy_config;
        policy_config.set_out_dim(catalogue.len());
        let mut value_config = config.value_config;
        value_config.set_out_dim(1);

        let varmap = VarMap::new();
        let policy = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).set_prefix("actor");
            Mlp::build(vb, policy_config)?
        };
        let value = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).set_prefix("critic");
            Mlp::build(vb, value_config)?
        };
        init_uniform(&varmap, config.seed)?;
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self {
            catalogue,
            device,
            varmap,
            policy,
            value,
            opt,
            discount_factor: config.discount_factor,
            train: config.train,
            n_updates: 0,
            rng: SmallRng::seed_from_u64(config.seed),
        })
    }
}

impl Agent for ActorCritic {
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn update(&mut self, trajectory: Trajectory) -> Result<Record> {
        let returns = trajectory.discounted_returns(self.discount_factor);
        let n = trajectory.len().max(1) as f32;
        let mut loss_actor = 0f32;
        let mut loss_critic = 0f32;

        for (t, ret) in trajectory.iter().zip(returns.iter()) {
            let (la, lc) = self.update_transition(&t.state, t.action_index, *ret)?;
            loss_actor += la;
            loss_critic += lc;
            self.n_updates += 1;
        }

        Ok(Record::from_slice(&[
            ("loss_actor", RecordValue::Scalar(loss_actor / n)),
            ("loss_critic", RecordValue::Scalar(loss_critic / n)),
            ("n_updates", RecordValue::Scalar(self.n_updates as f32)),
        ]))
    }

    /// Saves the parameters of both networks as safetensors.
    fn save_params(&self, path: &Path) -> Result<()> {
        self.varmap
            .save(path)
            .with_context(|| format!("Failed to save parameters to {:?}", path))?;
        info!("Save actor-critic parameters to {:?}", path);
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.varmap
            .load(path)
            .with_context(|| format!("Failed to load parameters from {:?}", path))?;
        info!("Load actor-critic parameters from {:?}", path);
        Ok(())
    }
}
