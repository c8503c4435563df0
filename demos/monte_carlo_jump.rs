use std::{error::Error, fs, path::Path};

use rand::{rngs::StdRng, Rng, SeedableRng};
use rl_tabular::{
    algo::tabular::{MonteCarloConfig, MonteCarloPredictor},
    env::Simulation,
    episode,
    gym::{JumpAction, JumpGame, JumpState},
};

const NUM_EPISODES: usize = 5000;
const NUM_TESTS: usize = 1000;

/// Walk when out of energy, jump over an obstacle directly ahead, otherwise flip a coin
fn random_policy(env: &JumpGame, mut rng: StdRng) -> impl FnMut(JumpState) -> JumpAction + '_ {
    move |JumpState { position, energy }| {
        if energy == 0 {
            JumpAction::Walk
        } else if env.is_obstacle(position + 1) || rng.gen_bool(0.5) {
            JumpAction::Jump
        } else {
            JumpAction::Walk
        }
    }
}

/// Save energy for the obstacles still ahead and walk the last stretch
fn better_policy(env: &JumpGame, mut rng: StdRng) -> impl FnMut(JumpState) -> JumpAction + '_ {
    move |JumpState { position, energy }| {
        if energy == 0 {
            return JumpAction::Walk;
        }
        if env.is_obstacle(position + 1) {
            return JumpAction::Jump;
        }

        let distance_to_goal = env.goal() - position;
        let obstacles_ahead = env.obstacles().filter(|&o| o > position).count();
        if distance_to_goal <= 2 {
            JumpAction::Walk
        } else if distance_to_goal <= 4 && obstacles_ahead > 0 {
            JumpAction::Jump
        } else if obstacles_ahead >= energy as usize {
            JumpAction::Walk
        } else if rng.gen_bool(if energy >= 2 { 0.5 } else { 0.2 }) {
            JumpAction::Jump
        } else {
            JumpAction::Walk
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let path = Path::new("demos/out");
    fs::create_dir_all(path)?;

    let env = JumpGame::default();
    println!("{}", env.render(JumpState::new(0, env.max_energy())));

    let policies: [(&str, Box<dyn FnMut(JumpState) -> JumpAction + '_>); 2] = [
        ("random", Box::new(random_policy(&env, StdRng::seed_from_u64(42)))),
        ("better", Box::new(better_policy(&env, StdRng::seed_from_u64(42)))),
    ];

    for (name, mut policy) in policies {
        let mut sim = Simulation::new(env.clone());
        let evaluation = episode::evaluate(&mut sim, &mut policy, NUM_TESTS, 1000)?;
        println!("{name} policy success rate: {:.2}%", evaluation.success_rate() * 100.0);

        let mut finals: Vec<_> = evaluation.final_states.into_iter().collect();
        finals.sort_unstable();
        for (state, count) in finals {
            println!("  final {state:?}: {count} times");
        }
    }

    let mut predictor = MonteCarloPredictor::new(env.clone(), MonteCarloConfig::default());
    predictor.predict(NUM_EPISODES, &mut random_policy(&env, StdRng::seed_from_u64(42)));

    let mut table: Vec<_> = predictor.value_table().into_iter().collect();
    table.sort_unstable_by_key(|(state, _)| *state);

    let mut wtr = csv::Writer::from_path(path.join("value_function.csv"))?;
    wtr.write_record(["position", "energy", "value", "visits"])?;
    for (state, value) in table {
        let visits = predictor.visit_counts().get(&state).copied().unwrap_or(0);
        wtr.write_record(&[
            state.position.to_string(),
            state.energy.to_string(),
            value.to_string(),
            visits.to_string(),
        ])?;
    }
    wtr.flush()?;

    let start = env.render(JumpState::new(0, env.max_energy()));
    let mut wtr = csv::Writer::from_path(path.join("value_convergence.csv"))?;
    wtr.write_record(["episode", "start_value"])?;
    for (episode, snapshot) in predictor.value_history() {
        let value = snapshot.get(&JumpState::new(0, env.max_energy())).copied().unwrap_or(0.0);
        wtr.write_record(&[episode.to_string(), value.to_string()])?;
    }
    wtr.flush()?;

    println!("value of {start}: {:.3}", predictor.values()[&JumpState::new(0, env.max_energy())]);

    Ok(())
}
