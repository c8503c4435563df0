use std::{error::Error, fs, path::Path};

use rl_tabular::{
    algo::tabular::{QLearningAgent, QLearningConfig},
    decay,
    env::DiscreteStateSpace,
    gym::{GridAction, GridWorld},
};

const NUM_EPISODES: usize = 500;

fn arrow(action: GridAction) -> char {
    match action {
        GridAction::Up => '^',
        GridAction::Right => '>',
        GridAction::Down => 'v',
        GridAction::Left => '<',
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let path = Path::new("demos/out");
    fs::create_dir_all(path)?;

    let env = GridWorld::default();
    let mut agent = QLearningAgent::new(
        env.clone(),
        QLearningConfig {
            seed: Some(42),
            ..Default::default()
        },
    );

    // epsilon x0.9 every 100 episodes
    let schedule = decay::Step::new(0.9, 0.1, 0.0, 100.0)?;
    let rewards = agent.train(NUM_EPISODES, &schedule);

    let mut wtr = csv::Writer::from_path(path.join("rewards.csv"))?;
    wtr.write_record(["episode", "reward"])?;
    for (i, reward) in rewards.iter().enumerate() {
        wtr.write_record(&[i.to_string(), reward.to_string()])?;
    }
    wtr.flush()?;

    let policy = agent.optimal_policy();
    for row in 0..env.size() {
        let line: String = (0..env.size())
            .map(|col| match (row, col) {
                cell if cell == env.goal() => 'G',
                cell if env.is_obstacle(cell) => '#',
                cell => policy.get(&cell).copied().map(arrow).unwrap_or('?'),
            })
            .collect();
        println!("{line}");
    }

    let mut wtr = csv::Writer::from_path(path.join("q_values.csv"))?;
    wtr.write_record(["row", "col", "up", "right", "down", "left"])?;
    for (index, values) in agent.q_table().rows().enumerate() {
        let (row, col) = env.state_from_index(index)?;
        let mut record = vec![row.to_string(), col.to_string()];
        record.extend(values.iter().map(f32::to_string));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;

    let route = agent.greedy_path(100)?;
    println!("greedy path: {route:?}");
    println!("path length: {} steps", route.len() - 1);

    Ok(())
}
