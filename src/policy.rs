//! Ready-made decision functions
//!
//! A policy is any `FnMut(State) -> Action`. Episode generation and Monte Carlo
//! prediction accept closures directly; randomness should come from a generator the caller
//! hands in, so seeded runs reproduce.

use std::collections::HashMap;

use rand::Rng;

use crate::env::{DiscreteActionSpace, Environment};

/// Pick among all of `env`'s actions uniformly at random, drawing from `rng`
pub fn uniform_random<E, R>(env: &E, mut rng: R) -> impl FnMut(E::State) -> E::Action
where
    E: DiscreteActionSpace,
    R: Rng,
{
    let actions = env.actions();
    move |_| actions[rng.gen_range(0..actions.len())]
}

/// Follow a fixed state-to-action table, taking `fallback` in states it does not cover
pub fn from_table<E: Environment>(
    table: HashMap<E::State, E::Action>,
    fallback: E::Action,
) -> impl FnMut(E::State) -> E::Action {
    move |state| table.get(&state).copied().unwrap_or(fallback)
}
