// Every pseudo-random decision in Plume goes through this module. Seeding
// the generator reproduces pointer colors and click-splat jitter in tests.

use rand::distributions::{Alphanumeric, Distribution, Standard};
use rand::prelude::*;
use rand_pcg::Pcg32;
use rand_seeder::Seeder;
use std::cell::RefCell;
use std::thread_local;

thread_local!(
    static PLUME_RNG: RefCell<Pcg32> = {
        let rng = Pcg32::from_entropy();
        RefCell::new(rng)
    }
);

pub fn init_from_seed(optional_seed: &Option<String>) {
    let seed = optional_seed.as_ref().cloned().unwrap_or_else(|| {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    });

    PLUME_RNG.with(|rng| rng.replace(Seeder::from(seed).make_rng()));
}

pub fn gen<T>() -> T
where
    Standard: Distribution<T>,
{
    PLUME_RNG.with(|rng| rng.borrow_mut().gen::<T>())
}
