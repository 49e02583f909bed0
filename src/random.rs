/*!

Random draw sources.

Named generators are declared with [`define_rng!`] and stored in the [`Context`]; each one is
seeded from the base seed set by [`ContextRandomExt::init_random`] offset by a hash of its name,
and created lazily on first use. A sequential sweep consumes a single named generator in one
global order, which is what makes its output reproducible byte for byte.

A parallel sweep cannot share that order, so each replicate gets its own generator from
[`replicate_rng`], seeded from the base seed and a label naming the replicate.

The simulation engine itself only needs uniform draws on the open interval (0, 1), expressed by
[`DrawSource`]. Every [`Rng`] is one.

*/

use std::any::{Any, TypeId};

use log::trace;
use rand::{
    distr::{Distribution, Open01},
    rngs::StdRng,
    Rng,
    SeedableRng,
};

use crate::{
    context::{Context, DataPlugin},
    hashing::{hash_str, HashMap},
    type_of,
};

pub trait RngId: Any {
    #![allow(non_upper_case_globals)]
    const new: &'static dyn Fn(u64) -> Self;
    const name: &'static str;
    type RngType: SeedableRng;
    fn rng(&mut self) -> &mut Self::RngType;
}

struct RngPlugin {
    base_seed: u64,
    rng_map: HashMap<TypeId, Box<dyn Any>>,
}

impl RngPlugin {
    fn clear(&mut self) {
        self.rng_map.clear();
    }

    fn get_rng<R: RngId>(&mut self) -> &mut R::RngType {
        let base_seed = self.base_seed;
        self.rng_map
            .entry(type_of::<R>())
            .or_insert_with(|| {
                let seed_offset = base_seed.wrapping_add(hash_str(R::name));
                Box::new(R::new(seed_offset))
            })
            .downcast_mut::<R>()
            .unwrap() // Only an `R` is ever stored under `type_of::<R>()`
            .rng()
    }
}

impl DataPlugin for RngPlugin {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self = &|| RngPlugin {
        base_seed: 0,
        rng_map: HashMap::default(),
    };
}

/// Gets a mutable reference to the random number generator associated with the given
/// `RngId`.
// This is a private free function so that it's not leaked to the public API.
fn get_rng<R: RngId>(context: &mut Context) -> &mut R::RngType {
    context.get_data_container_mut::<RngPlugin>().get_rng::<R>()
}

pub trait ContextRandomExt {
    /// Sets the base seed and drops every generator created so far, so that each one is
    /// re-seeded on its next use.
    fn init_random(&mut self, base_seed: u64);

    fn base_seed(&self) -> u64;

    /// Gets a random sample from the random number generator associated with the given
    /// `RngId` by applying the specified sampler function. If the Rng has not been used
    /// before, one will be created with the base seed you defined in `init_random`.
    fn sample<R: RngId, T>(&mut self, sampler: impl FnOnce(&mut R::RngType) -> T) -> T;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with base seed {base_seed}");
        let rng_container = self.get_data_container_mut::<RngPlugin>();
        rng_container.base_seed = base_seed;

        // Clear any existing Rngs to ensure they get re-seeded when `get_rng` is called
        rng_container.clear();
    }

    fn base_seed(&self) -> u64 {
        self.get_data_container::<RngPlugin>()
            .map_or(0, |rng_container| rng_container.base_seed)
    }

    fn sample<R: RngId, T>(&mut self, sampler: impl FnOnce(&mut R::RngType) -> T) -> T {
        let rng = get_rng::<R>(self);
        sampler(rng)
    }
}

/// A stream of independent uniform draws on the open interval (0, 1).
pub trait DrawSource {
    fn draw(&mut self) -> f64;
}

impl<R: Rng + ?Sized> DrawSource for R {
    #[inline]
    fn draw(&mut self) -> f64 {
        Open01.sample(self)
    }
}

/// An independent generator for one replicate of a parallel sweep. The same `base_seed` and
/// `label` always produce the same stream.
#[must_use]
pub fn replicate_rng(base_seed: u64, label: &str) -> StdRng {
    StdRng::seed_from_u64(base_seed.wrapping_add(hash_str(label)))
}

#[macro_export]
macro_rules! define_rng {
    ($random_id:ident) => {
        $crate::define_rng!($random_id, $crate::rand::rngs::StdRng);
    };
    ($random_id:ident, $rng_type:ty) => {
        pub struct $random_id {
            rng: $rng_type,
        }

        impl $crate::random::RngId for $random_id {
            #![allow(non_upper_case_globals)]
            type RngType = $rng_type;
            const name: &'static str = stringify!($random_id);
            const new: &'static dyn Fn(u64) -> Self = &|seed| {
                use $crate::rand::SeedableRng;
                Self {
                    rng: <$rng_type>::seed_from_u64(seed),
                }
            };

            fn rng(&mut self) -> &mut Self::RngType {
                &mut self.rng
            }
        }
    };
}
