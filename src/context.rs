use std::any::{Any, TypeId};

use crate::hashing::HashMap;
use crate::type_of;

/// A type that can live in a [`Context`] as a data container. The constructor is used to create
/// the container the first time it is requested.
pub trait DataPlugin: Any {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self;
}

/// Holds the shared state of a sweep: the random number generators and the parameters.
/// Modules attach their data through extension traits such as
/// [`ContextRandomExt`](crate::random::ContextRandomExt) and
/// [`ContextParametersExt`](crate::parameters::ContextParametersExt).
pub struct Context {
    // This is actually a `HashMap<TypeId, Box<dyn DataPlugin>>`, declared this way so
    // containers can be downcast without an `as_any()` on every plugin.
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Context {
            data_plugins: HashMap::default(),
        }
    }

    /// Returns a mutable reference for the data container for `T`, creating it if it doesn't exist yet.
    pub fn get_data_container_mut<T: DataPlugin>(&mut self) -> &mut T {
        self.data_plugins
            .entry(type_of::<T>())
            .or_insert_with(|| Box::new((T::new)()))
            .downcast_mut::<T>()
            .unwrap() // Will never panic as data container has the matching type
    }

    /// Returns a reference to the data container for `T` if it exists.
    /// If you need a mutable reference or lazy instantiation, use `Context::get_data_container_mut()`.
    #[must_use]
    pub fn get_data_container<T: DataPlugin>(&self) -> Option<&T> {
        self.data_plugins
            .get(&type_of::<T>())
            .and_then(|data| data.downcast_ref::<T>())
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tally(Vec<u32>);
    impl DataPlugin for Tally {
        const new: &'static dyn Fn() -> Self = &|| Tally(vec![]);
    }

    struct Label(&'static str);
    impl DataPlugin for Label {
        const new: &'static dyn Fn() -> Self = &|| Label("unset");
    }

    #[test]
    fn containers_are_created_lazily() {
        let mut context = Context::new();
        assert!(context.get_data_container::<Tally>().is_none());

        {
            let tally: &mut Tally = context.get_data_container_mut();
            tally.0.push(1);
            tally.0.push(2);
        }
        context.get_data_container_mut::<Tally>().0.push(3);

        let tally = context.get_data_container::<Tally>().unwrap();
        assert_eq!(tally.0, vec![1, 2, 3]);
    }

    #[test]
    fn containers_are_keyed_by_type() {
        let mut context = Context::new();
        context.get_data_container_mut::<Tally>().0.push(7);
        context.get_data_container_mut::<Label>().0 = "leaky";

        assert_eq!(context.get_data_container::<Tally>().unwrap().0, vec![7]);
        assert_eq!(context.get_data_container::<Label>().unwrap().0, "leaky");
    }
}
