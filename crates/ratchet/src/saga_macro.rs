//! Macros for reducing saga boilerplate.

/// Build a `Vec<BoxSaga>` from a list of saga expressions, boxing each.
///
/// # Example
///
/// ```ignore
/// use ratchet_core::{compose_sagas, sagas};
///
/// let launcher = compose_sagas(sagas![poller, reporter]);
/// ```
#[macro_export]
macro_rules! sagas {
    () => {
        Vec::<$crate::BoxSaga>::new()
    };
    ($($saga:expr),+ $(,)?) => {
        vec![$(Box::new($saga) as $crate::BoxSaga),+]
    };
}
