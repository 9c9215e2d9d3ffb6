//! Macros for ergonomic machine construction.

/// Build a [`TransitionTable`](crate::machine::TransitionTable) from nested
/// literals.
///
/// Handlers are anything convertible into a
/// [`Handler`](crate::machine::Handler): a target state name for declarative
/// transitions, or a `Handler::func` / `Handler::coroutine`. A state with an
/// empty block is declared without outgoing actions.
///
/// # Example
///
/// ```
/// use machina::machine::Handler;
/// use machina::transitions;
///
/// let table = transitions! {
///     "idle" => {
///         "run" => "running",
///         "jump" => Handler::func(|_m, _s, _args| Ok("running")),
///     },
///     "running" => { "stop" => "idle" },
///     "done" => {},
/// };
///
/// assert!(table.contains_state("done"));
/// assert_eq!(table.handler("idle", "jump").map(|h| h.kind()), Some("func"));
/// ```
#[macro_export]
macro_rules! transitions {
    (
        $(
            $state:expr => {
                $( $action:expr => $handler:expr ),* $(,)?
            }
        ),* $(,)?
    ) => {{
        #[allow(unused_mut)]
        let mut table = $crate::machine::TransitionTable::new();
        $(
            table.declare($state);
            $( table.insert($state, $action, $handler); )*
        )*
        table
    }};
}
