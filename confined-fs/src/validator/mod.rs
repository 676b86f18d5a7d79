pub mod caller_context;
pub mod confinement_root;
pub mod path_history;
