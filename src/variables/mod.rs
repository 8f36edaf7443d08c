//! Run-derived variables and `${name}` substitution.
//!
//! Checks and the engine write named, typed values here during a run; report
//! templates read them back through [`VariableStore::substitute`]. The store
//! is shared process-wide behind an `Arc` and every `set` is atomic.

mod naming;
mod store;
mod value;

pub use naming::{
    check_variable_name, data_variable_name, run_variable_name, safe_name, safe_url,
    website_variable_name, RunVariable, VariableKind, WebsiteVariable,
};
pub use store::{VariableStore, VariableSummary};
pub use value::{Variable, VariableType, VariableValue};
