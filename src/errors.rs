mod instantiate;
mod resolve;

pub use instantiate::InstantiateErrorKind;
pub use resolve::{CyclePath, ResolveErrorKind};
