#![no_std]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod config;
pub(crate) mod container;
pub(crate) mod dependency_resolver;
pub(crate) mod errors;
pub(crate) mod flavor;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod key;
pub(crate) mod registration;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod scope;
pub(crate) mod tracker;

pub mod global;
pub mod sync;
pub mod unsync;

pub use any::TypeInfo;
pub use config::{Config, MissingPolicy};
pub use container::Container;
pub use dependency_resolver::DependencyResolver;
pub use errors::{CyclePath, InstantiateErrorKind, ResolveErrorKind};
pub use flavor::{Flavor, Injectable};
pub use inject::{Inject, InjectOptional};
pub use instantiator::Instantiator;
pub use key::ServiceKey;
pub use resolver::Resolver;
pub use scope::{Scope, ScopeId};
pub use tracker::ContainerId;
