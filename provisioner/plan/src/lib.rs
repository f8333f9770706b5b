#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod gateway;
pub mod graph;
pub mod security;
mod site_info;
pub mod subnet;

pub use self::{
    backend::DeployedWorkload,
    graph::{Node, NodeKind, ResourceGraph},
    site_info::{SecretBindings, SiteInfo, WorkloadParams},
};
