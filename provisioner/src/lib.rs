#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use vidsite_provisioner_core::{Error, IpNet, PROVISIONER_NAME};
pub use vidsite_provisioner_engine as engine;
pub use vidsite_provisioner_plan as plan;
pub use vidsite_provisioner_runtime as runtime;
