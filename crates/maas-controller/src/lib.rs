//! # maas-controller
//!
//! Version-negotiated sessions against a MAAS region controller.
//!
//! A [`Controller`] is created by negotiating a protocol version: each
//! candidate is tried in order until the server answers its version document,
//! after which the credentials are checked with a `whoami` call. The resulting
//! session exposes the raw request primitives (`get`, `get_query`, `get_op`,
//! `post`, `post_file`, `delete`) and resource operations that translate server
//! status codes into semantic [`maas_core::Error`] kinds.
//!
//! ## Example
//!
//! ```no_run
//! use maas_controller::{Controller, MachinesArgs};
//! use maas_core::config::ControllerArgs;
//!
//! # async fn example() -> maas_core::Result<()> {
//! let args = ControllerArgs::new("http://maas.example.com/MAAS/", "consumer:token:secret");
//! let controller = Controller::new(args).await?;
//!
//! if controller.capabilities().contains("networks-management") {
//!     let machines = controller.machines(&MachinesArgs::default()).await?;
//!     println!("{} machines", machines.len());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod files;
pub mod negotiate;
pub mod policy;
pub mod resources;
pub mod session;

pub use files::AddFileArgs;
pub use negotiate::Negotiator;
pub use policy::OperationClass;
pub use resources::{
    AllocateMachineArgs, CreateDeviceArgs, DevicesArgs, MachinesArgs, ReleaseMachinesArgs,
};
pub use session::Controller;

/// Result type for controller operations.
pub type Result<T> = maas_core::Result<T>;
