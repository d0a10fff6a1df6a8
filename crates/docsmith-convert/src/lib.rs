//! Document conversion engine.
//!
//! Maps a `(source extension, target format)` pair onto a fixed table of
//! external tool invocations, runs the tool under a deadline, and hands back
//! the produced artifact. Nothing here touches the database or HTTP layer.

pub mod capability;
pub mod dispatcher;
pub mod error;
pub mod plan;
pub mod runner;

pub use capability::{CapabilityMap, ToolCapability};
pub use dispatcher::{ConvertOptions, Dispatcher};
pub use error::ConvertError;
pub use plan::{ConversionKind, RasterOptions, ToolInvocation, ToolKind, ToolchainPaths};
pub use runner::{ToolOutput, ToolRunner};
