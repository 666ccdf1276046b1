//! Export pipeline.
//!
//! - [`ResourceFilter`]: which steps run and which classes are rendered
//! - [`ExportSession`]: discovery, post-processing, reference registration
//!   and rendering of each step
//! - [`output`]: variables and import files, validation and writing

mod filter;
pub mod output;
mod session;

pub use filter::{ResourceFilter, ALWAYS_RUN_STEP};
pub use output::{render_imports, render_variables, validate_files, write_files, IMPORT_FILE, VARIABLES_FILE};
pub use session::{ExportSession, StepContext, StepOutput};
