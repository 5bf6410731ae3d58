//! hugo-archive: maintenance tools for a Hugo blog
//!
//! Commands:
//! - archive: Archive linked resources and point posts at the local copies
//! - cite: Generate APA citations for archived PDFs
//! - convert-front-matter: Migrate `key: value` front matter to TOML

pub mod archive;
pub mod browser;
pub mod cite;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod front_matter;
pub mod hash;
pub mod logging;
pub mod naming;
pub mod pdf;
pub mod process;
pub mod render;
pub mod report;
pub mod resource;

pub use archive::{ArchiveReport, Archiver, Outcome, ReferenceResult};
pub use cite::{CiteConfig, CiteOutcome, CiteReport, Citer, CompletionClient, OpenAiClient};
pub use config::ArchiveConfig;
pub use error::{CiteError, CompletionError, FetchError, ReferenceError, Stage};
pub use pdf::{PdfExtractor, TextExtractor};
pub use process::{ProcessOutput, ProcessRunner, SystemRunner};
pub use render::{NoRenderer, PageRenderer, RendererKind, WkhtmltopdfRenderer};
pub use resource::{ImageFormat, ResourceKind};
