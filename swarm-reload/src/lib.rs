//! Swarm Reload - applies hot reload messages pushed by the dev server.
//!
//! A `reload-css` message swaps the content of one style element (creating
//! it when missing); a `reload` message reloads the page. Anything else is
//! ignored. The page is abstracted as a [`Document`]:
//! - [`InMemoryDocument`]: head of style elements plus a reload counter
//! - [`DirectoryDocument`]: one `<id>.css` file per style element and an
//!   optional command run on reload

pub mod directory;
pub mod document;
pub mod reloader;

pub use directory::DirectoryDocument;
pub use document::{Document, InMemoryDocument, StyleElement};
pub use reloader::{HotReloader, ReloadOutcome};
