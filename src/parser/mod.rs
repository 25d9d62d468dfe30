//! PDF layout access: document loading, text spans and table geometry.

mod backend;
mod content;
mod options;
mod table_finder;

pub use backend::{LayoutBackend, LayoutProvider, LopdfBackend, LopdfProvider};
pub use content::{PageLayout, Ruling, TextSpan};
pub use options::{GeometryProfile, Strategy, TableSettings};
pub use table_finder::TableFinder;
