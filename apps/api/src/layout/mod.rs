// Layout: section resolution for rendered proposals, plus the text metrics the
// PDF renderer uses to wrap body copy.

pub mod font_metrics;
pub mod resolver;
pub mod wrap;

pub use font_metrics::{default_page_config, get_metrics, FontFamily, PageConfig};
pub use resolver::{resolve_layout, Layout, SectionId, DEFAULT_SECTIONS};
pub use wrap::wrap_text;
