//! XML support: namespace tables, path queries, subtree serialization and
//! text helpers on top of `roxmltree`.

mod namespaces;
mod path;
mod serialize;
mod utils;

pub use namespaces::{Namespaces, ARCHIVE_NS, DC_NS, OAI_DC_NS, OAI_NS};
pub use path::{select, Selector};
pub use serialize::serialize_element;
pub use utils::{collect_text, first_non_blank, get_text, squash_whitespace, text_fragments};
