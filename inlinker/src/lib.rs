// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    expand_path, extract_url_path, load_keyword_table, payload_on_stdout, progress_message,
    resolve_format, write_template,
};
