pub mod note;

pub use note::{note_delete, note_put, notes_get, notes_post};
