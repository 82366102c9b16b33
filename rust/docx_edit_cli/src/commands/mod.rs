pub mod delete;
pub mod export;
pub mod info;
pub mod list;
pub mod new;
pub mod update;

pub use delete::{delete, DeleteArgs};
pub use export::{export, ExportArgs};
pub use info::{info, InfoArgs};
pub use list::list;
pub use new::{new, NewArgs};
pub use update::{update, UpdateArgs};
