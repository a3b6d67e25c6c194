mod daily_table;
mod error;
mod infoscreen;
mod last_updated;
mod news_message;
mod static_selector;
mod substitution;
mod text_from_selection;

pub use error::Error;
pub use infoscreen::Infoscreen;
pub use last_updated::LastUpdated;
pub use news_message::NewsMessage;
pub use substitution::Substitution;
