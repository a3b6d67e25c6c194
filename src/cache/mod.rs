mod example;
mod identity;
mod manager;
mod query;
mod refresh_task;
mod updater;

pub use identity::Credentials;
pub use manager::SubstitutionManager;
pub use query::{DateFilter, SubstitutionField};
pub use refresh_task::RefreshTask;
pub use updater::SubstitutionUpdater;
