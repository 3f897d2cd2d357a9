// Terminal operation adapters and the project cascade

mod abort_run;
mod delete_images;
mod delete_job;
mod delete_project;
mod stop_session;

pub use abort_run::AbortRun;
pub use delete_images::DeleteEnvironmentImages;
pub use delete_job::DeleteJob;
pub use delete_project::DeleteProject;
pub use stop_session::StopSession;
