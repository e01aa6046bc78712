pub mod query;
pub mod session_sync;
pub mod storage;

pub use query::{fetch_many, fetch_single, run_query};
pub use session_sync::{
    current_session, current_state, current_user, IdentityChannel, SessionState, SessionSyncError,
    SessionSynchronizer,
};
pub use storage::{delete_file, get_public_url, get_signed_url, upload_file, PathList, UploadOptions};
