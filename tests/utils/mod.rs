pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use setup::{
    auth_context, bearer_token, http_router, send, today, TestSetup, TEST_USER_ID,
};
