pub mod giphy;
pub mod local_ids;
