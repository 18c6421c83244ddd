mod prepare_env;

pub use prepare_env::{prepare_test_env, random_db_url, test_database};
