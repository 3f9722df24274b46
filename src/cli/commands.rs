pub mod users;
pub mod initdb;

pub use users::{check_password, create_account, set_image, show_user};
pub use initdb::init_database;
