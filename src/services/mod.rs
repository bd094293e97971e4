pub mod init_data;
pub mod orders;
pub mod telegram;
