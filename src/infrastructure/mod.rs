pub mod connectivity;
pub mod database;
pub mod evidence;
pub mod offline;
