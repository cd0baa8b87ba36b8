pub mod models;
pub mod storage;
pub mod task_edit;
pub mod task_list;
pub mod ui;
