// src/components/mod.rs
pub mod grader_form;
pub mod preset_manager;
pub mod results_panel;
