pub mod lifecycle_transitioner;
