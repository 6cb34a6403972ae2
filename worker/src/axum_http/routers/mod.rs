pub mod internal_sweeps;
