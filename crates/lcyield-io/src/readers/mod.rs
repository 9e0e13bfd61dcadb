//! Importers that turn external tabular files into record files.

pub mod csv;
