pub mod csv;
pub mod mif;
