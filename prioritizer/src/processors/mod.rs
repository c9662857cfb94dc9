pub mod amino_acid;
pub mod depth;
pub mod domain;
pub mod position;
pub mod taxonomy;
pub mod uniprot;
