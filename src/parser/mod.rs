pub mod annotation;
pub mod fasta;
pub mod gff;
pub mod pdb;
