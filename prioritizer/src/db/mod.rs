pub mod aa_properties;
