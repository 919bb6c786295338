// Core modules implementing type keys, values, classes, codecs, and error modeling.
pub mod class;
pub mod error;
pub mod list;
pub mod map;
pub mod primitive;
pub mod registry;
pub mod representation;
pub mod structure;
pub mod token;
pub mod types;
pub mod value;
