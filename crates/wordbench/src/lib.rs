//! wordbench — count a token in a text corpus three ways and time each.
//!
//! The [`count`] module holds the CPU strategies, [`gpu`] the compute-device
//! strategy.  Both implement [`count::Counter`] and return a
//! [`count::CountResult`].  [`bench`] drives them over a set of corpus files
//! and [`record`] writes the results file.

pub mod bench;
pub mod corpus;
pub mod count;
pub mod gpu;
pub mod record;
pub mod report;
pub mod samples;
