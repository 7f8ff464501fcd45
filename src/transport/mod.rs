mod fs;

pub use fs::{InputFile, InputFiles};
