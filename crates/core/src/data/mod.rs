mod dataframe;
mod io;

pub use dataframe::{Column, DataFrame};
pub use io::is_missing_token;
