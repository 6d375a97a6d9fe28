pub mod csv;
pub mod html;
pub mod json;
pub mod terminal;

use crate::error::Result;
use crate::merge::Summary;
use crate::resultset::ResultSet;

pub use csv::CsvReporter;
pub use html::HtmlReporter;
pub use json::JsonReporter;
pub use terminal::TerminalReporter;

pub trait Reporter {
    fn report(&self, summary: &Summary, set: &ResultSet) -> Result<String>;
}
