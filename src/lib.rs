#[macro_use]
pub mod macros;

pub mod course_list;
pub mod crawler;
pub mod extractor;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod settings;
pub mod url_template;
pub mod writer;
