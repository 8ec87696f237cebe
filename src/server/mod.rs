//! Resources and prompts served alongside the tools

pub mod prompts;
pub mod resources;

pub use prompts::{all_prompts, get_prompt};
pub use resources::{parse_uri_template, read_resource, resource_templates, static_resources};
