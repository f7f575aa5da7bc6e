//! Sales package generation for Flux Sales.
//!
//! This crate turns what the other crates gather (Apollo records, website
//! intel, search findings, the product catalog) into LLM prompts, runs the
//! staged generation pipeline, and renders the result.

pub mod agents;
pub mod contacts;
pub mod export;
pub mod llm;
pub mod parse;
pub mod pipeline;
pub mod prompts;
pub mod validate;

pub use contacts::{ContactColumns, import_contacts_csv};
pub use export::{export_file_stem, render_json, render_markdown};
pub use llm::{ChatMessage, ChatModel, ChatReply, ChatRequest, OpenAiChat, Role};
pub use parse::parse_agent_output;
pub use pipeline::{
    GenerateRequest, Generator, Inference, ProgressReporter, RunStats, SalesPackage,
    SilentProgress, Sources, generate_sales_package, package_from_json,
};
pub use prompts::{PromptInputs, Stage};
pub use validate::{SiteValidator, WebsiteValidation};
