//! render command - Dry run of the publishing pipeline

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use chrono::Utc;

use super::load_config;
use crate::cli::{Context, InputFormat};
use crate::mf2::CreateRequest;
use crate::publisher::Renderer;

/// Render the request in `file` and print where and what would be committed.
pub fn render(ctx: &Context, file: &Path, format: Option<InputFormat>) -> Result<()> {
    let config = load_config(ctx)?;
    let contents = fs::read_to_string(file)
        .with_context(|| format!("Failed to read '{}'", file.display()))?;

    let request = parse_request(&contents, format)
        .with_context(|| format!("'{}' is not a valid request", file.display()))?;

    let renderer = Renderer::new(&config);
    let now = Utc::now().with_timezone(&renderer.offset());
    let rendered = renderer.render(request, now).context("Render failed")?;

    println!("path:      {}", rendered.post.path);
    println!("permalink: {}", rendered.post.permalink);
    println!("location:  {}", rendered.location);
    println!();
    print!("{}", String::from_utf8_lossy(&rendered.post.bytes));
    if !rendered.post.bytes.ends_with(b"\n") {
        println!();
    }
    Ok(())
}

/// Decode a request file. Without an explicit format, a body starting with
/// `{` is JSON and anything else is form-encoded.
fn parse_request(contents: &str, format: Option<InputFormat>) -> Result<CreateRequest> {
    let format = format.unwrap_or_else(|| {
        if contents.trim_start().starts_with('{') {
            InputFormat::Json
        } else {
            InputFormat::Form
        }
    });

    Ok(match format {
        InputFormat::Json => {
            let value = serde_json::from_str(contents).context("Invalid JSON")?;
            CreateRequest::Json(value)
        }
        InputFormat::Form => {
            let fields = url::form_urlencoded::parse(contents.trim().as_bytes())
                .into_owned()
                .collect();
            CreateRequest::Form(fields)
        }
    })
}
